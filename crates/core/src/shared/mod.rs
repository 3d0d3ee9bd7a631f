pub mod constants;
pub mod face_detection;
pub mod frame;
pub mod model_resolver;
