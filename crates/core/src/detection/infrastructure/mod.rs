#[cfg(feature = "libfacedetect")]
pub mod libfacedetect_engine;
mod math;
pub mod onnx_yolo_engine;
