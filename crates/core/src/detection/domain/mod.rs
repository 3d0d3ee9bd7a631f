pub mod detection_engine;
pub mod detector_variant;
pub mod record_codec;
pub mod result_buffer;
