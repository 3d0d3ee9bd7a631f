pub mod annotator;
pub mod batch_driver;
pub mod driver_error;
pub mod frame_processor;
pub mod latency_meter;
pub mod pipeline_logger;
pub mod stream_driver;
