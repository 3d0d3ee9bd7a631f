//! Face detection pipeline: engine result decoding, annotation and the
//! batch and stream drivers built on it.
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod video;
