use std::path::Path;

use crate::shared::frame::Frame;

/// Loads a still image as a color frame.
pub trait ImageReader: Send {
    /// Returns a tightly packed 3-channel frame with index 0.
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;
}
