use std::time::Duration;

use crate::shared::frame::Frame;

/// A window that shows frames and reports key presses.
pub trait FrameDisplay {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Waits for a key press. `None` blocks until a key arrives; a duration
    /// polls and returns `Ok(None)` if no key was pressed in time.
    fn wait_key(&mut self, timeout: Option<Duration>)
        -> Result<Option<char>, Box<dyn std::error::Error>>;
}
