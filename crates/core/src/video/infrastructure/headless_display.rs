use std::time::Duration;

use crate::shared::frame::Frame;
use crate::video::domain::frame_display::FrameDisplay;

/// Display for builds without a GUI toolkit.
///
/// Frames are dropped and no key is ever pressed, so a stream only stops
/// at its frame limit or when the source runs dry.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    shown: usize,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames handed to [`FrameDisplay::show`].
    pub fn shown(&self) -> usize {
        self.shown
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        self.shown += 1;
        log::trace!(
            "{title}: frame {} ({}x{}) not shown, no display",
            frame.index(),
            frame.width(),
            frame.height()
        );
        Ok(())
    }

    fn wait_key(
        &mut self,
        _timeout: Option<Duration>,
    ) -> Result<Option<char>, Box<dyn std::error::Error>> {
        Ok(None)
    }
}
