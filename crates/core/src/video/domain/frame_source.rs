use crate::shared::frame::Frame;

/// A live source of color frames, such as a camera.
///
/// Implementations own the device handle and release it on drop.
pub trait FrameSource: Send {
    /// Opens the device or URL. Must be called before [`next_frame`].
    ///
    /// [`next_frame`]: FrameSource::next_frame
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>>;

    /// Grabs the next frame, or `None` once the source is exhausted or
    /// the grab failed.
    fn next_frame(&mut self) -> Option<Frame>;

    /// Human-readable name of the source for diagnostics.
    fn describe(&self) -> String;
}
