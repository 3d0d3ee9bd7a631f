use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_reader::ImageReader;

/// Decodes still images with the `image` crate.
///
/// Any format the crate recognises is accepted; alpha is dropped and gray
/// images are promoted so the frame is always RGB.
#[derive(Debug, Default)]
pub struct ImageFileReader;

impl ImageFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ImageReader for ImageFileReader {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.into_rgb8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(format!("{} has no pixels", path.display()).into());
        }
        Ok(Frame::new(img.into_raw(), width, height, 3, 0))
    }
}
