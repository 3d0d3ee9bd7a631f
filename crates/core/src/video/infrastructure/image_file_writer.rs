use std::path::Path;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes a single frame to an image file using the `image` crate.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let (w, h) = (frame.width(), frame.height());
        let data = frame.data().to_vec();
        match frame.channels() {
            1 => image::GrayImage::from_raw(w, h, data)
                .ok_or("Failed to create image from frame data")?
                .save(path)?,
            3 => image::RgbImage::from_raw(w, h, data)
                .ok_or("Failed to create image from frame data")?
                .save(path)?,
            n => return Err(format!("cannot write a {n}-channel frame").into()),
        }
        Ok(())
    }
}
