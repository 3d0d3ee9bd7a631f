//! OpenCV highgui window, enabled with the `highgui` feature.
use std::time::Duration;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::{highgui, imgproc};

use crate::shared::frame::Frame;
use crate::video::domain::frame_display::FrameDisplay;

/// Shows frames in native windows, one per title.
#[derive(Debug, Default)]
pub struct HighguiDisplay;

impl HighguiDisplay {
    pub fn new() -> Self {
        Self
    }
}

/// Converts an RGB or gray frame to a BGR `Mat` owned by OpenCV.
fn to_bgr_mat(frame: &Frame) -> opencv::Result<Mat> {
    let flat = Mat::from_slice(frame.data())?;
    let shaped = flat.reshape(i32::from(frame.channels()), frame.height() as i32)?;
    let code = if frame.is_gray() {
        imgproc::COLOR_GRAY2BGR
    } else {
        imgproc::COLOR_RGB2BGR
    };
    let mut bgr = Mat::default();
    imgproc::cvt_color(&shaped, &mut bgr, code, 0)?;
    Ok(bgr)
}

/// Maps an OpenCV key code (`-1` when none) to a character.
fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        return None;
    }
    char::from_u32((code & 0xff) as u32)
}

impl FrameDisplay for HighguiDisplay {
    fn show(&mut self, title: &str, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let bgr = to_bgr_mat(frame)?;
        highgui::imshow(title, &bgr)?;
        Ok(())
    }

    fn wait_key(
        &mut self,
        timeout: Option<Duration>,
    ) -> Result<Option<char>, Box<dyn std::error::Error>> {
        // highgui treats 0 as "wait forever", so polls round up to 1 ms.
        let delay = match timeout {
            None => 0,
            Some(t) => t.as_millis().clamp(1, i32::MAX as u128) as i32,
        };
        Ok(key_from_code(highgui::wait_key(delay)?))
    }
}
