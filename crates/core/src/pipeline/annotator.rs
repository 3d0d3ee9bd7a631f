//! Draws detection results onto a color copy of the source frame.
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::shared::face_detection::{FaceDetection, FaceRect};
use crate::shared::frame::Frame;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: i32 = 2;
pub const LANDMARK_RADIUS: i32 = 1;

/// Returns an annotated RGB copy of `original`; gray frames are promoted.
///
/// Boxes are clipped to the canvas by imageproc. Degenerate boxes (zero or
/// negative extent) are skipped.
pub fn annotate(
    original: &Frame,
    detections: &[FaceDetection],
    draw_landmarks: bool,
) -> Result<Frame, String> {
    let mut canvas = to_rgb_image(original)?;

    for det in detections {
        draw_box(&mut canvas, &det.rect);
        if !draw_landmarks {
            continue;
        }
        if let Some(landmarks) = &det.landmarks {
            for &(x, y) in landmarks.points() {
                draw_hollow_circle_mut(&mut canvas, (x, y), LANDMARK_RADIUS, BOX_COLOR);
            }
        }
    }

    let (width, height) = canvas.dimensions();
    Ok(Frame::new(
        canvas.into_raw(),
        width,
        height,
        3,
        original.index(),
    ))
}

fn to_rgb_image(frame: &Frame) -> Result<RgbImage, String> {
    let data = match frame.channels() {
        3 => frame.data().to_vec(),
        1 => frame.data().iter().flat_map(|&v| [v, v, v]).collect(),
        n => return Err(format!("cannot annotate a {n}-channel frame")),
    };
    RgbImage::from_raw(frame.width(), frame.height(), data)
        .ok_or_else(|| "frame data does not match its dimensions".to_string())
}

/// Draws a `BOX_THICKNESS` px outline growing inwards from the box edge.
///
/// The outline stays inside the detected rect, so it is offset by one pixel
/// from an OpenCV `rectangle` of the same thickness, which straddles the edge.
fn draw_box(canvas: &mut RgbImage, rect: &FaceRect) {
    for inset in 0..BOX_THICKNESS {
        let inner = FaceRect::new(
            rect.x + inset,
            rect.y + inset,
            rect.width - 2 * inset,
            rect.height - 2 * inset,
        );
        if inner.is_empty() {
            break;
        }
        let r = Rect::at(inner.x, inner.y).of_size(inner.width as u32, inner.height as u32);
        draw_hollow_rect_mut(canvas, r, BOX_COLOR);
    }
}
