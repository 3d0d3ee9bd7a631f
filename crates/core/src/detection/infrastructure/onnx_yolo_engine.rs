/// In-process detection engine running a YOLO face model through ONNX Runtime.
///
/// Honors the same buffer contract as a native engine: results are encoded
/// into the caller's [`ResultBuffer`] and handed back as a view, so the
/// decoding pipeline cannot tell the two apart.
use std::path::Path;

use crate::detection::domain::detection_engine::{ensure_gray, DetectionEngine, EngineError};
use crate::detection::domain::detector_variant::{DetectParams, DetectorVariant};
use crate::detection::domain::record_codec::{max_records, write_records};
use crate::detection::domain::result_buffer::{RawResultView, ResultBuffer};
use crate::shared::face_detection::{FaceDetection, FaceRect};
use crate::shared::frame::Frame;

use super::math::nms;

const ENGINE_NAME: &str = "onnx-yolo";

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

const NMS_IOU_THRESH: f64 = 0.45;

pub struct OnnxYoloEngine {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxYoloEngine {
    /// Loads the model. The input resolution is read from the model's NCHW
    /// input shape, falling back to 640 if it is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, EngineError> {
        let builder = ort::session::Session::builder().map_err(backend)?;
        let session = builder.commit_from_file(model_path).map_err(backend)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    (shape.len() >= 4 && shape[2] > 0).then(|| shape[2] as u32)
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);
        log::debug!("{ENGINE_NAME}: model input {input_size}x{input_size}");

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    fn infer(&mut self, gray: &Frame) -> Result<Vec<Candidate>, EngineError> {
        let (input_tensor, lb) = letterbox(gray, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor).map_err(backend)?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(backend)?;
        if outputs.len() == 0 {
            return Err(backend("model produced no outputs"));
        }
        let tensor = outputs[0].try_extract_array::<f32>().map_err(backend)?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(backend(format!("unexpected output shape: {shape:?}")));
        }
        // Either [1, features, detections] or [1, detections, features].
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };
        if num_feats < 5 {
            return Err(backend(format!("output has {num_feats} features, need 5")));
        }
        let data = tensor
            .as_slice()
            .ok_or_else(|| backend("output tensor is not contiguous"))?;
        let feature = |det: usize, f: usize| -> f64 {
            let at = if transposed {
                f * num_dets + det
            } else {
                det * num_feats + f
            };
            data[at] as f64
        };

        let mut candidates = Vec::new();
        for i in 0..num_dets {
            let conf = feature(i, 4);
            if conf < self.confidence {
                continue;
            }
            let (cx, cy, w, h) = (feature(i, 0), feature(i, 1), feature(i, 2), feature(i, 3));
            candidates.push(Candidate {
                bbox: lb.unmap([cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]),
                confidence: conf,
            });
        }
        Ok(candidates)
    }
}

impl DetectionEngine for OnnxYoloEngine {
    fn detect<'b>(
        &mut self,
        variant: DetectorVariant,
        buffer: &'b mut ResultBuffer,
        gray: &Frame,
        params: &DetectParams,
    ) -> Result<RawResultView<'b>, EngineError> {
        ensure_gray(gray)?;
        // A single model serves every variant.
        log::trace!("{ENGINE_NAME}: {variant} on frame {}", gray.index());

        let candidates = self.infer(gray)?;
        let boxes: Vec<[f64; 4]> = candidates.iter().map(|c| c.bbox).collect();
        let scores: Vec<f64> = candidates.iter().map(|c| c.confidence).collect();

        let capacity = max_records(buffer.capacity());
        let detections: Vec<FaceDetection> = nms(&boxes, &scores, NMS_IOU_THRESH)
            .into_iter()
            .map(|i| to_detection(&candidates[i], gray.width(), gray.height()))
            .filter(|d| within_size(&d.rect, params))
            .take(capacity)
            .collect();

        write_records(buffer.as_mut_bytes(), &detections)?;
        let buffer: &'b ResultBuffer = buffer;
        Ok(RawResultView::of_buffer(buffer))
    }

    fn supports_landmarks(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        ENGINE_NAME
    }
}

fn backend(e: impl std::fmt::Display) -> EngineError {
    EngineError::Backend {
        engine: ENGINE_NAME.to_string(),
        message: e.to_string(),
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    /// `[x1, y1, x2, y2]` in source frame pixels.
    bbox: [f64; 4],
    confidence: f64,
}

/// Clamps a candidate to the frame and converts it to an engine record.
/// The neighbor count carries the confidence as a percentage.
fn to_detection(c: &Candidate, frame_w: u32, frame_h: u32) -> FaceDetection {
    let x1 = c.bbox[0].clamp(0.0, frame_w as f64);
    let y1 = c.bbox[1].clamp(0.0, frame_h as f64);
    let x2 = c.bbox[2].clamp(0.0, frame_w as f64);
    let y2 = c.bbox[3].clamp(0.0, frame_h as f64);
    let rect = FaceRect::new(
        x1.round() as i32,
        y1.round() as i32,
        (x2 - x1).round() as i32,
        (y2 - y1).round() as i32,
    );
    FaceDetection::new(rect, (c.confidence * 100.0).round() as i32, 0)
}

fn within_size(rect: &FaceRect, params: &DetectParams) -> bool {
    let side = rect.width.min(rect.height);
    if side < params.min_face_size {
        return false;
    }
    params.max_face_size <= 0 || rect.width.max(rect.height) <= params.max_face_size
}

/// Mapping between source frame pixels and the square model input.
#[derive(Clone, Copy, Debug)]
struct Letterbox {
    scale: f64,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn unmap(&self, b: [f64; 4]) -> [f64; 4] {
        let (px, py) = (self.pad_x as f64, self.pad_y as f64);
        [
            (b[0] - px) / self.scale,
            (b[1] - py) / self.scale,
            (b[2] - px) / self.scale,
            (b[3] - py) / self.scale,
        ]
    }
}

/// Letterbox-resize a gray frame to `target_size` x `target_size`,
/// replicating the luma into all three input channels.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention.
    let fill = 114.0f32 / 255.0;
    let size = target_size as usize;
    let mut tensor = ndarray::Array4::<f32>::from_elem((1, 3, size, size), fill);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let value = src[[src_y, src_x, 0]] as f32 / 255.0;
            let (ty, tx) = (pad_y as usize + y, pad_x as usize + x);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = value;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x,
            pad_y,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn gray(width: u32, height: u32, value: u8) -> Frame {
        Frame::new(vec![value; (width * height) as usize], width, height, 1, 0)
    }

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 → 640: scale 3.2, new 640x320, pad_y 160
        let (tensor, lb) = letterbox(&gray(200, 100, 128), 640);
        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 3.2, epsilon = 1e-9);
        assert_eq!(lb.pad_x, 0);
        assert_eq!(lb.pad_y, 160);
    }

    #[test]
    fn test_letterbox_replicates_gray_into_channels() {
        let (tensor, lb) = letterbox(&gray(100, 50, 255), 640);
        let (y, x) = (lb.pad_y as usize + 1, lb.pad_x as usize + 1);
        for c in 0..3 {
            assert_relative_eq!(tensor[[0, c, y, x]], 1.0, epsilon = 1e-6);
        }
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn test_unmap_inverts_letterbox() {
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0,
            pad_y: 40,
        };
        let b = lb.unmap([20.0, 60.0, 120.0, 160.0]);
        assert_eq!(b, [10.0, 10.0, 60.0, 60.0]);
    }

    #[test]
    fn test_to_detection_clamps_and_encodes_confidence() {
        let c = Candidate {
            bbox: [-10.0, 5.0, 90.0, 300.0],
            confidence: 0.874,
        };
        let det = to_detection(&c, 100, 200);
        assert_eq!(det.rect, FaceRect::new(0, 5, 90, 195));
        assert_eq!(det.neighbors, 87);
        assert_eq!(det.angle, 0);
        assert!(det.landmarks.is_none());
    }

    #[rstest]
    #[case::too_small(FaceRect::new(0, 0, 47, 60), 0, false)]
    #[case::min_size(FaceRect::new(0, 0, 48, 48), 0, true)]
    #[case::unbounded(FaceRect::new(0, 0, 900, 900), 0, true)]
    #[case::over_max(FaceRect::new(0, 0, 200, 120), 150, false)]
    fn test_within_size(#[case] rect: FaceRect, #[case] max: i32, #[case] expected: bool) {
        let params = DetectParams {
            max_face_size: max,
            ..DetectParams::default()
        };
        assert_eq!(within_size(&rect, &params), expected);
    }
}
