use std::time::Instant;

use thiserror::Error;

use crate::detection::domain::detection_engine::{DetectionEngine, EngineError};
use crate::detection::domain::detector_variant::{DetectParams, DetectorVariant};
use crate::detection::domain::record_codec::{decode, DecodeError};
use crate::detection::domain::result_buffer::{BufferError, ResultBuffer};
use crate::pipeline::annotator;
use crate::shared::constants::DETECT_BUFFER_SIZE;
use crate::shared::face_detection::FaceDetection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("detection failed: {0}")]
    Engine(#[from] EngineError),
    #[error("engine protocol fault: {0}")]
    Protocol(#[from] DecodeError),
    #[error("annotation failed: {0}")]
    Annotate(String),
}

/// Everything produced for one frame.
#[derive(Debug)]
pub struct FrameResult {
    pub detections: Vec<FaceDetection>,
    /// Color copy with boxes drawn, when annotation was requested.
    pub annotated: Option<Frame>,
    /// One `describe` line per detection, newline terminated.
    pub report: String,
    /// Wall time of the engine call plus decoding.
    pub detect_ms: f64,
}

/// Runs one frame through gray conversion, detection, annotation and
/// reporting.
///
/// Owns the engine and the scratch buffer the engine writes into, so a
/// processor is one worker: parallel callers need one processor each.
pub struct FrameProcessor {
    engine: Box<dyn DetectionEngine>,
    buffer: ResultBuffer,
    variant: DetectorVariant,
    params: DetectParams,
}

impl FrameProcessor {
    /// Acquires a buffer of the policy size for `engine`.
    pub fn new(
        engine: Box<dyn DetectionEngine>,
        variant: DetectorVariant,
        params: DetectParams,
    ) -> Result<Self, BufferError> {
        let buffer = ResultBuffer::acquire(DETECT_BUFFER_SIZE)?;
        Ok(Self::with_buffer(engine, buffer, variant, params))
    }

    pub fn with_buffer(
        engine: Box<dyn DetectionEngine>,
        buffer: ResultBuffer,
        variant: DetectorVariant,
        params: DetectParams,
    ) -> Self {
        if params.landmarks && !engine.supports_landmarks() {
            log::warn!(
                "{} does not produce landmarks; only boxes will be reported",
                engine.name()
            );
        }
        Self {
            engine,
            buffer,
            variant,
            params,
        }
    }

    pub fn variant(&self) -> DetectorVariant {
        self.variant
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Whether decoded detections carry landmarks.
    pub fn landmarks_enabled(&self) -> bool {
        self.params.landmarks && self.engine.supports_landmarks()
    }

    /// Calls the engine and decodes its result into owned detections.
    pub fn detect(&mut self, gray: &Frame) -> Result<Vec<FaceDetection>, ProcessError> {
        let landmarks = self.landmarks_enabled();
        let view = self
            .engine
            .detect(self.variant, &mut self.buffer, gray, &self.params)?;
        Ok(decode(view, landmarks)?)
    }

    /// Full per-frame pass. `annotate` controls whether a drawn copy is made.
    pub fn process(&mut self, frame: &Frame, annotate: bool) -> Result<FrameResult, ProcessError> {
        let gray = to_gray(frame);

        let start = Instant::now();
        let detections = self.detect(&gray)?;
        let detect_ms = start.elapsed().as_secs_f64() * 1000.0;

        let annotated = if annotate {
            Some(
                annotator::annotate(frame, &detections, self.landmarks_enabled())
                    .map_err(ProcessError::Annotate)?,
            )
        } else {
            None
        };

        let report = describe(&detections);
        Ok(FrameResult {
            detections,
            annotated,
            report,
            detect_ms,
        })
    }
}

/// ITU-R BT.601 luma in 14-bit fixed point, rounding to nearest.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Converts a color frame to single-channel gray. Gray input is copied.
pub fn to_gray(frame: &Frame) -> Frame {
    if frame.is_gray() {
        return frame.clone();
    }
    let channels = frame.channels() as usize;
    let data = frame
        .data()
        .chunks_exact(channels)
        .map(|px| {
            let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
            ((r * LUMA_R + g * LUMA_G + b * LUMA_B + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
        })
        .collect();
    Frame::new(data, frame.width(), frame.height(), 1, frame.index())
}

/// Renders one line per detection, in detection order.
pub fn describe(detections: &[FaceDetection]) -> String {
    detections.iter().map(|d| format!("{d}\n")).collect()
}
