use thiserror::Error;

use super::detector_variant::{DetectParams, DetectorVariant};
use super::record_codec::DecodeError;
use super::result_buffer::{RawResultView, ResultBuffer};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine input must be single-channel, got {0} channels")]
    NotGray(u8),
    #[error("engine returned a pointer outside the result buffer")]
    ForeignPointer,
    #[error("engine could not encode its result: {0}")]
    Encode(#[from] DecodeError),
    #[error("{engine} failed: {message}")]
    Backend { engine: String, message: String },
}

/// Port to the external face detection engine.
///
/// The engine writes into the caller's buffer and returns a transient view
/// into it. The view borrows `buffer`, so it must be decoded before the
/// buffer can be handed to the engine again.
pub trait DetectionEngine: Send {
    fn detect<'b>(
        &mut self,
        variant: DetectorVariant,
        buffer: &'b mut ResultBuffer,
        gray: &Frame,
        params: &DetectParams,
    ) -> Result<RawResultView<'b>, EngineError>;

    /// Whether landmark fields are ever filled in.
    fn supports_landmarks(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Rejects color input before it reaches an engine.
pub fn ensure_gray(frame: &Frame) -> Result<(), EngineError> {
    if frame.is_gray() {
        Ok(())
    } else {
        Err(EngineError::NotGray(frame.channels()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_gray_accepts_single_channel() {
        let frame = Frame::new(vec![0; 4], 2, 2, 1, 0);
        assert!(ensure_gray(&frame).is_ok());
    }

    #[test]
    fn test_ensure_gray_rejects_color() {
        let frame = Frame::new(vec![0; 12], 2, 2, 3, 0);
        assert!(matches!(ensure_gray(&frame), Err(EngineError::NotGray(3))));
    }

    #[test]
    fn test_backend_error_message() {
        let err = EngineError::Backend {
            engine: "onnx-yolo".into(),
            message: "session failed".into(),
        };
        assert_eq!(err.to_string(), "onnx-yolo failed: session failed");
    }
}
