//! Binding to the native `libfacedetect` library.
//!
//! Each variant is a separate C entry point with the same signature. The
//! returned pointer aliases the caller's buffer and must never be freed.

use std::os::raw::{c_float, c_int, c_uchar};

use crate::detection::domain::detection_engine::{ensure_gray, DetectionEngine, EngineError};
use crate::detection::domain::detector_variant::{DetectParams, DetectorVariant};
use crate::detection::domain::result_buffer::{RawResultView, ResultBuffer};
use crate::shared::frame::Frame;

type DetectFn = unsafe extern "C" fn(
    result_buffer: *mut c_uchar,
    gray_image_data: *mut c_uchar,
    width: c_int,
    height: c_int,
    step: c_int,
    scale: c_float,
    min_neighbors: c_int,
    min_object_width: c_int,
    max_object_width: c_int,
    do_landmark: c_int,
) -> *mut c_int;

#[link(name = "facedetect")]
extern "C" {
    fn facedetect_frontal(
        result_buffer: *mut c_uchar,
        gray_image_data: *mut c_uchar,
        width: c_int,
        height: c_int,
        step: c_int,
        scale: c_float,
        min_neighbors: c_int,
        min_object_width: c_int,
        max_object_width: c_int,
        do_landmark: c_int,
    ) -> *mut c_int;

    fn facedetect_frontal_surveillance(
        result_buffer: *mut c_uchar,
        gray_image_data: *mut c_uchar,
        width: c_int,
        height: c_int,
        step: c_int,
        scale: c_float,
        min_neighbors: c_int,
        min_object_width: c_int,
        max_object_width: c_int,
        do_landmark: c_int,
    ) -> *mut c_int;

    fn facedetect_multiview(
        result_buffer: *mut c_uchar,
        gray_image_data: *mut c_uchar,
        width: c_int,
        height: c_int,
        step: c_int,
        scale: c_float,
        min_neighbors: c_int,
        min_object_width: c_int,
        max_object_width: c_int,
        do_landmark: c_int,
    ) -> *mut c_int;

    fn facedetect_multiview_reinforce(
        result_buffer: *mut c_uchar,
        gray_image_data: *mut c_uchar,
        width: c_int,
        height: c_int,
        step: c_int,
        scale: c_float,
        min_neighbors: c_int,
        min_object_width: c_int,
        max_object_width: c_int,
        do_landmark: c_int,
    ) -> *mut c_int;
}

const ENGINE_NAME: &str = "libfacedetect";

fn entry_point(variant: DetectorVariant) -> DetectFn {
    match variant {
        DetectorVariant::Frontal => facedetect_frontal,
        DetectorVariant::FrontalSurveillance => facedetect_frontal_surveillance,
        DetectorVariant::Multiview => facedetect_multiview,
        DetectorVariant::MultiviewReinforce => facedetect_multiview_reinforce,
    }
}

/// Native engine. Not reentrant on a shared buffer; each instance is
/// driven by one worker with its own [`ResultBuffer`].
#[derive(Debug, Default)]
pub struct LibFacedetectEngine;

impl LibFacedetectEngine {
    pub fn new() -> Self {
        Self
    }
}

impl DetectionEngine for LibFacedetectEngine {
    fn detect<'b>(
        &mut self,
        variant: DetectorVariant,
        buffer: &'b mut ResultBuffer,
        gray: &Frame,
        params: &DetectParams,
    ) -> Result<RawResultView<'b>, EngineError> {
        ensure_gray(gray)?;
        let dims = |v: usize| {
            c_int::try_from(v).map_err(|_| EngineError::Backend {
                engine: ENGINE_NAME.to_string(),
                message: format!("image dimension {v} does not fit a C int"),
            })
        };
        let width = dims(gray.width() as usize)?;
        let height = dims(gray.height() as usize)?;
        let step = dims(gray.stride())?;

        let detect = entry_point(variant);
        // SAFETY: the buffer is exclusively borrowed for the call and sized by
        // policy; the engine only reads the gray pixels despite the `*mut`
        // in its signature.
        let result = unsafe {
            detect(
                buffer.as_mut_ptr(),
                gray.data().as_ptr() as *mut c_uchar,
                width,
                height,
                step,
                params.scale_factor,
                params.min_neighbors,
                params.min_face_size,
                params.max_face_size,
                c_int::from(params.landmarks),
            )
        };

        let buffer: &'b ResultBuffer = buffer;
        RawResultView::from_engine_pointer(buffer, result as *const u8)
    }

    fn name(&self) -> &str {
        ENGINE_NAME
    }
}
