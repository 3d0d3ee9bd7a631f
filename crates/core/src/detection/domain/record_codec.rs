//! Binary layout of an engine result.
//!
//! ```text
//! offset 0   i32   face count n
//! offset 4   n records of 142 x i16:
//!            [0..4]    box x, y, width, height
//!            [4]       neighbors
//!            [5]       angle
//!            [6..142]  68 landmark points, interleaved x0, y0, x1, y1, ...
//! ```
//!
//! Values are in host byte order. The record stride is fixed whether or
//! not landmarks were requested; unrequested landmark fields hold garbage
//! and are never read.

use thiserror::Error;

use super::result_buffer::RawResultView;
use crate::shared::face_detection::{FaceDetection, FaceRect, Landmarks, LANDMARK_COUNT};

pub const HEADER_BYTES: usize = 4;
pub const FIELD_BYTES: usize = 2;
pub const RECORD_FIELDS: usize = 142;
pub const RECORD_STRIDE: usize = RECORD_FIELDS * FIELD_BYTES;

pub const FIELD_X: usize = 0;
pub const FIELD_Y: usize = 1;
pub const FIELD_WIDTH: usize = 2;
pub const FIELD_HEIGHT: usize = 3;
pub const FIELD_NEIGHBORS: usize = 4;
pub const FIELD_ANGLE: usize = 5;
pub const FIELD_LANDMARKS: usize = 6;

const _: () = assert!(FIELD_LANDMARKS + 2 * LANDMARK_COUNT == RECORD_FIELDS);

/// Protocol faults: the bytes cannot be a result the engine is allowed to produce.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("result view is {0} bytes, too short for the face count header")]
    TruncatedHeader(usize),
    #[error("engine reported a negative face count ({0})")]
    NegativeCount(i32),
    #[error("engine reported {count} faces but the buffer holds at most {max}")]
    CountExceedsCapacity { count: usize, max: usize },
}

/// Number of whole records a region of `capacity_bytes` can hold after the header.
pub fn max_records(capacity_bytes: usize) -> usize {
    capacity_bytes.saturating_sub(HEADER_BYTES) / RECORD_STRIDE
}

/// Decodes every record of `view` into owned detections.
///
/// A null view is zero faces. Landmarks are read only when
/// `landmarks_requested` is set. Never reads past `count * stride` bytes
/// after the header and never mutates the buffer.
pub fn decode(
    view: RawResultView<'_>,
    landmarks_requested: bool,
) -> Result<Vec<FaceDetection>, DecodeError> {
    let Some(bytes) = view.bytes() else {
        return Ok(Vec::new());
    };
    let count = read_count(bytes)?;
    let max = max_records(bytes.len());
    if count > max {
        return Err(DecodeError::CountExceedsCapacity { count, max });
    }

    let records = &bytes[HEADER_BYTES..HEADER_BYTES + count * RECORD_STRIDE];
    Ok(records
        .chunks_exact(RECORD_STRIDE)
        .map(|record| decode_record(record, landmarks_requested))
        .collect())
}

fn read_count(bytes: &[u8]) -> Result<usize, DecodeError> {
    let header: [u8; HEADER_BYTES] = bytes
        .get(..HEADER_BYTES)
        .and_then(|h| h.try_into().ok())
        .ok_or(DecodeError::TruncatedHeader(bytes.len()))?;
    let count = i32::from_ne_bytes(header);
    usize::try_from(count).map_err(|_| DecodeError::NegativeCount(count))
}

fn decode_record(record: &[u8], landmarks_requested: bool) -> FaceDetection {
    debug_assert_eq!(record.len(), RECORD_STRIDE);
    let field = |i: usize| -> i32 {
        let at = i * FIELD_BYTES;
        i16::from_ne_bytes([record[at], record[at + 1]]) as i32
    };

    let rect = FaceRect::new(
        field(FIELD_X),
        field(FIELD_Y),
        field(FIELD_WIDTH),
        field(FIELD_HEIGHT),
    );
    let detection = FaceDetection::new(rect, field(FIELD_NEIGHBORS), field(FIELD_ANGLE));
    if !landmarks_requested {
        return detection;
    }

    let mut points = [(0i32, 0i32); LANDMARK_COUNT];
    for (j, point) in points.iter_mut().enumerate() {
        let base = FIELD_LANDMARKS + 2 * j;
        *point = (field(base), field(base + 1));
    }
    detection.with_landmarks(Landmarks::new(points))
}

/// Writes `detections` into `bytes` using the engine layout.
///
/// Used by in-process engines so their output goes through the same buffer
/// contract as a native engine. Landmark fields are zero-filled for
/// detections without landmarks. Values outside the i16 range saturate.
/// Returns the number of bytes written.
pub fn write_records(bytes: &mut [u8], detections: &[FaceDetection]) -> Result<usize, DecodeError> {
    if bytes.len() < HEADER_BYTES {
        return Err(DecodeError::TruncatedHeader(bytes.len()));
    }
    let max = max_records(bytes.len());
    if detections.len() > max {
        return Err(DecodeError::CountExceedsCapacity {
            count: detections.len(),
            max,
        });
    }

    bytes[..HEADER_BYTES].copy_from_slice(&(detections.len() as i32).to_ne_bytes());
    let end = HEADER_BYTES + detections.len() * RECORD_STRIDE;
    for (record, det) in bytes[HEADER_BYTES..end]
        .chunks_exact_mut(RECORD_STRIDE)
        .zip(detections)
    {
        encode_record(record, det);
    }
    Ok(end)
}

fn encode_record(record: &mut [u8], det: &FaceDetection) {
    let mut put = |i: usize, value: i32| {
        let v = value.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        record[i * FIELD_BYTES..(i + 1) * FIELD_BYTES].copy_from_slice(&v.to_ne_bytes());
    };

    put(FIELD_X, det.rect.x);
    put(FIELD_Y, det.rect.y);
    put(FIELD_WIDTH, det.rect.width);
    put(FIELD_HEIGHT, det.rect.height);
    put(FIELD_NEIGHBORS, det.neighbors);
    put(FIELD_ANGLE, det.angle);

    for j in 0..LANDMARK_COUNT {
        let (x, y) = det
            .landmarks
            .as_ref()
            .map_or((0, 0), |lm| lm.points()[j]);
        put(FIELD_LANDMARKS + 2 * j, x);
        put(FIELD_LANDMARKS + 2 * j + 1, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::result_buffer::ResultBuffer;
    use crate::shared::constants::DETECT_BUFFER_SIZE;
    use rstest::rstest;

    /// Builds a raw result by hand, field by field, independent of `write_records`.
    fn raw_result(count: i32, records: &[[i16; 6]], capacity: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; capacity];
        bytes[..4].copy_from_slice(&count.to_ne_bytes());
        for (i, fields) in records.iter().enumerate() {
            let base = HEADER_BYTES + i * RECORD_STRIDE;
            for (f, value) in fields.iter().enumerate() {
                let at = base + f * FIELD_BYTES;
                bytes[at..at + 2].copy_from_slice(&value.to_ne_bytes());
            }
        }
        bytes
    }

    fn set_field(bytes: &mut [u8], record: usize, field: usize, value: i16) {
        let at = HEADER_BYTES + record * RECORD_STRIDE + field * FIELD_BYTES;
        bytes[at..at + 2].copy_from_slice(&value.to_ne_bytes());
    }

    #[test]
    fn test_layout_constants() {
        assert_eq!(RECORD_STRIDE, 284);
        assert_eq!(max_records(DETECT_BUFFER_SIZE), 461);
    }

    #[test]
    fn test_decode_null_view_is_empty() {
        assert!(decode(RawResultView::null(), true).unwrap().is_empty());
    }

    #[test]
    fn test_decode_zero_count_is_empty() {
        let bytes = raw_result(0, &[], 64);
        assert!(decode(RawResultView::new(&bytes), false).unwrap().is_empty());
    }

    #[test]
    fn test_decode_two_records_at_known_offsets() {
        let bytes = raw_result(
            2,
            &[[10, 20, 30, 40, 3, 0], [100, 5, 25, 25, 1, 15]],
            HEADER_BYTES + 2 * RECORD_STRIDE,
        );
        let faces = decode(RawResultView::new(&bytes), false).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].rect, FaceRect::new(10, 20, 30, 40));
        assert_eq!(faces[0].neighbors, 3);
        assert_eq!(faces[0].angle, 0);
        assert_eq!(faces[1].rect, FaceRect::new(100, 5, 25, 25));
        assert_eq!(faces[1].neighbors, 1);
        assert_eq!(faces[1].angle, 15);
        assert!(faces.iter().all(|f| f.landmarks.is_none()));
    }

    #[test]
    fn test_decode_negative_field_values() {
        let bytes = raw_result(1, &[[-3, -7, 50, 60, 2, -45]], 512);
        let faces = decode(RawResultView::new(&bytes), false).unwrap();
        assert_eq!(faces[0].rect, FaceRect::new(-3, -7, 50, 60));
        assert_eq!(faces[0].angle, -45);
    }

    #[test]
    fn test_decode_landmarks_when_requested() {
        let mut bytes = raw_result(1, &[[0, 0, 90, 90, 4, 0]], 512);
        for j in 0..LANDMARK_COUNT {
            set_field(&mut bytes, 0, FIELD_LANDMARKS + 2 * j, j as i16);
            set_field(&mut bytes, 0, FIELD_LANDMARKS + 2 * j + 1, 100 + j as i16);
        }

        let faces = decode(RawResultView::new(&bytes), true).unwrap();
        let points = faces[0].landmarks.as_ref().unwrap().points();
        assert_eq!(points[0], (0, 100));
        assert_eq!(points[67], (67, 167));
    }

    #[test]
    fn test_decode_ignores_landmark_bytes_when_not_requested() {
        let mut bytes = raw_result(1, &[[1, 2, 3, 4, 5, 6]], 512);
        set_field(&mut bytes, 0, FIELD_LANDMARKS, 999);
        let faces = decode(RawResultView::new(&bytes), false).unwrap();
        assert!(faces[0].landmarks.is_none());
    }

    #[test]
    fn test_decode_reads_exactly_count_records() {
        // Second record is populated but the header says one face.
        let bytes = raw_result(1, &[[1, 1, 1, 1, 1, 1], [2, 2, 2, 2, 2, 2]], 1024);
        assert_eq!(decode(RawResultView::new(&bytes), false).unwrap().len(), 1);
    }

    #[test]
    fn test_decode_count_filling_capacity_exactly() {
        let capacity = HEADER_BYTES + 3 * RECORD_STRIDE;
        let bytes = raw_result(3, &[[0; 6]; 3], capacity);
        assert_eq!(decode(RawResultView::new(&bytes), false).unwrap().len(), 3);
    }

    #[test]
    fn test_decode_is_idempotent_on_snapshot() {
        let bytes = raw_result(2, &[[10, 20, 30, 40, 3, 0], [7, 8, 9, 10, 11, 12]], 1024);
        let first = decode(RawResultView::new(&bytes), true).unwrap();
        let second = decode(RawResultView::new(&bytes), true).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decoded_values_outlive_buffer_overwrite() {
        let mut buffer = ResultBuffer::acquire(1024).unwrap();
        let original = vec![FaceDetection::new(FaceRect::new(1, 2, 3, 4), 5, 6)];
        write_records(buffer.as_mut_bytes(), &original).unwrap();
        let decoded = decode(RawResultView::of_buffer(&buffer), false).unwrap();

        write_records(buffer.as_mut_bytes(), &[]).unwrap();
        assert_eq!(decoded, original);
    }

    #[rstest]
    #[case::negative(-1)]
    #[case::very_negative(i32::MIN)]
    fn test_decode_rejects_negative_count(#[case] count: i32) {
        let bytes = raw_result(count, &[], 64);
        assert_eq!(
            decode(RawResultView::new(&bytes), false).unwrap_err(),
            DecodeError::NegativeCount(count)
        );
    }

    #[rstest]
    #[case::one_over(4, HEADER_BYTES + 3 * RECORD_STRIDE, 3)]
    #[case::absurd(i32::MAX, DETECT_BUFFER_SIZE, 461)]
    fn test_decode_rejects_count_beyond_capacity(
        #[case] count: i32,
        #[case] capacity: usize,
        #[case] max: usize,
    ) {
        let bytes = raw_result(count, &[], capacity);
        assert_eq!(
            decode(RawResultView::new(&bytes), false).unwrap_err(),
            DecodeError::CountExceedsCapacity {
                count: count as usize,
                max
            }
        );
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let bytes = [0u8; 3];
        assert_eq!(
            decode(RawResultView::new(&bytes), false).unwrap_err(),
            DecodeError::TruncatedHeader(3)
        );
    }

    #[test]
    fn test_write_records_matches_hand_built_layout() {
        let dets = vec![
            FaceDetection::new(FaceRect::new(10, 20, 30, 40), 3, 0),
            FaceDetection::new(FaceRect::new(100, 5, 25, 25), 1, 15),
        ];
        let mut written = vec![0u8; 1024];
        let end = write_records(&mut written, &dets).unwrap();

        let expected = raw_result(2, &[[10, 20, 30, 40, 3, 0], [100, 5, 25, 25, 1, 15]], 1024);
        assert_eq!(end, HEADER_BYTES + 2 * RECORD_STRIDE);
        assert_eq!(written[..end], expected[..end]);
    }

    #[test]
    fn test_write_records_saturates_out_of_range_values() {
        let dets = vec![FaceDetection::new(FaceRect::new(40_000, -40_000, 1, 1), 0, 0)];
        let mut bytes = vec![0u8; 512];
        write_records(&mut bytes, &dets).unwrap();
        let decoded = decode(RawResultView::new(&bytes), false).unwrap();
        assert_eq!(decoded[0].rect.x, i16::MAX as i32);
        assert_eq!(decoded[0].rect.y, i16::MIN as i32);
    }

    #[test]
    fn test_write_records_rejects_overflow() {
        let dets = vec![FaceDetection::new(FaceRect::default(), 0, 0); 2];
        let mut bytes = vec![0u8; HEADER_BYTES + RECORD_STRIDE];
        assert_eq!(
            write_records(&mut bytes, &dets).unwrap_err(),
            DecodeError::CountExceedsCapacity { count: 2, max: 1 }
        );
    }
}
