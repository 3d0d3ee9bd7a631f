use std::fmt;

/// Number of landmark points an engine reports per face.
pub const LANDMARK_COUNT: usize = 68;

/// Face bounding box in input-image pixels, top-left origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FaceRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl FaceRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// The 68 landmark points of one face.
///
/// Which index maps to which facial feature is defined by the engine; the
/// pipeline only draws them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Landmarks {
    points: [(i32, i32); LANDMARK_COUNT],
}

impl Landmarks {
    pub fn new(points: [(i32, i32); LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(i32, i32); LANDMARK_COUNT] {
        &self.points
    }
}

/// One decoded detection, owned independently of the engine's result buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceDetection {
    pub rect: FaceRect,
    /// Neighbor count reported by the engine; higher is more reliable.
    pub neighbors: i32,
    /// Rotation angle as reported by the engine.
    pub angle: i32,
    pub landmarks: Option<Landmarks>,
}

impl FaceDetection {
    pub fn new(rect: FaceRect, neighbors: i32, angle: i32) -> Self {
        Self {
            rect,
            neighbors,
            angle,
            landmarks: None,
        }
    }

    pub fn with_landmarks(mut self, landmarks: Landmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }
}

impl fmt::Display for FaceDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.rect;
        write!(
            f,
            "face_rect=[{}, {}, {}, {}], neighbors={}, angle={}",
            r.x, r.y, r.width, r.height, self.neighbors, self.angle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_display_matches_report_format() {
        let det = FaceDetection::new(FaceRect::new(10, 20, 30, 40), 3, 0);
        assert_eq!(
            det.to_string(),
            "face_rect=[10, 20, 30, 40], neighbors=3, angle=0"
        );
    }

    #[test]
    fn test_display_negative_values() {
        let det = FaceDetection::new(FaceRect::new(-4, 7, 25, 25), 1, -15);
        assert_eq!(
            det.to_string(),
            "face_rect=[-4, 7, 25, 25], neighbors=1, angle=-15"
        );
    }

    #[test]
    fn test_display_ignores_landmarks() {
        let det = FaceDetection::new(FaceRect::new(1, 2, 3, 4), 5, 6)
            .with_landmarks(Landmarks::new([(9, 9); LANDMARK_COUNT]));
        assert_eq!(det.to_string(), "face_rect=[1, 2, 3, 4], neighbors=5, angle=6");
    }

    #[rstest]
    #[case::regular(FaceRect::new(0, 0, 10, 10), false)]
    #[case::zero_width(FaceRect::new(0, 0, 0, 10), true)]
    #[case::negative_height(FaceRect::new(0, 0, 10, -1), true)]
    fn test_rect_is_empty(#[case] rect: FaceRect, #[case] expected: bool) {
        assert_eq!(rect.is_empty(), expected);
    }
}
