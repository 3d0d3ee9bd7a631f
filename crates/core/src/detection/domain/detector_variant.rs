use std::fmt;
use std::str::FromStr;

/// The four engine entry points, selectable by index 0-3.
///
/// The multiview variants also find side-view faces at the cost of latency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DetectorVariant {
    /// Fast, frontal faces only.
    #[default]
    Frontal,
    /// Frontal faces under poor illumination (surveillance footage).
    FrontalSurveillance,
    Multiview,
    /// Better recall than `Multiview`, slower.
    MultiviewReinforce,
}

impl DetectorVariant {
    pub const ALL: [DetectorVariant; 4] = [
        DetectorVariant::Frontal,
        DetectorVariant::FrontalSurveillance,
        DetectorVariant::Multiview,
        DetectorVariant::MultiviewReinforce,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        match self {
            DetectorVariant::Frontal => 0,
            DetectorVariant::FrontalSurveillance => 1,
            DetectorVariant::Multiview => 2,
            DetectorVariant::MultiviewReinforce => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DetectorVariant::Frontal => "frontal",
            DetectorVariant::FrontalSurveillance => "frontal-surveillance",
            DetectorVariant::Multiview => "multiview",
            DetectorVariant::MultiviewReinforce => "multiview-reinforce",
        }
    }
}

impl fmt::Display for DetectorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DetectorVariant {
    type Err = String;

    /// Accepts either the numeric index or the kebab-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(index) = s.parse::<usize>() {
            return Self::from_index(index)
                .ok_or_else(|| format!("detector variant index must be 0-3, got {index}"));
        }
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown detector variant '{s}' (expected 0-3 or one of: {})",
                    Self::ALL.map(|v| v.name()).join(", ")
                )
            })
    }
}

/// Engine tuning knobs, passed through to the engine without interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectParams {
    pub scale_factor: f32,
    pub min_neighbors: i32,
    pub min_face_size: i32,
    /// 0 means unbounded.
    pub max_face_size: i32,
    pub landmarks: bool,
}

pub const DEFAULT_SCALE_FACTOR: f32 = 1.2;
pub const DEFAULT_MIN_NEIGHBORS: i32 = 2;
pub const DEFAULT_MIN_FACE_SIZE: i32 = 48;

impl Default for DetectParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_neighbors: DEFAULT_MIN_NEIGHBORS,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            max_face_size: 0,
            landmarks: false,
        }
    }
}

impl DetectParams {
    /// Tuning used for live streams: the reinforced multiview detector
    /// needs one more neighbor to stay stable frame to frame.
    pub fn for_stream(variant: DetectorVariant) -> Self {
        let min_neighbors = match variant {
            DetectorVariant::MultiviewReinforce => 3,
            _ => DEFAULT_MIN_NEIGHBORS,
        };
        Self {
            min_neighbors,
            landmarks: true,
            ..Self::default()
        }
    }

    pub fn with_landmarks(mut self, landmarks: bool) -> Self {
        self.landmarks = landmarks;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("0", DetectorVariant::Frontal)]
    #[case("1", DetectorVariant::FrontalSurveillance)]
    #[case("2", DetectorVariant::Multiview)]
    #[case("3", DetectorVariant::MultiviewReinforce)]
    #[case("multiview-reinforce", DetectorVariant::MultiviewReinforce)]
    #[case("Frontal-Surveillance", DetectorVariant::FrontalSurveillance)]
    fn test_parse_variant(#[case] input: &str, #[case] expected: DetectorVariant) {
        assert_eq!(input.parse::<DetectorVariant>().unwrap(), expected);
    }

    #[rstest]
    #[case("4")]
    #[case("-1")]
    #[case("profile")]
    fn test_parse_variant_rejects_unknown(#[case] input: &str) {
        assert!(input.parse::<DetectorVariant>().is_err());
    }

    #[test]
    fn test_index_round_trip() {
        for variant in DetectorVariant::ALL {
            assert_eq!(DetectorVariant::from_index(variant.index()), Some(variant));
        }
        assert_eq!(DetectorVariant::from_index(4), None);
    }

    #[test]
    fn test_default_variant_is_frontal() {
        assert_eq!(DetectorVariant::default(), DetectorVariant::Frontal);
    }

    #[test]
    fn test_default_params() {
        let params = DetectParams::default();
        assert_eq!(params.scale_factor, 1.2);
        assert_eq!(params.min_neighbors, 2);
        assert_eq!(params.min_face_size, 48);
        assert_eq!(params.max_face_size, 0);
        assert!(!params.landmarks);
    }

    #[rstest]
    #[case(DetectorVariant::Frontal, 2)]
    #[case(DetectorVariant::FrontalSurveillance, 2)]
    #[case(DetectorVariant::Multiview, 2)]
    #[case(DetectorVariant::MultiviewReinforce, 3)]
    fn test_stream_params(#[case] variant: DetectorVariant, #[case] neighbors: i32) {
        let params = DetectParams::for_stream(variant);
        assert_eq!(params.min_neighbors, neighbors);
        assert!(params.landmarks);
    }
}
