pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Scratch buffer size shared with the detection engine. Must not change.
pub const DETECT_BUFFER_SIZE: usize = 0x20000;

pub const DEFAULT_REPORT_PATH: &str = "./fd_rlt.txt";

/// Appended to the source image path when saving an annotated copy.
pub const ANNOTATED_SUFFIX: &str = "_fd_rlt.jpg";

pub const RESULT_WINDOW_TITLE: &str = "Results";

pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";

pub const ESCAPE_KEY: char = '\u{1b}';
