use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use facedetect_core::detection::domain::detection_engine::DetectionEngine;
use facedetect_core::detection::domain::detector_variant::{
    DetectParams, DetectorVariant, DEFAULT_MIN_FACE_SIZE, DEFAULT_MIN_NEIGHBORS,
    DEFAULT_SCALE_FACTOR,
};
#[cfg(feature = "libfacedetect")]
use facedetect_core::detection::infrastructure::libfacedetect_engine::LibFacedetectEngine;
use facedetect_core::detection::infrastructure::onnx_yolo_engine::{
    OnnxYoloEngine, DEFAULT_CONFIDENCE,
};
use facedetect_core::pipeline::batch_driver::{BatchConfig, BatchDriver};
use facedetect_core::pipeline::frame_processor::FrameProcessor;
use facedetect_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facedetect_core::pipeline::stream_driver::{StreamConfig, StreamDriver};
use facedetect_core::shared::constants::{
    DEFAULT_CAMERA_DEVICE, DEFAULT_REPORT_PATH, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facedetect_core::shared::model_resolver;
use facedetect_core::video::domain::frame_display::FrameDisplay;
use facedetect_core::video::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
#[cfg(not(feature = "highgui"))]
use facedetect_core::video::infrastructure::headless_display::HeadlessDisplay;
#[cfg(feature = "highgui")]
use facedetect_core::video::infrastructure::highgui_display::HighguiDisplay;
use facedetect_core::video::infrastructure::image_file_reader::ImageFileReader;
use facedetect_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Face detection over image lists and live camera streams.
#[derive(Parser)]
#[command(name = "facedetect")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect faces in every image named in a list file and write a report.
    Images(ImagesArgs),
    /// Detect faces on a live camera until ESC or 'q' is pressed.
    Stream(StreamArgs),
}

#[derive(Args)]
struct ImagesArgs {
    /// Text file with one image path per line ('#' starts a comment).
    list: PathBuf,

    /// Report file.
    #[arg(long, default_value = DEFAULT_REPORT_PATH)]
    output: PathBuf,

    /// Directory prepended to every path in the list.
    #[arg(long)]
    root: Option<PathBuf>,

    /// Detect 68-point landmarks (0 or 1; bare flag means 1).
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value = "0", default_missing_value = "1", value_parser = parse_switch)]
    landmark: bool,

    /// Show each annotated image and wait for a key (0 or 1; bare flag means 1).
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value = "1", default_missing_value = "1", value_parser = parse_switch)]
    show: bool,

    /// Save `<image>_fd_rlt.jpg` next to each image (0 or 1; bare flag means 1).
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_value = "0", default_missing_value = "1", value_parser = parse_switch)]
    save: bool,

    /// Detector variant: 0-3 or frontal, frontal-surveillance, multiview, multiview-reinforce.
    #[arg(long, default_value = "multiview-reinforce")]
    variant: DetectorVariant,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args)]
struct StreamArgs {
    /// Detector variant: 0-3 or frontal, frontal-surveillance, multiview, multiview-reinforce.
    #[arg(default_value = "0")]
    variant: DetectorVariant,

    /// Camera device, media file or URL.
    #[arg(long, default_value = DEFAULT_CAMERA_DEVICE)]
    device: String,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    #[command(flatten)]
    engine: EngineArgs,
}

#[derive(Args)]
struct EngineArgs {
    /// Detection engine.
    #[arg(long, value_enum, default_value_t = EngineKind::Onnx)]
    engine: EngineKind,

    /// ONNX model file (downloaded into the cache when omitted).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Face detection confidence threshold for the ONNX engine (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Image pyramid scale factor.
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR)]
    scale_factor: f32,

    /// Minimum neighbors; the stream default is 3 for multiview-reinforce.
    #[arg(long)]
    min_neighbors: Option<i32>,

    /// Smallest face to report, in pixels.
    #[arg(long, default_value_t = DEFAULT_MIN_FACE_SIZE)]
    min_face_size: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    Onnx,
    Libfacedetect,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Images(args) => run_images(args),
        Command::Stream(args) => run_stream(args),
    }
}

fn run_images(args: ImagesArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_images(&args)?;

    let params = DetectParams {
        scale_factor: args.engine.scale_factor,
        min_neighbors: args.engine.min_neighbors.unwrap_or(DEFAULT_MIN_NEIGHBORS),
        min_face_size: args.engine.min_face_size,
        ..DetectParams::default()
    }
    .with_landmarks(args.landmark);
    let processor = FrameProcessor::new(build_engine(&args.engine)?, args.variant, params)?;

    let config = BatchConfig {
        output_path: args.output,
        root_dir: args.root,
        display: args.show,
        save_annotated: args.save,
    };
    let mut driver = BatchDriver::new(
        processor,
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        build_display(config.display),
        Box::new(StdoutPipelineLogger::new()),
        config,
    );
    let summary = driver.run_files(&args.list)?;
    log::debug!("{summary:?}");
    Ok(())
}

fn run_stream(args: StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_engine(&args.engine)?;
    if args.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }

    let mut params = DetectParams::for_stream(args.variant);
    params.scale_factor = args.engine.scale_factor;
    params.min_face_size = args.engine.min_face_size;
    if let Some(n) = args.engine.min_neighbors {
        params.min_neighbors = n;
    }
    let processor = FrameProcessor::new(build_engine(&args.engine)?, args.variant, params)?;

    let config = StreamConfig {
        max_frames: args.max_frames,
        ..StreamConfig::default()
    };
    let mut driver = StreamDriver::new(
        processor,
        Box::new(FfmpegCameraSource::new(args.device)),
        build_display(true),
        Box::new(StdoutPipelineLogger::new()),
        config,
    );
    driver.run()?;
    Ok(())
}

fn build_engine(args: &EngineArgs) -> Result<Box<dyn DetectionEngine>, Box<dyn std::error::Error>> {
    match args.engine {
        EngineKind::Onnx => {
            let model_path = resolve_model(args.model.as_deref())?;
            Ok(Box::new(OnnxYoloEngine::new(&model_path, args.confidence)?))
        }
        #[cfg(feature = "libfacedetect")]
        EngineKind::Libfacedetect => Ok(Box::new(LibFacedetectEngine::new())),
        #[cfg(not(feature = "libfacedetect"))]
        EngineKind::Libfacedetect => {
            Err("this build has no libfacedetect support (enable the `libfacedetect` feature)".into())
        }
    }
}

fn resolve_model(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = explicit {
        return Ok(model_resolver::explicit(path)?);
    }
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        None,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();
    Ok(model_path)
}

#[cfg(feature = "highgui")]
fn build_display(_wanted: bool) -> Box<dyn FrameDisplay> {
    Box::new(HighguiDisplay::new())
}

#[cfg(not(feature = "highgui"))]
fn build_display(wanted: bool) -> Box<dyn FrameDisplay> {
    if wanted {
        log::info!("Built without the `highgui` feature; results will not be shown");
    }
    Box::new(HeadlessDisplay::new())
}

/// Parses the `0|1` value of an on/off flag.
fn parse_switch(s: &str) -> Result<bool, String> {
    match s.trim() {
        "1" | "true" | "on" => Ok(true),
        "0" | "false" | "off" => Ok(false),
        other => Err(format!("expected 0 or 1, got '{other}'")),
    }
}

fn validate_images(args: &ImagesArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.list.is_file() {
        return Err(format!("Image list not found: {}", args.list.display()).into());
    }
    validate_engine(&args.engine)
}

fn validate_engine(args: &EngineArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            args.confidence
        )
        .into());
    }
    if args.scale_factor <= 1.0 {
        return Err(format!(
            "Scale factor must be greater than 1.0, got {}",
            args.scale_factor
        )
        .into());
    }
    if args.min_face_size < 0 {
        return Err(format!(
            "Minimum face size must not be negative, got {}",
            args.min_face_size
        )
        .into());
    }
    if let Some(n) = args.min_neighbors {
        if n < 0 {
            return Err(format!("Minimum neighbors must not be negative, got {n}").into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
