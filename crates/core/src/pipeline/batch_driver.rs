use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::pipeline::driver_error::DriverError;
use crate::pipeline::frame_processor::{FrameProcessor, ProcessError};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{ANNOTATED_SUFFIX, DEFAULT_REPORT_PATH, RESULT_WINDOW_TITLE};
use crate::video::domain::frame_display::FrameDisplay;
use crate::video::domain::image_reader::ImageReader;
use crate::video::domain::image_writer::ImageWriter;

/// Face count written for an image that could not be loaded or whose
/// detection failed.
pub const LOAD_FAILED: i32 = -1;

#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub output_path: PathBuf,
    /// Prefix joined in front of every list line. `None` uses lines as-is.
    pub root_dir: Option<PathBuf>,
    /// Show each annotated image and wait for a key before the next line.
    pub display: bool,
    /// Write `<image path>_fd_rlt.jpg` next to each source image.
    pub save_annotated: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_REPORT_PATH),
            root_dir: None,
            display: true,
            save_annotated: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub lines_read: usize,
    pub skipped: usize,
    pub processed: usize,
    pub failed: usize,
    pub faces: usize,
}

/// Runs every image named in a list file through a [`FrameProcessor`] and
/// writes one report entry per image.
///
/// The report is flushed after every entry, so an interrupted run keeps all
/// completed lines.
pub struct BatchDriver {
    processor: FrameProcessor,
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    display: Box<dyn FrameDisplay>,
    logger: Box<dyn PipelineLogger>,
    config: BatchConfig,
}

/// Lines shorter than 3 bytes (terminator included) or starting with `#`
/// are markers, not paths.
pub fn is_skip_line(raw: &[u8]) -> bool {
    raw.len() < 3 || raw.starts_with(b"#")
}

/// Drops one `\n` and then one `\r`, so LF and CRLF lists read the same.
fn strip_terminator(raw: &[u8]) -> &[u8] {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// List lines are paths, not text: keep non-UTF-8 bytes intact on Unix.
#[cfg(unix)]
fn line_as_os_str(line: &[u8]) -> Cow<'_, OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(OsStr::from_bytes(line))
}

#[cfg(not(unix))]
fn line_as_os_str(line: &[u8]) -> Cow<'_, OsStr> {
    Cow::Owned(String::from_utf8_lossy(line).into_owned().into())
}

/// Prefixes `line` with the root directory, if one is configured.
pub fn resolve_path(root: Option<&Path>, line: &OsStr) -> PathBuf {
    match root {
        Some(root) if !root.as_os_str().is_empty() => {
            let mut joined = root.as_os_str().to_os_string();
            joined.push("/");
            joined.push(line);
            PathBuf::from(joined)
        }
        _ => PathBuf::from(line),
    }
}

/// `<path>_fd_rlt.jpg`, appended to the full file name.
pub fn annotated_path(image_path: &Path) -> PathBuf {
    let mut name = image_path.as_os_str().to_os_string();
    name.push(ANNOTATED_SUFFIX);
    PathBuf::from(name)
}

impl BatchDriver {
    pub fn new(
        processor: FrameProcessor,
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        display: Box<dyn FrameDisplay>,
        logger: Box<dyn PipelineLogger>,
        config: BatchConfig,
    ) -> Self {
        Self {
            processor,
            reader,
            writer,
            display,
            logger,
            config,
        }
    }

    /// Opens `list_path`, creates the configured report file and runs.
    pub fn run_files(&mut self, list_path: &Path) -> Result<BatchSummary, DriverError> {
        let list = File::open(list_path).map_err(|source| DriverError::OpenList {
            path: list_path.to_path_buf(),
            source,
        })?;
        let report =
            File::create(&self.config.output_path).map_err(|source| DriverError::CreateReport {
                path: self.config.output_path.clone(),
                source,
            })?;

        let summary = self.run(BufReader::new(list), BufWriter::new(report))?;
        self.logger.info(&format!(
            "Report written to {}",
            self.config.output_path.display()
        ));
        Ok(summary)
    }

    pub fn run(
        &mut self,
        mut list: impl BufRead,
        mut report: impl Write,
    ) -> Result<BatchSummary, DriverError> {
        let mut summary = BatchSummary::default();
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = list
                .read_until(b'\n', &mut raw)
                .map_err(DriverError::ReadList)?;
            if n == 0 {
                break;
            }
            summary.lines_read += 1;

            let line = strip_terminator(&raw);
            self.logger.echo(&format!(
                "\n===> Process line {}: {}",
                summary.lines_read,
                String::from_utf8_lossy(line)
            ));

            if is_skip_line(&raw) {
                log::warn!("Skip empty line or line starting with '#'.");
                summary.skipped += 1;
                continue;
            }

            self.process_line(line, &mut report, &mut summary)?;
            report.flush().map_err(DriverError::WriteReport)?;
        }

        self.logger.info(&format!(
            "Processed {} of {} lines: {} faces, {} failed, {} skipped",
            summary.processed, summary.lines_read, summary.faces, summary.failed, summary.skipped
        ));
        self.logger.summary();
        Ok(summary)
    }

    fn process_line(
        &mut self,
        line: &[u8],
        report: &mut impl Write,
        summary: &mut BatchSummary,
    ) -> Result<(), DriverError> {
        let image_path = resolve_path(self.config.root_dir.as_deref(), &line_as_os_str(line));

        let load_start = Instant::now();
        let frame = match self.reader.read(&image_path) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to read image: {}: {e}", image_path.display());
                return write_failure(report, line, summary);
            }
        };
        self.logger
            .timing("load", load_start.elapsed().as_secs_f64() * 1000.0);

        let wants_image = self.config.display || self.config.save_annotated;
        let result = match self.processor.process(&frame, wants_image) {
            Ok(result) => result,
            // A malformed engine result means the buffer contract is broken.
            Err(e @ ProcessError::Protocol(_)) => return Err(e.into()),
            Err(e) => {
                log::error!("Failed to process image: {}: {e}", image_path.display());
                return write_failure(report, line, summary);
            }
        };
        self.logger.timing("detect", result.detect_ms);

        let faces = result.detections.len();
        summary.processed += 1;
        summary.faces += faces;

        self.logger.echo(&format!("{faces} faces detected."));
        for face_line in result.report.lines() {
            self.logger.echo(face_line);
        }
        report
            .write_all(line)
            .and_then(|_| write!(report, "\t{faces}\n{}", result.report))
            .map_err(DriverError::WriteReport)?;

        let Some(annotated) = result.annotated else {
            return Ok(());
        };
        if self.config.display {
            self.display
                .show(RESULT_WINDOW_TITLE, &annotated)
                .map_err(|e| DriverError::Display(e.to_string()))?;
            self.display
                .wait_key(None)
                .map_err(|e| DriverError::Display(e.to_string()))?;
        }
        if self.config.save_annotated {
            let save_path = annotated_path(&image_path);
            if let Err(e) = self.writer.write(&save_path, &annotated) {
                log::warn!("Failed to save {}: {e}", save_path.display());
            }
        }
        Ok(())
    }
}

fn write_failure(
    report: &mut impl Write,
    line: &[u8],
    summary: &mut BatchSummary,
) -> Result<(), DriverError> {
    report
        .write_all(line)
        .and_then(|_| writeln!(report, "\t{LOAD_FAILED}"))
        .map_err(DriverError::WriteReport)?;
    summary.failed += 1;
    Ok(())
}
