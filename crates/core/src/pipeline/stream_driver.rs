use std::time::Duration;

use crate::pipeline::driver_error::DriverError;
use crate::pipeline::frame_processor::{FrameProcessor, FrameResult, ProcessError};
use crate::pipeline::latency_meter::LatencyMeter;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{ESCAPE_KEY, RESULT_WINDOW_TITLE};
use crate::video::domain::frame_display::FrameDisplay;
use crate::video::domain::frame_source::FrameSource;

#[derive(Clone, Debug)]
pub struct StreamConfig {
    pub window_title: String,
    /// How long to wait for a stop key after each frame.
    pub poll_interval: Duration,
    pub stop_keys: Vec<char>,
    /// Stop cleanly after this many grabbed frames. `None` runs until a stop
    /// key.
    pub max_frames: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            window_title: RESULT_WINDOW_TITLE.to_string(),
            poll_interval: Duration::from_millis(5),
            stop_keys: vec![ESCAPE_KEY, 'q', 'Q'],
            max_frames: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StreamSummary {
    pub frames: usize,
    /// Frames dropped because detection or annotation failed.
    pub skipped: usize,
    pub average_ms: f64,
    pub fps: f64,
}

/// Detects faces on live frames until a stop key is pressed.
pub struct StreamDriver {
    processor: FrameProcessor,
    source: Box<dyn FrameSource>,
    display: Box<dyn FrameDisplay>,
    logger: Box<dyn PipelineLogger>,
    config: StreamConfig,
}

impl StreamDriver {
    pub fn new(
        processor: FrameProcessor,
        source: Box<dyn FrameSource>,
        display: Box<dyn FrameDisplay>,
        logger: Box<dyn PipelineLogger>,
        config: StreamConfig,
    ) -> Self {
        Self {
            processor,
            source,
            display,
            logger,
            config,
        }
    }

    pub fn run(&mut self) -> Result<StreamSummary, DriverError> {
        self.source
            .open()
            .map_err(|e| DriverError::SourceOpen {
                device: self.source.describe(),
                message: e.to_string(),
            })?;
        self.logger.info(&format!(
            "Detecting with {} ({}). Press ESC or 'q' to exit...",
            self.processor.variant(),
            self.processor.engine_name()
        ));

        let mut meter = LatencyMeter::new();
        let mut grabbed = 0;
        let mut skipped = 0;
        loop {
            if self.config.max_frames.is_some_and(|max| grabbed >= max) {
                break;
            }
            let frame = self
                .source
                .next_frame()
                .ok_or_else(|| DriverError::EndOfStream(self.source.describe()))?;
            grabbed += 1;

            match self.processor.process(&frame, true) {
                Ok(result) => self.show_result(&mut meter, &result)?,
                Err(e @ ProcessError::Protocol(_)) => return Err(e.into()),
                Err(e) => {
                    log::error!("Skipping frame {}: {e}", frame.index());
                    skipped += 1;
                }
            }

            let key = self
                .display
                .wait_key(Some(self.config.poll_interval))
                .map_err(|e| DriverError::Display(e.to_string()))?;
            if key.is_some_and(|k| self.config.stop_keys.contains(&k)) {
                break;
            }
        }

        let summary = StreamSummary {
            frames: meter.frames(),
            skipped,
            average_ms: meter.average_ms(),
            fps: meter.fps(),
        };
        self.logger.info(&format!(
            "Stopped after {} frames, average {:.2} ms ({:.1} FPS)",
            summary.frames, summary.average_ms, summary.fps
        ));
        self.logger.summary();
        Ok(summary)
    }

    fn show_result(
        &mut self,
        meter: &mut LatencyMeter,
        result: &FrameResult,
    ) -> Result<(), DriverError> {
        meter.record(result.detect_ms);
        self.logger.timing("detect", result.detect_ms);

        self.logger.echo(&format!(
            "average time = {:.2} ms; FPS = {:.1}",
            meter.average_ms(),
            meter.fps()
        ));
        self.logger
            .echo(&format!("{} faces detected.", result.detections.len()));
        for face_line in result.report.lines() {
            self.logger.echo(face_line);
        }

        if let Some(annotated) = &result.annotated {
            self.display
                .show(&self.config.window_title, annotated)
                .map_err(|e| DriverError::Display(e.to_string()))?;
        }
        Ok(())
    }
}
