use std::collections::HashMap;
use std::io::Write;
use std::time::Instant;

/// Cross-cutting logger for pipeline orchestration events.
///
/// Decouples drivers from specific output mechanisms so each caller can
/// observe pipeline behavior without changing the orchestration code.
pub trait PipelineLogger: Send {
    /// Echo one line of console output mirroring the report content.
    fn echo(&mut self, line: &str);

    /// Record how long a named pipeline stage took for one item.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
///
/// Used by tests where logger output is irrelevant.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn echo(&mut self, _line: &str) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI-oriented logger: echoes report content to stdout and keeps per-stage
/// timings for a summary at the end of the run.
pub struct StdoutPipelineLogger {
    out: Box<dyn Write + Send>,
    timings: HashMap<String, Vec<f64>>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Echoes to `out` instead of stdout.
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            timings: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({:.1}s total):",
            elapsed_ms / 1000.0
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len() as f64;
            lines.push(format!(
                "  {stage:12}: {:5} calls, avg {avg_ms:6.1}ms  total {total_ms:7.0}ms",
                durations.len()
            ));
        }

        Some(lines.join("\n"))
    }

    /// Returns the timing data for a given stage.
    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn echo(&mut self, line: &str) {
        // Console echo is best effort; a closed stdout must not stop the run.
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            log::debug!("Console echo failed: {e}");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
