/// Cumulative mean of per-frame detection latency over a whole run.
///
/// Every frame weighs the same; there is no window or decay.
#[derive(Clone, Debug, Default)]
pub struct LatencyMeter {
    total_ms: f64,
    frames: usize,
}

impl LatencyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, latency_ms: f64) {
        self.total_ms += latency_ms;
        self.frames += 1;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Mean latency in ms, 0 before the first frame.
    pub fn average_ms(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.total_ms / self.frames as f64
        }
    }

    /// Frames per second implied by the mean latency. Infinite when the
    /// mean is 0.
    pub fn fps(&self) -> f64 {
        1000.0 / self.average_ms()
    }
}
