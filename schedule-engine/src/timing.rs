use tokio::time::Instant;

/// Clock and position range of the driving timing object.
pub trait TimingSource: Send + Sync {
    /// Monotonic seconds.
    fn now(&self) -> f64;
    /// Allowed position range; either bound may be infinite.
    fn range(&self) -> (f64, f64);
}

/// Timing source anchored at construction. Backed by the tokio clock so a
/// paused runtime drives it deterministically.
pub struct LocalTimingSource {
    origin: Instant,
    range: (f64, f64),
}

impl LocalTimingSource {
    pub fn new() -> Self {
        Self::with_range((f64::NEG_INFINITY, f64::INFINITY))
    }

    pub fn with_range(range: (f64, f64)) -> Self {
        Self {
            origin: Instant::now(),
            range,
        }
    }
}

impl Default for LocalTimingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingSource for LocalTimingSource {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn range(&self) -> (f64, f64) {
        self.range
    }
}
