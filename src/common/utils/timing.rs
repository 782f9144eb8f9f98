use std::{fmt, time::Instant};

/// Elapsed-time helper for log lines
#[must_use]
pub struct Timing {
    start: Instant,
}

impl Default for Timing {
    fn default() -> Self {
        Self::new()
    }
}

impl Timing {
    /// Start timing now
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the time since the last reset, and reset the start to the current time
    #[inline]
    pub fn elapsed(&mut self) -> String {
        let result = self.to_string();
        self.start = Instant::now();

        result
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.start.elapsed();

        let mut elapsed = time.as_millis();
        let mut unit = "ms";

        if elapsed <= 1 {
            elapsed = time.as_micros();
            unit = "μs";
        }
        if elapsed <= 1 {
            elapsed = time.as_nanos();
            unit = "ns";
        }

        write!(f, "{elapsed}{unit}")
    }
}
