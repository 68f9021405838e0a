//! Leading-edge throttle.

use tokio::time::{Duration, Instant};

/// Admits the first call in each window and drops the rest.
///
/// There is no trailing call: work dropped inside a window is never replayed.
#[derive(Debug, Clone)]
pub struct Throttle {
    window: Duration,
    last: Option<Instant>,
    dropped: u64,
}

impl Throttle {
    /// Create a throttle with the given window.
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            last: None,
            dropped: 0,
        }
    }

    /// Create a throttle with a window in milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Whether a call at `now` may run. Admitted calls open a new window.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => {
                self.dropped += 1;
                false
            }
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    /// Forget the current window.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Calls dropped so far.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Window length.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_edge() {
        let start = Instant::now();
        let mut throttle = Throttle::from_millis(100);
        assert!(throttle.ready(start));
        assert!(!throttle.ready(start + Duration::from_millis(10)));
        assert!(!throttle.ready(start + Duration::from_millis(99)));
        assert!(throttle.ready(start + Duration::from_millis(100)));
        assert_eq!(throttle.dropped(), 2);
    }

    #[test]
    fn test_dropped_calls_do_not_extend_window() {
        let start = Instant::now();
        let mut throttle = Throttle::from_millis(100);
        assert!(throttle.ready(start));
        for ms in (10..100).step_by(10) {
            assert!(!throttle.ready(start + Duration::from_millis(ms)));
        }
        assert!(throttle.ready(start + Duration::from_millis(105)));
    }

    #[test]
    fn test_reset() {
        let start = Instant::now();
        let mut throttle = Throttle::from_millis(100);
        assert!(throttle.ready(start));
        throttle.reset();
        assert!(throttle.ready(start));
    }
}
