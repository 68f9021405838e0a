//! Time window filter with playback.

use crate::format::date_of;
use facetmap_core::{Expr, Histogram};
use serde::Serialize;

/// Share of the full extent the window is narrowed to when playback starts.
const PLAYBACK_SHARE: f64 = 0.1;

/// Date range filter over epoch-millisecond values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeWindow {
    field: String,
    full: (f64, f64),
    window: (f64, f64),
    playing: bool,
    saved: Option<(f64, f64)>,
    histogram: Option<Histogram>,
}

impl TimeWindow {
    /// Window covering the full extent.
    #[must_use]
    pub fn new(field: impl Into<String>, start: f64, end: f64) -> Self {
        let full = if start <= end { (start, end) } else { (end, start) };
        Self {
            field: field.into(),
            full,
            window: full,
            playing: false,
            saved: None,
            histogram: None,
        }
    }

    /// Nest a static histogram of the distribution.
    #[must_use]
    pub fn with_histogram(mut self, histogram: Histogram) -> Self {
        self.histogram = Some(histogram);
        self
    }

    /// Filtered field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Full extent.
    #[must_use]
    pub const fn full_extent(&self) -> (f64, f64) {
        self.full
    }

    /// Current window.
    #[must_use]
    pub const fn window(&self) -> (f64, f64) {
        self.window
    }

    /// Playback running.
    #[must_use]
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Nested histogram.
    #[must_use]
    pub const fn histogram(&self) -> Option<&Histogram> {
        self.histogram.as_ref()
    }

    /// Move the window, clamped to the full extent.
    pub fn set_window(&mut self, start: f64, end: f64) {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        self.window = (
            start.clamp(self.full.0, self.full.1),
            end.clamp(self.full.0, self.full.1),
        );
    }

    /// Start playback. A window spanning (nearly) the full extent is first
    /// narrowed to its leading tenth.
    pub fn play(&mut self) {
        let span = self.full.1 - self.full.0;
        let width = self.window.1 - self.window.0;
        if span > 0.0 && width >= span * (1.0 - PLAYBACK_SHARE) {
            self.saved = Some(self.window);
            self.window = (self.full.0, span.mul_add(PLAYBACK_SHARE, self.full.0));
        }
        self.playing = true;
    }

    /// Stop playback, restoring a window narrowed by [`TimeWindow::play`].
    pub fn stop(&mut self) {
        self.playing = false;
        if let Some(saved) = self.saved.take() {
            self.window = saved;
        }
    }

    /// `field BETWEEN DATE 'start' AND DATE 'end'`
    #[must_use]
    pub fn predicate(&self) -> Expr {
        Expr::col(&self.field).between(
            Expr::date(date_of(self.window.0)),
            Expr::date(date_of(self.window.1)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: f64 = 86_400_000.0;

    fn widget() -> TimeWindow {
        TimeWindow::new("Opened", 0.0, 100.0 * DAY)
    }

    #[test]
    fn test_predicate_uses_sql_dates() {
        assert_eq!(
            widget().predicate().to_string(),
            "Opened BETWEEN DATE '1970-01-01' AND DATE '1970-04-11'"
        );
    }

    #[test]
    fn test_play_narrows_full_window_and_stop_restores() {
        let mut w = widget();
        w.play();
        assert!(w.is_playing());
        assert_eq!(w.window(), (0.0, 10.0 * DAY));
        w.stop();
        assert!(!w.is_playing());
        assert_eq!(w.window(), (0.0, 100.0 * DAY));
    }

    #[test]
    fn test_play_keeps_narrow_window() {
        let mut w = widget();
        w.set_window(20.0 * DAY, 30.0 * DAY);
        w.play();
        assert_eq!(w.window(), (20.0 * DAY, 30.0 * DAY));
        w.stop();
        assert_eq!(w.window(), (20.0 * DAY, 30.0 * DAY));
    }

    #[test]
    fn test_nearly_full_window_counts_as_full() {
        let mut w = widget();
        w.set_window(5.0 * DAY, 100.0 * DAY);
        w.play();
        assert_eq!(w.window(), (0.0, 10.0 * DAY));
    }

    #[test]
    fn test_window_clamped() {
        let mut w = widget();
        w.set_window(200.0 * DAY, -DAY);
        assert_eq!(w.window(), (0.0, 100.0 * DAY));
    }
}
