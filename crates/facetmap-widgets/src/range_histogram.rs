//! Histogram with a range selection.

use crate::format::format_date;
use facetmap_core::value::format_number;
use facetmap_core::{Color, Expr, Histogram};
use serde::Serialize;

/// Range filter over a binned distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeHistogram {
    /// Filtered field
    field: String,
    /// Bins and full domain
    histogram: Histogram,
    /// Selected `[low, high]`
    selection: (f64, f64),
    /// Decimal places kept in the selection
    precision: usize,
    /// Labels are dates
    is_date: bool,
    /// Has a range slider; static histograms do not filter
    slider: bool,
    /// Color of bars outside the selection
    excluded_bar_color: Color,
}

impl RangeHistogram {
    /// Create a slider over the histogram's full domain.
    #[must_use]
    pub fn new(field: impl Into<String>, histogram: Histogram) -> Self {
        let selection = (histogram.min_value, histogram.max_value);
        Self {
            field: field.into(),
            histogram,
            selection,
            precision: 2,
            is_date: false,
            slider: true,
            excluded_bar_color: Color::from_rgb8(0xdd, 0xdd, 0xdd),
        }
    }

    /// Set decimal places (0 for integer fields).
    #[must_use]
    pub const fn precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Format labels as dates.
    #[must_use]
    pub const fn date(mut self, is_date: bool) -> Self {
        self.is_date = is_date;
        self
    }

    /// Enable or disable the range slider.
    #[must_use]
    pub const fn slider(mut self, slider: bool) -> Self {
        self.slider = slider;
        self
    }

    /// Filtered field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Current bins.
    #[must_use]
    pub const fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> (f64, f64) {
        self.selection
    }

    /// Has a slider.
    #[must_use]
    pub const fn has_slider(&self) -> bool {
        self.slider
    }

    /// Color of bars outside the selection.
    #[must_use]
    pub const fn excluded_bar_color(&self) -> Color {
        self.excluded_bar_color
    }

    /// Move the selection, clamped to the domain and rounded.
    pub fn set_selection(&mut self, low: f64, high: f64) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let min = self.histogram.min_value;
        let max = self.histogram.max_value;
        self.selection = (
            self.round(low.clamp(min, max)),
            self.round(high.clamp(min, max)),
        );
    }

    fn round(&self, v: f64) -> f64 {
        if self.is_date {
            return v;
        }
        let scale = 10f64.powi(self.precision as i32);
        (v * scale).round() / scale
    }

    /// Selection spans the whole domain.
    #[must_use]
    pub fn is_full_range(&self) -> bool {
        self.selection.0 <= self.histogram.min_value && self.selection.1 >= self.histogram.max_value
    }

    /// Replace the bins, keeping the domain and selection.
    pub fn rebin(&mut self, values: &[f64]) {
        self.histogram = Histogram::from_values_in(
            values,
            self.histogram.num_bins().max(1),
            self.histogram.min_value,
            self.histogram.max_value,
        );
    }

    /// `field >= low AND field <= high`
    #[must_use]
    pub fn predicate(&self) -> Expr {
        let (low, high) = self.selection;
        Expr::col(&self.field)
            .gte(Expr::num(low))
            .and(Expr::col(&self.field).lte(Expr::num(high)))
    }

    /// Label for a slider value.
    #[must_use]
    pub fn label(&self, value: f64) -> String {
        if self.is_date {
            format_date(value)
        } else {
            format_number(self.round(value))
        }
    }
}
