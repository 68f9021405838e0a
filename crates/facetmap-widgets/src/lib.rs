//! Filter widgets for facetmap.
//!
//! Each widget owns the UI state of one filter and renders it as a predicate
//! fragment. Drawing is left to the host; only state and predicates live here.

pub mod format;
mod range_histogram;
mod search;
mod time_window;
mod value_list;

pub use range_histogram::RangeHistogram;
pub use search::{Candidate, ValueSearch};
pub use time_window::TimeWindow;
pub use value_list::{OthersSummary, ValueItem, ValueList};

use facetmap_core::{Error, Expr, Result, Value};
use serde::{Deserialize, Serialize};

/// Kind of widget chosen for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// Checkbox list of values
    ValueList,
    /// Histogram with a range slider
    RangeHistogram,
    /// Date window with playback
    TimeWindow,
}

/// User input delivered to a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetInteraction {
    /// Range slider moved
    Range {
        /// Lower thumb
        low: f64,
        /// Upper thumb
        high: f64,
        /// Thumb released
        released: bool,
    },
    /// Time window moved
    Window {
        /// Window start, epoch ms
        start: f64,
        /// Window end, epoch ms
        end: f64,
        /// Handle released
        released: bool,
    },
    /// Checkbox toggled
    Toggle {
        /// Row index
        index: usize,
        /// New state
        checked: bool,
    },
    /// "Only" action on a row
    Only {
        /// Row index
        index: usize,
    },
    /// Uncheck every row
    Clear,
    /// Search candidate picked
    AddCandidate {
        /// Picked value
        value: Value,
    },
    /// Start time window playback
    Play,
    /// Stop time window playback
    Stop,
}

impl WidgetInteraction {
    /// Continuous drags are throttled; releases and discrete actions are not.
    #[must_use]
    pub const fn bypasses_throttle(&self) -> bool {
        match self {
            Self::Range { released, .. } | Self::Window { released, .. } => *released,
            _ => true,
        }
    }
}

/// A filter widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterWidget {
    /// Range histogram
    RangeHistogram(RangeHistogram),
    /// Value list
    ValueList(ValueList),
    /// Time window
    TimeWindow(TimeWindow),
}

impl FilterWidget {
    /// Filtered field.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::RangeHistogram(w) => w.field(),
            Self::ValueList(w) => w.field(),
            Self::TimeWindow(w) => w.field(),
        }
    }

    /// Widget kind.
    #[must_use]
    pub const fn kind(&self) -> WidgetKind {
        match self {
            Self::RangeHistogram(_) => WidgetKind::RangeHistogram,
            Self::ValueList(_) => WidgetKind::ValueList,
            Self::TimeWindow(_) => WidgetKind::TimeWindow,
        }
    }

    /// Current predicate fragment.
    #[must_use]
    pub fn predicate(&self) -> Expr {
        match self {
            Self::RangeHistogram(w) => w.predicate(),
            Self::ValueList(w) => w.predicate(),
            Self::TimeWindow(w) => w.predicate(),
        }
    }

    /// Mutable range histogram, if this is one.
    pub fn as_range_histogram_mut(&mut self) -> Option<&mut RangeHistogram> {
        match self {
            Self::RangeHistogram(w) => Some(w),
            _ => None,
        }
    }

    /// Update widget state from an interaction.
    pub fn apply(&mut self, interaction: &WidgetInteraction) -> Result<()> {
        use WidgetInteraction as I;
        match (self, interaction) {
            (Self::RangeHistogram(w), I::Range { low, high, .. }) => w.set_selection(*low, *high),
            (Self::TimeWindow(w), I::Window { start, end, .. }) => w.set_window(*start, *end),
            (Self::TimeWindow(w), I::Play) => w.play(),
            (Self::TimeWindow(w), I::Stop) => w.stop(),
            (Self::ValueList(w), I::Toggle { index, checked }) => w.toggle(*index, *checked)?,
            (Self::ValueList(w), I::Only { index }) => w.only(*index)?,
            (Self::ValueList(w), I::Clear) => w.clear(),
            (Self::ValueList(w), I::AddCandidate { value }) => {
                w.add_candidate(value.clone());
            }
            (widget, interaction) => {
                return Err(Error::InvalidInteraction(format!(
                    "{interaction:?} does not apply to {:?}",
                    widget.kind()
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_core::Histogram;

    fn histogram_widget() -> FilterWidget {
        let values: Vec<f64> = (0..=50).map(f64::from).collect();
        FilterWidget::RangeHistogram(
            RangeHistogram::new("Age", Histogram::from_values(&values, 5).unwrap()).precision(0),
        )
    }

    #[test]
    fn test_apply_range() {
        let mut w = histogram_widget();
        w.apply(&WidgetInteraction::Range {
            low: 20.0,
            high: 40.0,
            released: false,
        })
        .unwrap();
        assert_eq!(w.predicate().to_string(), "Age >= 20 AND Age <= 40");
        assert_eq!(w.kind(), WidgetKind::RangeHistogram);
        assert_eq!(w.field(), "Age");
    }

    #[test]
    fn test_mismatched_interaction() {
        let mut w = histogram_widget();
        assert!(matches!(
            w.apply(&WidgetInteraction::Clear),
            Err(Error::InvalidInteraction(_))
        ));
    }

    #[test]
    fn test_throttle_bypass() {
        assert!(!WidgetInteraction::Range {
            low: 0.0,
            high: 1.0,
            released: false
        }
        .bypasses_throttle());
        assert!(WidgetInteraction::Range {
            low: 0.0,
            high: 1.0,
            released: true
        }
        .bypasses_throttle());
        assert!(WidgetInteraction::Toggle {
            index: 0,
            checked: true
        }
        .bypasses_throttle());
    }

    #[test]
    fn test_value_list_interactions() {
        let mut w = FilterWidget::ValueList(ValueList::new(
            "Status",
            vec![
                ValueItem::new(Value::text("A"), 2, Some(0.5)),
                ValueItem::new(Value::text("B"), 2, Some(0.5)),
            ],
            2,
            4,
        ));
        w.apply(&WidgetInteraction::Only { index: 1 }).unwrap();
        assert_eq!(w.predicate().to_string(), "Status IN ('B')");
        w.apply(&WidgetInteraction::Clear).unwrap();
        assert!(w.predicate().is_tautology());
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(histogram_widget()).unwrap();
        assert_eq!(json["kind"], "range_histogram");
    }
}
