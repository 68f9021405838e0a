//! Equal-width histogram bins and the strategy vocabulary used to build them.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A histogram bin covering `[min_value, max_value)`; the last bin is closed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bin {
    /// Lower edge
    pub min_value: f64,
    /// Upper edge
    pub max_value: f64,
    /// Number of values in the bin
    pub count: u64,
}

/// Binned distribution over a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    /// Bins in ascending order
    pub bins: Vec<Bin>,
    /// Domain minimum
    pub min_value: f64,
    /// Domain maximum
    pub max_value: f64,
}

impl Histogram {
    /// Bin values over their own domain. Non-finite values are ignored.
    ///
    /// Returns `None` when there are no finite values.
    #[must_use]
    pub fn from_values(values: &[f64], num_bins: usize) -> Option<Self> {
        let (min, max) = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self::from_values_in(values, num_bins, min, max))
    }

    /// Bin values over an explicit domain. Values outside it are dropped.
    #[must_use]
    pub fn from_values_in(values: &[f64], num_bins: usize, min: f64, max: f64) -> Self {
        let num_bins = if max > min { num_bins.max(1) } else { 1 };
        let bin_width = (max - min) / num_bins as f64;

        // Edges
        let mut bins: Vec<Bin> = (0..num_bins)
            .map(|i| Bin {
                min_value: (i as f64).mul_add(bin_width, min),
                max_value: if i + 1 == num_bins {
                    max
                } else {
                    ((i + 1) as f64).mul_add(bin_width, min)
                },
                count: 0,
            })
            .collect();

        // Counts
        for &value in values {
            if !value.is_finite() || value < min || value > max {
                continue;
            }
            let idx = if bin_width > 0.0 {
                (((value - min) / bin_width).floor() as usize).min(num_bins - 1)
            } else {
                0
            };
            bins[idx].count += 1;
        }

        Self {
            bins,
            min_value: min,
            max_value: max,
        }
    }

    /// Number of bins.
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.bins.len()
    }

    /// Sum of all bin counts.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    /// Largest bin count.
    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// Width of each bin.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        if self.bins.is_empty() {
            0.0
        } else {
            (self.max_value - self.min_value) / self.bins.len() as f64
        }
    }
}

/// Where histogram data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistogramSource {
    /// Server-side aggregation
    #[serde(rename = "widgets")]
    ServerAggregate,
    /// Queried from the layer or its statistics
    #[serde(rename = "layerQuery")]
    LayerQuery,
    /// Features already loaded in the view
    #[serde(rename = "layerView")]
    LayerView,
}

impl HistogramSource {
    /// Stable identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServerAggregate => "widgets",
            Self::LayerQuery => "layerQuery",
            Self::LayerView => "layerView",
        }
    }
}

impl fmt::Display for HistogramSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Histogram construction strategies, in fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramStrategy {
    /// Server computes the bins
    ServerAggregate,
    /// Query every value and bin locally
    FullQuery,
    /// Rebuild a sample from unique-value statistics
    UniqueValues,
    /// Bin the features loaded in the view
    ViewFeatures,
}

impl HistogramStrategy {
    /// All strategies in the order they are tried.
    pub const ALL: [Self; 4] = [
        Self::ServerAggregate,
        Self::FullQuery,
        Self::UniqueValues,
        Self::ViewFeatures,
    ];

    /// Source reported when this strategy succeeds.
    #[must_use]
    pub const fn source(self) -> HistogramSource {
        match self {
            Self::ServerAggregate => HistogramSource::ServerAggregate,
            Self::FullQuery | Self::UniqueValues => HistogramSource::LayerQuery,
            Self::ViewFeatures => HistogramSource::LayerView,
        }
    }
}

impl fmt::Display for HistogramStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ServerAggregate => "server aggregate",
            Self::FullQuery => "full query",
            Self::UniqueValues => "unique values",
            Self::ViewFeatures => "view features",
        };
        f.write_str(name)
    }
}

/// A failed histogram strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierFailure {
    /// Strategy that failed
    pub strategy: HistogramStrategy,
    /// Why it failed
    pub error: QueryError,
}

impl TierFailure {
    /// Record a failure.
    #[must_use]
    pub const fn new(strategy: HistogramStrategy, error: QueryError) -> Self {
        Self { strategy, error }
    }
}

impl fmt::Display for TierFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_histogram_empty() {
        assert!(Histogram::from_values(&[], 10).is_none());
        assert!(Histogram::from_values(&[f64::NAN], 10).is_none());
    }

    #[test]
    fn test_histogram_single_value() {
        let hist = Histogram::from_values(&[5.0, 5.0], 10).unwrap();
        assert_eq!(hist.num_bins(), 1);
        assert_eq!(hist.total_count(), 2);
        assert_eq!(hist.bins[0].min_value, 5.0);
        assert_eq!(hist.bins[0].max_value, 5.0);
    }

    #[test]
    fn test_histogram_uniform() {
        let data: Vec<f64> = (0..100).map(f64::from).collect();
        let hist = Histogram::from_values(&data, 10).unwrap();
        assert_eq!(hist.num_bins(), 10);
        assert_eq!(hist.total_count(), 100);
        assert_eq!(hist.min_value, 0.0);
        assert_eq!(hist.max_value, 99.0);
        for bin in &hist.bins {
            assert!((9..=11).contains(&bin.count));
        }
    }

    #[test]
    fn test_histogram_max_lands_in_last_bin() {
        let hist = Histogram::from_values_in(&[0.0, 10.0], 5, 0.0, 10.0);
        assert_eq!(hist.bins[0].count, 1);
        assert_eq!(hist.bins[4].count, 1);
        assert_eq!(hist.bins[4].max_value, 10.0);
        assert!((hist.bin_width() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_histogram_domain_drops_outliers() {
        let hist = Histogram::from_values_in(&[-1.0, 1.0, 11.0], 2, 0.0, 10.0);
        assert_eq!(hist.total_count(), 1);
    }

    #[test]
    fn test_source_serde_names() {
        assert_eq!(
            serde_json::to_string(&HistogramSource::ServerAggregate).unwrap(),
            "\"widgets\""
        );
        assert_eq!(
            serde_json::to_string(&HistogramSource::LayerView).unwrap(),
            "\"layerView\""
        );
        assert_eq!(HistogramStrategy::UniqueValues.source(), HistogramSource::LayerQuery);
    }

    proptest! {
        #[test]
        fn prop_binning_conserves_finite_values(
            data in prop::collection::vec(-1e6f64..1e6, 1..200),
            bins in 1usize..40,
        ) {
            let hist = Histogram::from_values(&data, bins).unwrap();
            prop_assert_eq!(hist.total_count(), data.len() as u64);
            prop_assert!(hist.num_bins() <= bins);
        }
    }
}
