//! Histogram construction with ordered fallback strategies.
//!
//! Strategies are tried in [`HistogramStrategy::ALL`] order and the first
//! success wins:
//!
//! 1. the service bins the field itself,
//! 2. every value is queried and binned locally,
//! 3. a fixed-size sample is rebuilt from unique-value counts,
//! 4. the features already loaded in the view are binned.
//!
//! A failed strategy is logged and recorded; only when all of them fail does
//! the caller see [`Error::HistogramUnavailable`].

use crate::classify::Classification;
use crate::stats::FieldStatistics;
use facetmap_config::Tunables;
use facetmap_core::{
    Dataset, Dialect, Error, Feature, FeatureQuery, Field, Histogram, HistogramRequest,
    HistogramSource, HistogramStrategy, QueryError, QueryProvider, Result, TierFailure,
    ViewProvider, WhereClause,
};
use facetmap_widgets::RangeHistogram;
use serde::Serialize;
use tracing::{debug, warn};

/// A histogram and how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltHistogram {
    /// Bins and domain
    pub histogram: Histogram,
    /// Data source
    pub source: HistogramSource,
    /// Strategy that succeeded
    pub strategy: HistogramStrategy,
    /// Share of the records the bins represent
    pub coverage: f64,
}

impl BuiltHistogram {
    /// Bind to a range widget. `slider = false` gives a static histogram.
    #[must_use]
    pub fn into_widget(self, field: &Field, class: &Classification, slider: bool) -> RangeHistogram {
        RangeHistogram::new(&field.name, self.histogram)
            .precision(if class.is_integer { 0 } else { 2 })
            .date(class.is_date)
            .slider(slider)
    }
}

/// What to bin.
#[derive(Debug, Clone, Copy)]
pub struct HistogramJob<'a> {
    /// Dataset holding the field
    pub dataset: &'a Dataset,
    /// Field to bin
    pub field: &'a Field,
    /// Values are numbers stored as text
    pub numeric_cast: bool,
    /// Restriction applied by the query strategies
    pub filter: &'a WhereClause,
    /// Features the service should bin instead of querying
    pub features: Option<&'a [Feature]>,
    /// Unique-value statistics, when already known
    pub stats: Option<&'a FieldStatistics>,
}

/// Builds histograms against a query provider and, optionally, a view.
pub struct HistogramBuilder<'a> {
    provider: &'a dyn QueryProvider,
    view: Option<&'a dyn ViewProvider>,
    num_bins: usize,
    sample_size: usize,
}

impl std::fmt::Debug for HistogramBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramBuilder")
            .field("num_bins", &self.num_bins)
            .field("sample_size", &self.sample_size)
            .field("has_view", &self.view.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> HistogramBuilder<'a> {
    /// Builder over a provider.
    #[must_use]
    pub fn new(provider: &'a dyn QueryProvider, tunables: &Tunables) -> Self {
        Self {
            provider,
            view: None,
            num_bins: tunables.histogram_bins,
            sample_size: tunables.synthetic_sample_size,
        }
    }

    /// Enable the view strategy.
    #[must_use]
    pub fn with_view(mut self, view: Option<&'a dyn ViewProvider>) -> Self {
        self.view = view;
        self
    }

    /// Try every strategy in order.
    pub async fn build(&self, job: &HistogramJob<'_>) -> Result<BuiltHistogram> {
        let mut failures = Vec::new();
        for strategy in HistogramStrategy::ALL {
            match self.run(strategy, job).await {
                Ok((histogram, coverage)) => {
                    debug!(
                        field = %job.field.name,
                        %strategy,
                        bins = histogram.num_bins(),
                        coverage,
                        "histogram built"
                    );
                    return Ok(BuiltHistogram {
                        histogram,
                        source: strategy.source(),
                        strategy,
                        coverage,
                    });
                }
                Err(error) => {
                    warn!(field = %job.field.name, %strategy, %error, "histogram strategy failed");
                    failures.push(TierFailure::new(strategy, error));
                }
            }
        }
        Err(Error::HistogramUnavailable {
            field: job.field.name.clone(),
            failures,
        })
    }

    async fn run(
        &self,
        strategy: HistogramStrategy,
        job: &HistogramJob<'_>,
    ) -> Result<(Histogram, f64), QueryError> {
        match strategy {
            HistogramStrategy::ServerAggregate => self.server_aggregate(job).await,
            HistogramStrategy::FullQuery => self.full_query(job).await,
            HistogramStrategy::UniqueValues => self.unique_values(job).await,
            HistogramStrategy::ViewFeatures => self.view_features(job).await,
        }
    }

    async fn server_aggregate(&self, job: &HistogramJob<'_>) -> Result<(Histogram, f64), QueryError> {
        let where_clause = job.filter.render(Dialect::Server);
        let request = HistogramRequest {
            field: &job.field.name,
            where_clause: &where_clause,
            num_bins: self.num_bins,
            numeric_cast: job.numeric_cast,
            features: job.features,
        };
        let histogram = self.provider.compute_histogram(&request).await?;
        Ok((histogram, 1.0))
    }

    async fn full_query(&self, job: &HistogramJob<'_>) -> Result<(Histogram, f64), QueryError> {
        let query = FeatureQuery::new(job.filter.render(Dialect::Server))
            .out_fields([job.field.name.as_str()]);
        let set = self.provider.query_features(&query).await?;
        if set.exceeded_transfer_limit {
            return Err(QueryError::TransferLimitExceeded);
        }
        let histogram = bin_features(&set.features, &job.field.name, self.num_bins)?;
        Ok((histogram, coverage(set.features.len(), job.dataset.record_count)))
    }

    async fn unique_values(&self, job: &HistogramJob<'_>) -> Result<(Histogram, f64), QueryError> {
        let values: Vec<(f64, u64)> = match job.stats {
            Some(stats) => stats.numeric_values().collect(),
            None => self
                .provider
                .compute_unique_values(&job.field.name)
                .await?
                .iter()
                .filter_map(|vc| vc.value.as_f64().map(|n| (n, vc.count)))
                .collect(),
        };
        let (min, max) = bounds(values.iter().map(|(v, _)| *v))
            .ok_or_else(|| QueryError::InvalidResponse("no numeric unique values".to_string()))?;
        let sample = synthetic_sample(&values, self.sample_size);
        let num_bins = self.num_bins.min(values.len()).max(1);
        Ok((Histogram::from_values_in(&sample, num_bins, min, max), 1.0))
    }

    async fn view_features(&self, job: &HistogramJob<'_>) -> Result<(Histogram, f64), QueryError> {
        let view = self
            .view
            .ok_or_else(|| QueryError::Unsupported("no view attached".to_string()))?;
        let features = view
            .loaded_features(&job.filter.render(Dialect::Client), &[job.field.name.clone()])
            .await?;
        let histogram = bin_features(&features, &job.field.name, self.num_bins)?;
        Ok((histogram, coverage(features.len(), job.dataset.record_count)))
    }
}

fn bin_features(features: &[Feature], field: &str, num_bins: usize) -> Result<Histogram, QueryError> {
    let values: Vec<f64> = features
        .iter()
        .filter_map(|f| f.get(field).as_f64())
        .collect();
    Histogram::from_values(&values, num_bins)
        .ok_or_else(|| QueryError::InvalidResponse(format!("no numeric values for {field}")))
}

fn coverage(features: usize, record_count: u64) -> f64 {
    if record_count == 0 {
        1.0
    } else {
        (features as f64 / record_count as f64).min(1.0)
    }
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
    })
}

/// Expand value counts into exactly `size` points, apportioned by largest
/// remainder. Ties go to the earlier value.
#[must_use]
pub fn synthetic_sample(values: &[(f64, u64)], size: usize) -> Vec<f64> {
    let total: u64 = values.iter().map(|(_, c)| *c).sum();
    if total == 0 || size == 0 {
        return Vec::new();
    }

    let mut quotas: Vec<(u64, f64)> = values
        .iter()
        .map(|(_, count)| {
            let exact = *count as f64 * size as f64 / total as f64;
            (exact.floor() as u64, exact - exact.floor())
        })
        .collect();
    let assigned: u64 = quotas.iter().map(|(n, _)| n).sum();
    let mut remaining = (size as u64).saturating_sub(assigned);

    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|a, b| quotas[*b].1.total_cmp(&quotas[*a].1));
    for i in order {
        if remaining == 0 {
            break;
        }
        quotas[i].0 += 1;
        remaining -= 1;
    }

    values
        .iter()
        .zip(&quotas)
        .flat_map(|((value, _), (n, _))| std::iter::repeat(*value).take(*n as usize))
        .collect()
}
