//! In-memory providers that evaluate predicates over fixture features.
//!
//! Every provider counts its calls and can be told to fail an operation, so
//! tests can assert both behavior and traffic.

use async_trait::async_trait;
use facetmap_core::{
    BgTheme, Dataset, DatasetProvider, Environment, Error, Expr, Extent, ExtentResult, Feature,
    FeatureEffect, FeatureQuery, FeatureSet, Histogram, HistogramRequest, QueryError,
    QueryProvider, StyleDecision, ThemeDetector, ValueCount, ViewProvider,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Query provider operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `query_features`
    QueryFeatures,
    /// `query_feature_count`
    FeatureCount,
    /// `query_extent`
    Extent,
    /// `compute_histogram`
    Histogram,
    /// `compute_unique_values`
    UniqueValues,
}

/// Feature service backed by a vector of features.
///
/// Server-side histograms are unsupported unless enabled, like most hosted
/// feature services.
#[derive(Debug, Default)]
pub struct MockQueryProvider {
    features: Vec<Feature>,
    unique_values: HashMap<String, Vec<ValueCount>>,
    histogram_supported: bool,
    transfer_limit: Option<usize>,
    latency: Option<Duration>,
    failing: Mutex<HashSet<Operation>>,
    calls: Mutex<HashMap<Operation, usize>>,
    where_log: Mutex<Vec<String>>,
}

impl MockQueryProvider {
    /// Provider over `features`.
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            features,
            ..Self::default()
        }
    }

    /// Answer `compute_histogram` instead of reporting it unsupported.
    #[must_use]
    pub const fn with_server_histograms(mut self) -> Self {
        self.histogram_supported = true;
        self
    }

    /// Truncate feature queries above `limit` rows.
    #[must_use]
    pub const fn with_transfer_limit(mut self, limit: usize) -> Self {
        self.transfer_limit = Some(limit);
        self
    }

    /// Delay every call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Serve fixed unique values for a field.
    #[must_use]
    pub fn with_unique_values(mut self, field: &str, values: Vec<ValueCount>) -> Self {
        self.unique_values.insert(field.to_string(), values);
        self
    }

    /// Fail an operation from now on.
    #[must_use]
    pub fn failing(self, op: Operation) -> Self {
        self.set_failing(op, true);
        self
    }

    /// Toggle failure of an operation.
    pub fn set_failing(&self, op: Operation, failing: bool) {
        let mut set = lock(&self.failing);
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    /// Number of calls to an operation.
    pub fn calls(&self, op: Operation) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Total number of calls.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    /// Where clauses received, in order.
    pub fn where_log(&self) -> Vec<String> {
        lock(&self.where_log).clone()
    }

    /// Fixture features.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    async fn enter(&self, op: Operation, where_clause: Option<&str>) -> Result<(), QueryError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        if let Some(w) = where_clause {
            lock(&self.where_log).push(w.to_string());
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if lock(&self.failing).contains(&op) {
            return Err(QueryError::Transport(format!("injected failure: {op:?}")));
        }
        Ok(())
    }

    fn matching(&self, where_clause: &str) -> Result<Vec<&Feature>, QueryError> {
        let expr = Expr::parse(where_clause).map_err(|e| QueryError::Service {
            code: 400,
            message: e.to_string(),
        })?;
        Ok(self.features.iter().filter(|f| expr.matches(f)).collect())
    }
}

/// Extent spanned by the `x`/`y` attributes of features.
#[must_use]
pub fn extent_of<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Option<Extent> {
    features
        .into_iter()
        .filter_map(|f| Some((f.get("x").as_f64()?, f.get("y").as_f64()?)))
        .fold(None, |acc: Option<Extent>, (x, y)| {
            Some(match acc {
                None => Extent::new(x, y, x, y),
                Some(e) => Extent::new(e.xmin.min(x), e.ymin.min(y), e.xmax.max(x), e.ymax.max(y)),
            })
        })
}

#[async_trait]
impl QueryProvider for MockQueryProvider {
    async fn query_features(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError> {
        self.enter(Operation::QueryFeatures, Some(&query.where_clause))
            .await?;
        let mut rows: Vec<Feature> = self
            .matching(&query.where_clause)?
            .into_iter()
            .map(|f| f.project(&query.out_fields))
            .collect();
        if let Some(field) = query.order_by.first() {
            rows.sort_by(|a, b| a.get(field).total_cmp(b.get(field)));
        }
        if query.distinct {
            let mut unique: Vec<Feature> = Vec::new();
            for row in rows {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            rows = unique;
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        let mut exceeded_transfer_limit = false;
        if let Some(limit) = self.transfer_limit {
            if rows.len() > limit {
                rows.truncate(limit);
                exceeded_transfer_limit = true;
            }
        }
        Ok(FeatureSet {
            features: rows,
            exceeded_transfer_limit,
        })
    }

    async fn query_feature_count(&self, where_clause: &str) -> Result<u64, QueryError> {
        self.enter(Operation::FeatureCount, Some(where_clause)).await?;
        Ok(self.matching(where_clause)?.len() as u64)
    }

    async fn query_extent(&self, where_clause: &str) -> Result<ExtentResult, QueryError> {
        self.enter(Operation::Extent, Some(where_clause)).await?;
        let matching = self.matching(where_clause)?;
        Ok(ExtentResult {
            extent: extent_of(matching.iter().copied()),
            count: matching.len() as u64,
        })
    }

    async fn compute_histogram(
        &self,
        request: &HistogramRequest<'_>,
    ) -> Result<Histogram, QueryError> {
        self.enter(Operation::Histogram, Some(request.where_clause))
            .await?;
        if !self.histogram_supported {
            return Err(QueryError::Unsupported("server-side histograms".to_string()));
        }
        let values: Vec<f64> = match request.features {
            Some(features) => features
                .iter()
                .filter_map(|f| f.get(request.field).as_f64())
                .collect(),
            None => self
                .matching(request.where_clause)?
                .into_iter()
                .filter_map(|f| f.get(request.field).as_f64())
                .collect(),
        };
        Histogram::from_values(&values, request.num_bins)
            .ok_or_else(|| QueryError::InvalidResponse("no numeric values".to_string()))
    }

    async fn compute_unique_values(&self, field: &str) -> Result<Vec<ValueCount>, QueryError> {
        self.enter(Operation::UniqueValues, None).await?;
        if let Some(values) = self.unique_values.get(field) {
            return Ok(values.clone());
        }
        let mut counts: Vec<ValueCount> = Vec::new();
        for feature in &self.features {
            let value = feature.get(field);
            match counts.iter_mut().find(|vc| &vc.value == value) {
                Some(vc) => vc.count += 1,
                None => counts.push(ValueCount::new(value.clone(), 1)),
            }
        }
        Ok(counts)
    }
}

/// Map view over fixture features.
#[derive(Debug)]
pub struct MockView {
    features: Vec<Feature>,
    extent: Mutex<Extent>,
    styles: Mutex<Vec<StyleDecision>>,
    effects: Mutex<Vec<FeatureEffect>>,
    navigations: Mutex<Vec<Extent>>,
    loaded_log: Mutex<Vec<String>>,
    fail_loaded: bool,
}

impl MockView {
    /// View showing `extent` with `features` loaded.
    #[must_use]
    pub const fn new(features: Vec<Feature>, extent: Extent) -> Self {
        Self {
            features,
            extent: Mutex::new(extent),
            styles: Mutex::new(Vec::new()),
            effects: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            loaded_log: Mutex::new(Vec::new()),
            fail_loaded: false,
        }
    }

    /// Fail `loaded_features`.
    #[must_use]
    pub const fn failing_loaded_features(mut self) -> Self {
        self.fail_loaded = true;
        self
    }

    /// Styles applied, oldest first.
    pub fn styles(&self) -> Vec<StyleDecision> {
        lock(&self.styles).clone()
    }

    /// Effects applied, oldest first.
    pub fn effects(&self) -> Vec<FeatureEffect> {
        lock(&self.effects).clone()
    }

    /// Extents navigated to, oldest first.
    pub fn navigations(&self) -> Vec<Extent> {
        lock(&self.navigations).clone()
    }

    /// Where clauses passed to `loaded_features`, oldest first.
    pub fn loaded_where_log(&self) -> Vec<String> {
        lock(&self.loaded_log).clone()
    }
}

#[async_trait]
impl ViewProvider for MockView {
    async fn set_style(&self, style: &StyleDecision) -> Result<(), QueryError> {
        lock(&self.styles).push(style.clone());
        Ok(())
    }

    async fn set_effect(&self, effect: &FeatureEffect) -> Result<(), QueryError> {
        lock(&self.effects).push(effect.clone());
        Ok(())
    }

    async fn loaded_features(
        &self,
        where_clause: &str,
        out_fields: &[String],
    ) -> Result<Vec<Feature>, QueryError> {
        lock(&self.loaded_log).push(where_clause.to_string());
        if self.fail_loaded {
            return Err(QueryError::Unsupported("no layer view".to_string()));
        }
        let expr = Expr::parse(where_clause)
            .map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
        Ok(self
            .features
            .iter()
            .filter(|f| expr.matches(f))
            .map(|f| f.project(out_fields))
            .collect())
    }

    fn extent(&self) -> Extent {
        *lock(&self.extent)
    }

    async fn go_to(&self, extent: Extent) -> Result<(), QueryError> {
        *lock(&self.extent) = extent;
        lock(&self.navigations).push(extent);
        Ok(())
    }
}

/// Theme detector with a fixed answer.
#[derive(Debug, Clone)]
pub struct MockThemeDetector {
    result: Result<BgTheme, String>,
}

impl MockThemeDetector {
    /// Always detect `theme`.
    #[must_use]
    pub const fn returning(theme: BgTheme) -> Self {
        Self { result: Ok(theme) }
    }

    /// Always fail.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl ThemeDetector for MockThemeDetector {
    async fn detect(&self) -> Result<BgTheme, Error> {
        self.result.clone().map_err(Error::ThemeDetectionFailed)
    }
}

/// Dataset loader over an in-memory catalog.
#[derive(Debug, Default)]
pub struct MockDatasetProvider {
    by_id: HashMap<String, Dataset>,
    by_slug: HashMap<String, Dataset>,
}

impl MockDatasetProvider {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset under its id and an optional slug.
    #[must_use]
    pub fn with_dataset(mut self, dataset: Dataset, slug: Option<&str>) -> Self {
        if let Some(slug) = slug {
            self.by_slug.insert(slug.to_string(), dataset.clone());
        }
        self.by_id.insert(dataset.id.clone(), dataset);
        self
    }
}

#[async_trait]
impl DatasetProvider for MockDatasetProvider {
    async fn fetch_by_id(&self, id: &str, _env: Environment) -> Result<Dataset, Error> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::DatasetLoadFailed {
                target: id.to_string(),
                reason: "not found".to_string(),
            })
    }

    async fn fetch_by_slug(&self, slug: &str, _env: Environment) -> Result<Dataset, Error> {
        self.by_slug
            .get(slug)
            .cloned()
            .ok_or_else(|| Error::DatasetLoadFailed {
                target: slug.to_string(),
                reason: "not found".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_core::Value;

    fn features() -> Vec<Feature> {
        (0..10)
            .map(|i| {
                Feature::from_pairs([
                    ("n", Value::Number(f64::from(i))),
                    ("x", Value::Number(f64::from(i))),
                    ("y", Value::Number(f64::from(i * 2))),
                ])
            })
            .collect()
    }

    #[tokio::test]
    async fn test_query_filters_and_counts_calls() {
        let provider = MockQueryProvider::new(features());
        let set = provider
            .query_features(&FeatureQuery::new("n >= 5").out_fields(["n"]))
            .await
            .unwrap();
        assert_eq!(set.features.len(), 5);
        assert_eq!(set.features[0].attributes.len(), 1);
        assert_eq!(provider.calls(Operation::QueryFeatures), 1);
        assert_eq!(provider.where_log(), vec!["n >= 5".to_string()]);
    }

    #[tokio::test]
    async fn test_transfer_limit() {
        let provider = MockQueryProvider::new(features()).with_transfer_limit(3);
        let set = provider.query_features(&FeatureQuery::new("1=1")).await.unwrap();
        assert!(set.exceeded_transfer_limit);
        assert_eq!(set.features.len(), 3);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let provider = MockQueryProvider::new(features()).failing(Operation::FeatureCount);
        assert!(provider.query_feature_count("1=1").await.is_err());
        provider.set_failing(Operation::FeatureCount, false);
        assert_eq!(provider.query_feature_count("1=1").await.unwrap(), 10);
        assert_eq!(provider.calls(Operation::FeatureCount), 2);
    }

    #[tokio::test]
    async fn test_histogram_unsupported_by_default() {
        let provider = MockQueryProvider::new(features());
        let request = HistogramRequest {
            field: "n",
            where_clause: "1=1",
            num_bins: 5,
            numeric_cast: false,
            features: None,
        };
        assert!(matches!(
            provider.compute_histogram(&request).await,
            Err(QueryError::Unsupported(_))
        ));
        let provider = provider.with_server_histograms();
        assert_eq!(
            provider.compute_histogram(&request).await.unwrap().total_count(),
            10
        );
    }

    #[tokio::test]
    async fn test_extent() {
        let provider = MockQueryProvider::new(features());
        let result = provider.query_extent("n <= 4").await.unwrap();
        assert_eq!(result.count, 5);
        assert_eq!(result.extent, Some(Extent::new(0.0, 0.0, 4.0, 8.0)));
    }

    #[tokio::test]
    async fn test_bad_where_is_service_error() {
        let provider = MockQueryProvider::new(features());
        assert!(matches!(
            provider.query_feature_count("n >=").await,
            Err(QueryError::Service { code: 400, .. })
        ));
    }

    #[tokio::test]
    async fn test_theme_detector() {
        assert!(matches!(
            MockThemeDetector::failing("hidden tab").detect().await,
            Err(Error::ThemeDetectionFailed(_))
        ));
    }
}
