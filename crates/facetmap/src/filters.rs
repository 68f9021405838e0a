//! Active filters, their predicates and sibling widget refresh.

use crate::classify::FieldClassifier;
use crate::histogram::{HistogramBuilder, HistogramJob};
use crate::stats::StatsCache;
use facetmap_config::Tunables;
use facetmap_core::{
    Dataset, Dialect, Error, Expr, FeatureQuery, QueryProvider, Result, Throttle, ViewProvider,
    WhereClause,
};
use facetmap_widgets::{
    FilterWidget, TimeWindow, ValueItem, ValueList, WidgetInteraction, WidgetKind,
};
use tokio::time::Instant;
use tracing::{debug, info};

/// Collaborators a filter operation may call.
#[derive(Clone, Copy)]
pub struct FilterServices<'a> {
    /// Current dataset
    pub dataset: &'a Dataset,
    /// Feature service
    pub provider: &'a dyn QueryProvider,
    /// Map view, if any
    pub view: Option<&'a dyn ViewProvider>,
    /// Statistics cache of the dataset
    pub stats: &'a StatsCache,
}

/// One active filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterEntry {
    /// Filtered field
    pub field_name: String,
    /// Values are numbers
    pub number_like: bool,
    /// Values are numbers stored as text; cast in the server dialect
    pub numeric_cast: bool,
    /// Widget state
    pub widget: FilterWidget,
    /// Predicate fragment last applied
    pub fragment: Expr,
}

/// What became of a widget change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Fragment recomputed and predicate recomposed
    Recomposed,
    /// Widget updated; recomposition dropped by the throttle
    Throttled,
}

/// Active filters in creation order, at most one per field.
#[derive(Debug)]
pub struct FilterRegistry {
    entries: Vec<FilterEntry>,
    classifier: FieldClassifier,
    tunables: Tunables,
    filter_throttle: Throttle,
    refresh_throttle: Throttle,
    recompositions: u64,
    refreshes: u64,
}

impl FilterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            entries: Vec::new(),
            classifier: FieldClassifier::new(tunables),
            tunables: tunables.clone(),
            filter_throttle: Throttle::new(tunables.filter_throttle()),
            refresh_throttle: Throttle::new(tunables.refresh_throttle()),
            recompositions: 0,
            refreshes: 0,
        }
    }

    /// Entries in creation order.
    #[must_use]
    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Entry for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FilterEntry> {
        self.entries.iter().find(|e| e.field_name == field)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recompositions performed so far.
    #[must_use]
    pub const fn recompositions(&self) -> u64 {
        self.recompositions
    }

    /// Sibling refreshes performed so far.
    #[must_use]
    pub const fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.filter_throttle.reset();
        self.refresh_throttle.reset();
        self.recompositions += 1;
    }

    /// Create a filter for `field`, or return the existing one.
    ///
    /// No entry is created when statistics or the histogram are unavailable.
    pub async fn add_filter(
        &mut self,
        field: &str,
        services: FilterServices<'_>,
    ) -> Result<&FilterEntry> {
        let field = services.dataset.field(field)?;
        if let Some(index) = self.position(&field.name) {
            return Ok(&self.entries[index]);
        }

        let stats = services
            .stats
            .get_unique_value_stats(services.dataset, &field.name, services.provider)
            .await?;
        let class = self.classifier.classify(field, &stats);
        let kind = self.classifier.widget_kind(field, &class);

        let widget = match kind {
            WidgetKind::ValueList => {
                let items = stats
                    .top_values
                    .iter()
                    .map(|v| ValueItem::new(v.value.clone(), v.count, Some(v.pct)))
                    .collect();
                FilterWidget::ValueList(
                    ValueList::new(&field.name, items, stats.unique_count, stats.count)
                        .date(class.is_date),
                )
            }
            WidgetKind::RangeHistogram | WidgetKind::TimeWindow => {
                let filter = self.where_clause();
                let job = HistogramJob {
                    dataset: services.dataset,
                    field,
                    numeric_cast: class.needs_cast(field),
                    filter: &filter,
                    features: None,
                    stats: Some(stats.as_ref()),
                };
                let built = HistogramBuilder::new(services.provider, &self.tunables)
                    .with_view(services.view)
                    .build(&job)
                    .await?;
                if kind == WidgetKind::TimeWindow {
                    let h = built.histogram;
                    FilterWidget::TimeWindow(
                        TimeWindow::new(&field.name, h.min_value, h.max_value).with_histogram(h),
                    )
                } else {
                    FilterWidget::RangeHistogram(built.into_widget(field, &class, true))
                }
            }
        };

        info!(field = %field.name, kind = ?widget.kind(), "filter added");
        let fragment = widget.predicate();
        self.entries.push(FilterEntry {
            field_name: field.name.clone(),
            number_like: class.is_number_like,
            numeric_cast: class.needs_cast(field),
            widget,
            fragment,
        });
        self.recompositions += 1;
        let last = self.entries.len() - 1;
        Ok(&self.entries[last])
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.field_name == field)
    }

    /// Apply a widget interaction.
    ///
    /// The widget always takes the new state. The fragment is recomputed on
    /// the leading edge of each throttle window and on release.
    pub fn on_widget_change(
        &mut self,
        field: &str,
        interaction: &WidgetInteraction,
    ) -> Result<ChangeOutcome> {
        let index = self
            .position(field)
            .ok_or_else(|| Error::FilterNotFound(field.to_string()))?;
        self.entries[index].widget.apply(interaction)?;

        if !interaction.bypasses_throttle() && !self.filter_throttle.ready(Instant::now()) {
            return Ok(ChangeOutcome::Throttled);
        }
        let entry = &mut self.entries[index];
        entry.fragment = entry.widget.predicate();
        self.recompositions += 1;
        debug!(field, fragment = %entry.fragment, "fragment updated");
        Ok(ChangeOutcome::Recomposed)
    }

    /// Delete a filter.
    pub fn remove_filter(&mut self, field: &str) -> Result<FilterEntry> {
        let index = self
            .position(field)
            .ok_or_else(|| Error::FilterNotFound(field.to_string()))?;
        self.recompositions += 1;
        info!(field, "filter removed");
        Ok(self.entries.remove(index))
    }

    /// Conjunction of every fragment, in creation order.
    #[must_use]
    pub fn where_clause(&self) -> WhereClause {
        self.where_clause_excluding(&[])
    }

    /// Conjunction of every fragment except those of `excluded` fields.
    #[must_use]
    pub fn where_clause_excluding(&self, excluded: &[&str]) -> WhereClause {
        self.entries
            .iter()
            .filter(|e| !excluded.contains(&e.field_name.as_str()))
            .fold(WhereClause::all(), |clause, e| {
                clause.with(
                    e.fragment.clone(),
                    e.numeric_cast.then(|| e.field_name.clone()),
                )
            })
    }

    /// Render the composed predicate.
    #[must_use]
    pub fn compose_predicate(&self, dialect: Dialect) -> String {
        self.where_clause().render(dialect)
    }

    /// Re-bin every other range histogram against the features the current
    /// filters let through.
    ///
    /// One query is issued, constrained by every filter except the widgets
    /// being refreshed. Returns the refreshed fields; empty when throttled or
    /// when there is nothing to refresh.
    pub async fn refresh_other_widgets(
        &mut self,
        changed: &str,
        provider: &dyn QueryProvider,
        force: bool,
    ) -> Result<Vec<String>> {
        let targets: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.field_name != changed && e.widget.kind() == WidgetKind::RangeHistogram)
            .map(|e| e.field_name.clone())
            .collect();
        if targets.is_empty() {
            return Ok(Vec::new());
        }
        if !force && !self.refresh_throttle.ready(Instant::now()) {
            return Ok(Vec::new());
        }

        let excluded: Vec<&str> = targets.iter().map(String::as_str).collect();
        let query = FeatureQuery::new(self.where_clause_excluding(&excluded).render(Dialect::Server))
            .out_fields(targets.iter().map(String::as_str));
        let set = provider.query_features(&query).await?;
        if set.exceeded_transfer_limit {
            debug!(changed, returned = set.features.len(), "refresh query truncated");
        }

        for entry in &mut self.entries {
            if !targets.contains(&entry.field_name) {
                continue;
            }
            if let Some(widget) = entry.widget.as_range_histogram_mut() {
                let values: Vec<f64> = set
                    .features
                    .iter()
                    .filter_map(|f| f.get(&entry.field_name).as_f64())
                    .collect();
                widget.rebin(&values);
            }
        }
        self.refreshes += 1;
        debug!(changed, refreshed = ?targets, "sibling histograms refreshed");
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_test::{fixture, Operation};

    #[test]
    fn test_empty_registry_is_tautology() {
        let registry = FilterRegistry::new(&Tunables::default());
        assert_eq!(registry.compose_predicate(Dialect::Server), "1=1");
        assert_eq!(registry.compose_predicate(Dialect::Client), "1=1");
    }

    #[tokio::test]
    async fn test_add_value_list_and_toggle() {
        let fixture = fixture::statuses();
        let provider = fixture.provider();
        let stats = StatsCache::new(Tunables::default());
        let services = FilterServices {
            dataset: &fixture.dataset,
            provider: &provider,
            view: None,
            stats: &stats,
        };
        let mut registry = FilterRegistry::new(&Tunables::default());
        let entry = registry.add_filter("status", services).await.unwrap();
        assert_eq!(entry.field_name, "Status");
        assert_eq!(entry.widget.kind(), WidgetKind::ValueList);
        assert!(entry.fragment.is_tautology());

        registry
            .on_widget_change("Status", &WidgetInteraction::Only { index: 1 })
            .unwrap();
        assert_eq!(
            registry.compose_predicate(Dialect::Client),
            "(Status IN ('B'))"
        );
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let fixture = fixture::ages();
        let provider = fixture.provider();
        let stats = StatsCache::new(Tunables::default());
        let services = FilterServices {
            dataset: &fixture.dataset,
            provider: &provider,
            view: None,
            stats: &stats,
        };
        let mut registry = FilterRegistry::new(&Tunables::default());
        registry.add_filter("Age", services).await.unwrap();
        let queries = provider.total_calls();
        registry.add_filter("Age", services).await.unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(provider.total_calls(), queries);
    }

    #[tokio::test]
    async fn test_stats_failure_creates_nothing() {
        let fixture = fixture::ages();
        let provider = fixture.provider().failing(Operation::UniqueValues);
        let stats = StatsCache::new(Tunables::default());
        let services = FilterServices {
            dataset: &fixture.dataset,
            provider: &provider,
            view: None,
            stats: &stats,
        };
        let mut registry = FilterRegistry::new(&Tunables::default());
        assert!(matches!(
            registry.add_filter("Age", services).await,
            Err(Error::StatsUnavailable { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_filter() {
        let mut registry = FilterRegistry::new(&Tunables::default());
        assert!(matches!(
            registry.remove_filter("Age"),
            Err(Error::FilterNotFound(_))
        ));
        assert!(registry
            .on_widget_change("Age", &WidgetInteraction::Clear)
            .is_err());
    }
}
