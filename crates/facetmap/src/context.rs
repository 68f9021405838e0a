//! The application context: one dataset, its filters and its style.

use crate::classify::FieldClassifier;
use crate::filters::{ChangeOutcome, FilterEntry, FilterRegistry, FilterServices};
use crate::histogram::{BuiltHistogram, HistogramBuilder, HistogramJob};
use crate::http::FeatureServiceProvider;
use crate::stats::{FieldStatistics, StatsCache};
use crate::style::{detect_theme, StyleSelector};
use crate::view::ViewEffectController;
use facetmap_config::Config;
use facetmap_core::{
    BgTheme, Dataset, DatasetProvider, Dialect, Environment, Error, QueryProvider, Result,
    SimpleType, StyleDecision, SymbolPalette, ThemeDetector, Value, ViewProvider,
};
use facetmap_widgets::format::field_label;
use facetmap_widgets::{Candidate, FilterWidget, ValueSearch, WidgetInteraction, WidgetKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Opens a query provider for a dataset's feature service.
pub type Connector = Box<dyn Fn(&Dataset) -> Arc<dyn QueryProvider> + Send + Sync>;

/// How to find a dataset on the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetTarget {
    /// Hub item id
    Id(String),
    /// Human readable slug
    Slug(String),
}

impl fmt::Display for DatasetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => write!(f, "slug {slug}"),
        }
    }
}

/// A row of the field picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogField {
    /// Field name
    pub name: String,
    /// Alias with range or value count
    pub label: String,
    /// Type family
    pub simple_type: SimpleType,
    /// A filter exists for the field
    pub filtered: bool,
}

struct Active {
    dataset: Dataset,
    provider: Arc<dyn QueryProvider>,
    searches: Mutex<HashMap<String, Arc<ValueSearch>>>,
}

/// Owns the loaded dataset and everything derived from it.
///
/// Mutating operations take `&mut self`, so filter state changes one at a
/// time; only value searches run through `&self` and may overlap.
pub struct AppContext {
    config: Config,
    datasets: Arc<dyn DatasetProvider>,
    theme_detector: Arc<dyn ThemeDetector>,
    view: Option<Arc<dyn ViewProvider>>,
    connect: Connector,
    active: Option<Active>,
    stats: StatsCache,
    filters: FilterRegistry,
    styles: StyleSelector,
    effects: ViewEffectController,
    style: Option<StyleDecision>,
    theme: Option<BgTheme>,
    last_count: Option<u64>,
}

impl fmt::Debug for AppContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppContext")
            .field("dataset", &self.active.as_ref().map(|a| &a.dataset.id))
            .field("filters", &self.filters.len())
            .field("theme", &self.theme)
            .field("last_count", &self.last_count)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Context without a view, querying each dataset's feature service over
    /// HTTP.
    #[must_use]
    pub fn new(
        config: Config,
        datasets: Arc<dyn DatasetProvider>,
        theme_detector: Arc<dyn ThemeDetector>,
    ) -> Self {
        Self {
            stats: StatsCache::new(config.tunables.clone()),
            filters: FilterRegistry::new(&config.tunables),
            styles: StyleSelector::new(&config.tunables),
            effects: ViewEffectController::new(&config.view),
            config,
            datasets,
            theme_detector,
            view: None,
            connect: Box::new(|dataset: &Dataset| -> Arc<dyn QueryProvider> {
                Arc::new(FeatureServiceProvider::new(&dataset.url))
            }),
            active: None,
            style: None,
            theme: None,
            last_count: None,
        }
    }

    /// Attach a map view.
    #[must_use]
    pub fn with_view(mut self, view: Arc<dyn ViewProvider>) -> Self {
        self.view = Some(view);
        self
    }

    /// Replace how query providers are opened.
    #[must_use]
    pub fn with_connector(mut self, connect: Connector) -> Self {
        self.connect = connect;
        self
    }

    /// Active configuration.
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Loaded dataset.
    pub fn dataset(&self) -> Option<&Dataset> {
        self.active.as_ref().map(|a| &a.dataset)
    }

    /// Statistics cache of the loaded dataset.
    pub const fn stats(&self) -> &StatsCache {
        &self.stats
    }

    /// Active filters.
    pub const fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Current style.
    pub const fn style(&self) -> Option<&StyleDecision> {
        self.style.as_ref()
    }

    /// Detected basemap theme; light until detection has run.
    pub fn theme(&self) -> BgTheme {
        self.theme.unwrap_or_default()
    }

    /// Feature count after the last filter change, when known.
    pub const fn last_count(&self) -> Option<u64> {
        self.last_count
    }

    fn active(&self) -> Result<&Active> {
        self.active.as_ref().ok_or(Error::NoDataset)
    }

    async fn ensure_theme(&mut self) -> BgTheme {
        if let Some(theme) = self.theme {
            return theme;
        }
        let theme = detect_theme(self.theme_detector.as_ref()).await;
        self.theme = Some(theme);
        theme
    }

    /// Fetch a dataset and make it current.
    ///
    /// On failure the previous dataset, filters and style stay in place.
    pub async fn load_dataset(&mut self, target: &DatasetTarget, env: Environment) -> Result<&Dataset> {
        let dataset = match target {
            DatasetTarget::Id(id) => self.datasets.fetch_by_id(id, env).await?,
            DatasetTarget::Slug(slug) => self.datasets.fetch_by_slug(slug, env).await?,
        };
        self.set_dataset(dataset).await?;
        self.active().map(|a| &a.dataset)
    }

    /// Make `dataset` current: statistics are invalidated, filters dropped
    /// and the layer styled by geometry.
    pub async fn set_dataset(&mut self, dataset: Dataset) -> Result<&StyleDecision> {
        let generation = self.stats.invalidate();
        self.filters.clear();
        let theme = self.ensure_theme().await;
        let provider = (self.connect)(&dataset);
        info!(
            id = %dataset.id,
            fields = dataset.fields.len(),
            records = dataset.record_count,
            generation,
            "dataset set"
        );

        let style = self
            .styles
            .by_geometry(&dataset, &SymbolPalette::for_theme(theme));
        self.last_count = Some(dataset.record_count);
        self.active = Some(Active {
            dataset,
            provider,
            searches: Mutex::new(HashMap::new()),
        });
        self.publish_style(style).await
    }

    async fn publish_style(&mut self, style: StyleDecision) -> Result<&StyleDecision> {
        if let Some(view) = &self.view {
            view.set_style(&style).await?;
        }
        Ok(&*self.style.insert(style))
    }

    /// Restyle by `field`, or by geometry when `None`.
    pub async fn style_by(&mut self, field: Option<&str>) -> Result<&StyleDecision> {
        let theme = self.ensure_theme().await;
        let active = self.active()?;
        let style = self
            .styles
            .choose_style(
                &active.dataset,
                field,
                theme,
                &self.stats,
                active.provider.as_ref(),
            )
            .await?;
        self.publish_style(style).await
    }

    /// Create a filter for `field` and apply it to the view.
    ///
    /// An existing filter for the field is returned unchanged.
    pub async fn add_filter(&mut self, field: &str) -> Result<&FilterEntry> {
        let active = self.active.as_ref().ok_or(Error::NoDataset)?;
        let existed = active
            .dataset
            .field(field)
            .map(|f| self.filters.get(&f.name).is_some())?;
        let services = FilterServices {
            dataset: &active.dataset,
            provider: active.provider.as_ref(),
            view: self.view.as_deref(),
            stats: &self.stats,
        };
        let name = self.filters.add_filter(field, services).await?.field_name.clone();
        if !existed {
            self.apply_filters().await?;
        }
        self.filters
            .get(&name)
            .ok_or_else(|| Error::FilterNotFound(name.clone()))
    }

    /// Feed a widget interaction to the filter on `field`.
    ///
    /// When the change is recomposed, sibling histograms are re-binned and
    /// the view updated; throttled changes only update the widget.
    pub async fn interact(
        &mut self,
        field: &str,
        interaction: &WidgetInteraction,
    ) -> Result<ChangeOutcome> {
        let provider = Arc::clone(&self.active()?.provider);
        let outcome = self.filters.on_widget_change(field, interaction)?;
        if outcome == ChangeOutcome::Recomposed {
            self.refresh_siblings(field, provider.as_ref(), interaction.bypasses_throttle())
                .await;
            self.apply_filters().await?;
        }
        Ok(outcome)
    }

    /// Commit the current drag position of a range or time window filter,
    /// bypassing both throttles.
    pub async fn release(&mut self, field: &str) -> Result<ChangeOutcome> {
        let entry = self
            .filters
            .get(field)
            .ok_or_else(|| Error::FilterNotFound(field.to_string()))?;
        let interaction = match &entry.widget {
            FilterWidget::RangeHistogram(w) => {
                let (low, high) = w.selection();
                WidgetInteraction::Range {
                    low,
                    high,
                    released: true,
                }
            }
            FilterWidget::TimeWindow(w) => {
                let (start, end) = w.window();
                WidgetInteraction::Window {
                    start,
                    end,
                    released: true,
                }
            }
            FilterWidget::ValueList(_) => {
                return Err(Error::InvalidInteraction(format!(
                    "{field} is a value list and has nothing to release"
                )))
            }
        };
        self.interact(field, &interaction).await
    }

    /// Delete the filter on `field`, refresh the remaining histograms and
    /// update the view.
    pub async fn remove_filter(&mut self, field: &str) -> Result<FilterEntry> {
        let provider = Arc::clone(&self.active()?.provider);
        let removed = self.filters.remove_filter(field)?;
        self.refresh_siblings(field, provider.as_ref(), true).await;
        self.apply_filters().await?;
        Ok(removed)
    }

    /// Remove every filter and show the whole dataset again.
    pub async fn clear_filters(&mut self) -> Result<()> {
        self.active()?;
        self.filters.clear();
        info!("filters cleared");
        self.apply_filters().await
    }

    /// Re-bin sibling histograms. A failed refresh is logged and the widgets
    /// keep their previous bins.
    async fn refresh_siblings(&mut self, changed: &str, provider: &dyn QueryProvider, force: bool) {
        if let Err(e) = self
            .filters
            .refresh_other_widgets(changed, provider, force)
            .await
        {
            warn!(changed, error = %e, "histogram refresh failed");
        }
    }

    async fn apply_filters(&mut self) -> Result<()> {
        let active = self.active()?;
        let filters = self.filters.where_clause();
        let count = match &self.view {
            Some(view) => {
                self.effects
                    .apply(
                        &filters,
                        active.provider.as_ref(),
                        view.as_ref(),
                        self.config.view.zoom_to_data,
                    )
                    .await?
                    .count
            }
            None => active
                .provider
                .query_feature_count(&filters.render(Dialect::Server))
                .await
                .ok(),
        };
        if count.is_some() {
            self.last_count = count;
        }
        debug!(count = ?self.last_count, "filters applied");
        Ok(())
    }

    /// Search values of `field` containing `query`, skipping values already
    /// checked in its value list. A newer search on the same field supersedes this
    /// one.
    pub async fn search_values(&self, field: &str, query: &str) -> Result<Vec<Candidate>> {
        let active = self.active()?;
        let field = active.dataset.field(field)?;
        let search = {
            let mut searches = active
                .searches
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(searches.entry(field.name.clone()).or_insert_with(|| {
                Arc::new(ValueSearch::new(
                    &field.name,
                    field.simple_type == SimpleType::Date,
                    self.config.tunables.search_limit,
                ))
            }))
        };
        let checked: Vec<Value> = match self.filters.get(&field.name).map(|e| &e.widget) {
            Some(FilterWidget::ValueList(list)) => list.checked_values().cloned().collect(),
            _ => Vec::new(),
        };
        search.search(active.provider.as_ref(), query, &checked).await
    }

    /// Unique value statistics of `field`.
    pub async fn field_stats(&self, field: &str) -> Result<Arc<FieldStatistics>> {
        let active = self.active()?;
        self.stats
            .get_unique_value_stats(&active.dataset, field, active.provider.as_ref())
            .await
    }

    /// Histogram of `field` under every active filter but its own.
    pub async fn histogram(&self, field: &str) -> Result<BuiltHistogram> {
        let active = self.active()?;
        let field = active.dataset.field(field)?;
        let stats = self.field_stats(&field.name).await?;
        let class = FieldClassifier::new(&self.config.tunables).classify(field, &stats);
        let filter = self.filters.where_clause_excluding(&[field.name.as_str()]);
        let job = HistogramJob {
            dataset: &active.dataset,
            field,
            numeric_cast: class.needs_cast(field),
            filter: &filter,
            features: None,
            stats: Some(stats.as_ref()),
        };
        HistogramBuilder::new(active.provider.as_ref(), &self.config.tunables)
            .with_view(self.view.as_deref())
            .build(&job)
            .await
    }

    /// Fields offered for filtering and styling, sorted by label.
    pub fn field_catalog(&self) -> Result<Vec<CatalogField>> {
        let active = self.active()?;
        let mut fields: Vec<CatalogField> = active
            .dataset
            .catalog_fields()
            .map(|f| CatalogField {
                name: f.name.clone(),
                label: field_label(f),
                simple_type: f.simple_type,
                filtered: self.filters.get(&f.name).is_some(),
            })
            .collect();
        fields.sort_by_key(|f| f.label.to_lowercase());
        Ok(fields)
    }

    /// Composed predicate of every active filter.
    pub fn compose(&self, dialect: Dialect) -> String {
        self.filters.compose_predicate(dialect)
    }

    /// Kind of the widget filtering `field`.
    pub fn widget_kind(&self, field: &str) -> Option<WidgetKind> {
        self.filters.get(field).map(|e| e.widget.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_test::{
        fixture, MockDatasetProvider, MockQueryProvider, MockThemeDetector, MockView, Operation,
    };

    fn context(
        fixture: &fixture::Fixture,
        provider: &Arc<MockQueryProvider>,
    ) -> (AppContext, Arc<MockView>) {
        let view = Arc::new(fixture.view());
        let datasets =
            MockDatasetProvider::new().with_dataset(fixture.dataset.clone(), Some("the-slug"));
        let shared = Arc::clone(provider);
        let ctx = AppContext::new(
            Config::default(),
            Arc::new(datasets),
            Arc::new(MockThemeDetector::returning(BgTheme::Dark)),
        )
        .with_view(Arc::clone(&view) as Arc<dyn ViewProvider>)
        .with_connector(Box::new(move |_: &Dataset| -> Arc<dyn QueryProvider> {
            Arc::clone(&shared) as Arc<dyn QueryProvider>
        }));
        (ctx, view)
    }

    #[tokio::test]
    async fn test_operations_need_a_dataset() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        assert!(matches!(ctx.add_filter("Age").await, Err(Error::NoDataset)));
        assert!(matches!(ctx.field_catalog(), Err(Error::NoDataset)));
        assert_eq!(ctx.compose(Dialect::Server), "1=1");
    }

    #[tokio::test]
    async fn test_load_by_slug_styles_by_geometry() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, view) = context(&fixture, &provider);
        let target = DatasetTarget::Slug("the-slug".to_string());
        let dataset = ctx.load_dataset(&target, Environment::Prod).await.unwrap();
        assert_eq!(dataset.id, fixture.dataset.id);
        assert_eq!(ctx.theme(), BgTheme::Dark);
        assert_eq!(view.styles().len(), 1);
        assert_eq!(ctx.last_count(), Some(1000));
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_dataset() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Age").await.unwrap();

        let missing = DatasetTarget::Id("missing".to_string());
        let err = ctx.load_dataset(&missing, Environment::Qa).await.unwrap_err();
        assert!(matches!(err, Error::DatasetLoadFailed { .. }));
        assert_eq!(ctx.dataset().unwrap().id, fixture.dataset.id);
        assert_eq!(ctx.filters().len(), 1);
    }

    #[tokio::test]
    async fn test_switch_clears_filters_and_stats() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Age").await.unwrap();
        assert!(!ctx.stats().is_empty());
        let generation = ctx.stats().generation();

        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        assert!(ctx.filters().is_empty());
        assert!(ctx.stats().is_empty());
        assert!(ctx.stats().generation() > generation);
    }

    #[tokio::test]
    async fn test_add_filter_applies_effect() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, view) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        let entry = ctx.add_filter("age").await.unwrap();
        assert_eq!(entry.field_name, "Age");
        assert_eq!(ctx.widget_kind("Age"), Some(WidgetKind::RangeHistogram));
        assert_eq!(view.effects().len(), 1);

        ctx.add_filter("Age").await.unwrap();
        assert_eq!(view.effects().len(), 1);
    }

    #[tokio::test]
    async fn test_release_commits_and_counts() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Age").await.unwrap();

        let drag = WidgetInteraction::Range {
            low: 10.0,
            high: 19.0,
            released: false,
        };
        ctx.interact("Age", &drag).await.unwrap();
        let outcome = ctx.release("Age").await.unwrap();
        assert_eq!(outcome, ChangeOutcome::Recomposed);
        assert_eq!(ctx.last_count(), Some(100));
        assert!(ctx.compose(Dialect::Client).contains("Age"));
    }

    #[tokio::test]
    async fn test_remove_filter_restores_everything() {
        let fixture = fixture::statuses();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Status").await.unwrap();
        ctx.interact("Status", &WidgetInteraction::Only { index: 0 })
            .await
            .unwrap();
        assert_eq!(ctx.last_count(), Some(50));

        ctx.remove_filter("Status").await.unwrap();
        assert_eq!(ctx.compose(Dialect::Server), "1=1");
        assert_eq!(ctx.last_count(), Some(100));
    }

    #[tokio::test]
    async fn test_release_rejects_value_list() {
        let fixture = fixture::statuses();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Status").await.unwrap();
        assert!(matches!(
            ctx.release("Status").await,
            Err(Error::InvalidInteraction(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_still_updates_view() {
        let fixture = fixture::survey();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, view) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Score").await.unwrap();
        ctx.add_filter("Age").await.unwrap();
        let effects = view.effects().len();
        assert_eq!(ctx.last_count(), Some(200));

        provider.set_failing(Operation::QueryFeatures, true);
        let drag = WidgetInteraction::Range {
            low: 5.0,
            high: 10.0,
            released: true,
        };
        let outcome = ctx.interact("Score", &drag).await.unwrap();
        assert_eq!(outcome, ChangeOutcome::Recomposed);
        assert_eq!(view.effects().len(), effects + 1);
        assert!(view.effects().last().unwrap().where_clause.contains("Score"));
        let expected = provider
            .query_feature_count(&ctx.compose(Dialect::Server))
            .await
            .unwrap();
        assert!(expected < 200);
        assert_eq!(ctx.last_count(), Some(expected));

        ctx.remove_filter("Score").await.unwrap();
        assert_eq!(ctx.filters().len(), 1);
        assert_eq!(view.effects().len(), effects + 2);
        assert!(!view.effects().last().unwrap().where_clause.contains("Score"));
        assert_eq!(ctx.last_count(), Some(200));
    }

    #[tokio::test]
    async fn test_clear_filters_shows_everything() {
        let fixture = fixture::statuses();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, view) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Status").await.unwrap();
        ctx.interact("Status", &WidgetInteraction::Only { index: 0 })
            .await
            .unwrap();
        assert_eq!(ctx.last_count(), Some(50));

        ctx.clear_filters().await.unwrap();
        assert!(ctx.filters().is_empty());
        assert_eq!(ctx.compose(Dialect::Server), "1=1");
        assert_eq!(view.effects().last().unwrap().where_clause, "1=1");
        assert_eq!(ctx.last_count(), Some(100));
    }

    #[tokio::test]
    async fn test_clear_filters_needs_a_dataset() {
        let fixture = fixture::statuses();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        assert!(matches!(ctx.clear_filters().await, Err(Error::NoDataset)));
    }

    #[tokio::test]
    async fn test_style_by_field_and_back() {
        let fixture = fixture::statuses();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, view) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        let style = ctx.style_by(Some("Status")).await.unwrap();
        assert_eq!(style.legend.as_ref().unwrap().items.len(), 3);
        ctx.style_by(None).await.unwrap();
        assert!(ctx.style().unwrap().legend.is_none());
        assert_eq!(view.styles().len(), 3);
    }

    #[tokio::test]
    async fn test_search_skips_checked_values_only() {
        let fixture = fixture::regions();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        let entry = ctx.add_filter("Region").await.unwrap();
        let FilterWidget::ValueList(list) = &entry.widget else {
            panic!("expected a value list");
        };
        let index = list
            .items()
            .iter()
            .position(|item| item.value == Value::text("R000"))
            .unwrap();
        assert!(list.items().iter().any(|item| item.value == Value::text("R001")));
        let toggle = WidgetInteraction::Toggle {
            index,
            checked: true,
        };
        ctx.interact("Region", &toggle).await.unwrap();

        let candidates = ctx.search_values("Region", "r00").await.unwrap();
        assert!(candidates.iter().all(|c| c.label.starts_with("R00")));
        assert!(candidates.iter().all(|c| c.value != Value::text("R000")));
        // listed but unchecked stays searchable
        assert!(candidates.iter().any(|c| c.value == Value::text("R001")));
        assert!(provider.calls(Operation::QueryFeatures) >= 1);
    }

    #[tokio::test]
    async fn test_histogram_ignores_own_filter() {
        let fixture = fixture::ages();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Age").await.unwrap();
        let drag = WidgetInteraction::Range {
            low: 0.0,
            high: 9.0,
            released: true,
        };
        ctx.interact("Age", &drag).await.unwrap();

        let built = ctx.histogram("Age").await.unwrap();
        assert_eq!(built.histogram.total_count(), 1000);
        assert_eq!(provider.where_log().last().map(String::as_str), Some("1=1"));
    }

    #[tokio::test]
    async fn test_field_catalog_marks_filters() {
        let fixture = fixture::survey();
        let provider = Arc::new(fixture.provider());
        let (mut ctx, _) = context(&fixture, &provider);
        ctx.set_dataset(fixture.dataset.clone()).await.unwrap();
        ctx.add_filter("Status").await.unwrap();
        let catalog = ctx.field_catalog().unwrap();
        let status = catalog.iter().find(|f| f.name == "Status").unwrap();
        assert!(status.filtered);
        assert!(catalog.iter().any(|f| f.label.starts_with("Age (years)")));
    }
}
