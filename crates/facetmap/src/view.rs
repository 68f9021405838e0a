//! Pushes the composed predicate to the view: feature effect, count and
//! viewport.

use facetmap_config::ViewConfig;
use facetmap_core::{
    Dialect, Error, Extent, ExtentResult, FeatureEffect, QueryProvider, Result,
    ViewProvider, WhereClause,
};
use tracing::{debug, warn};

/// Result of one [`ViewEffectController::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewUpdate {
    /// Matching features, when the count query succeeded
    pub count: Option<u64>,
    /// Padded extent of the matching features
    pub extent: Option<Extent>,
    /// The view was moved
    pub navigated: bool,
}

/// Applies filters to the view.
#[derive(Debug, Clone)]
pub struct ViewEffectController {
    config: ViewConfig,
}

impl ViewEffectController {
    /// Controller with the configured padding and fill threshold.
    #[must_use]
    pub fn new(config: &ViewConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// De-emphasize excluded features, then count the matches and, when
    /// `zoom_to_data` is set, fit the viewport to them. Count and extent are
    /// queried concurrently; failures of either only cost their result.
    pub async fn apply(
        &self,
        filters: &WhereClause,
        provider: &dyn QueryProvider,
        view: &dyn ViewProvider,
        zoom_to_data: bool,
    ) -> Result<ViewUpdate> {
        let effect = FeatureEffect {
            where_clause: filters.render(Dialect::Client),
            excluded_effect: self.config.excluded_effect.clone(),
        };
        view.set_effect(&effect).await?;

        let server = filters.render(Dialect::Server);
        let (count, extent) = tokio::join!(provider.query_feature_count(&server), async {
            if zoom_to_data {
                Some(provider.query_extent(&server).await)
            } else {
                None
            }
        });

        let count = match count {
            Ok(count) => Some(count),
            Err(error) => {
                warn!(%error, "feature count failed");
                None
            }
        };

        let mut update = ViewUpdate {
            count,
            ..ViewUpdate::default()
        };
        match extent {
            None => {}
            Some(Err(error)) => {
                warn!(error = %Error::ExtentQueryFailed(error), "viewport left unchanged");
            }
            Some(Ok(result)) => {
                if let Some(target) = self.target_extent(&result) {
                    update.extent = Some(target);
                    update.navigated = self.navigate(view, target).await;
                }
            }
        }
        Ok(update)
    }

    fn target_extent(&self, result: &ExtentResult) -> Option<Extent> {
        if result.count == 0 {
            return None;
        }
        result.extent.map(|e| e.expand(self.config.extent_padding))
    }

    async fn navigate(&self, view: &dyn ViewProvider, target: Extent) -> bool {
        let current = view.extent();
        let fill = if current.area() > 0.0 {
            target.area() / current.area()
        } else {
            0.0
        };
        if current.contains(&target) && fill >= self.config.min_fill_ratio {
            return false;
        }
        match view.go_to(target).await {
            Ok(()) => {
                debug!(?target, fill, "viewport fitted to data");
                true
            }
            Err(error) => {
                warn!(%error, "navigation failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_core::Expr;
    use facetmap_test::{fixture, Operation};

    fn controller() -> ViewEffectController {
        ViewEffectController::new(&ViewConfig::default())
    }

    #[tokio::test]
    async fn test_effect_count_and_zoom_in() {
        let fixture = fixture::ages();
        let provider = fixture.provider();
        let view = fixture.view();
        let filters = WhereClause::all().with(Expr::col("x").lte(Expr::num(9.0)), None);

        let update = controller()
            .apply(&filters, &provider, &view, true)
            .await
            .unwrap();
        assert_eq!(update.count, Some(100));
        assert!(update.navigated);
        assert_eq!(view.navigations().len(), 1);
        assert_eq!(view.effects()[0].where_clause, "(x <= 9)");
        assert!(view.effects()[0].excluded_effect.starts_with("grayscale"));
    }

    #[tokio::test]
    async fn test_no_zoom_when_view_already_fits() {
        let fixture = fixture::ages();
        let provider = fixture.provider();
        let view = facetmap_test::MockView::new(
            fixture.features.clone(),
            Extent::new(-10.0, -5.0, 110.0, 15.0),
        );
        let update = controller()
            .apply(&WhereClause::all(), &provider, &view, true)
            .await
            .unwrap();
        assert!(!update.navigated);
        assert!(update.extent.is_some());
    }

    #[tokio::test]
    async fn test_extent_failure_is_swallowed() {
        let fixture = fixture::ages();
        let provider = fixture.provider().failing(Operation::Extent);
        let view = fixture.view();
        let update = controller()
            .apply(&WhereClause::all(), &provider, &view, true)
            .await
            .unwrap();
        assert_eq!(update.count, Some(1000));
        assert!(update.extent.is_none());
        assert!(view.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_count_failure_leaves_count_unknown() {
        let fixture = fixture::ages();
        let provider = fixture.provider().failing(Operation::FeatureCount);
        let view = fixture.view();
        let update = controller()
            .apply(&WhereClause::all(), &provider, &view, false)
            .await
            .unwrap();
        assert_eq!(update.count, None);
        assert_eq!(provider.calls(Operation::Extent), 0);
    }

    #[tokio::test]
    async fn test_empty_match_does_not_move() {
        let fixture = fixture::ages();
        let provider = fixture.provider();
        let view = fixture.view();
        let filters = WhereClause::all().with(Expr::col("Age").gte(Expr::num(500.0)), None);
        let update = controller()
            .apply(&filters, &provider, &view, true)
            .await
            .unwrap();
        assert_eq!(update.count, Some(0));
        assert!(!update.navigated);
    }
}
