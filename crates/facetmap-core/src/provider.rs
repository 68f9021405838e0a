//! Contracts for the external collaborators: feature service, dataset
//! loader, map view and theme detection.

use crate::error::{Error, QueryError};
use crate::histogram::Histogram;
use crate::model::{Dataset, Extent, Feature, ValueCount};
use crate::symbology::StyleDecision;
use crate::theme::BgTheme;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hosting environment of the dataset catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Production
    #[default]
    Prod,
    /// Quality assurance
    Qa,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "prod" | "production" => Ok(Self::Prod),
            "qa" => Ok(Self::Qa),
            other => Err(format!("unknown environment '{other}' (expected qa or prod)")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prod => "prod",
            Self::Qa => "qa",
        })
    }
}

/// Feature query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FeatureQuery {
    /// Where clause, server dialect
    pub where_clause: String,
    /// Returned attributes; empty means all
    pub out_fields: Vec<String>,
    /// Sort fields
    pub order_by: Vec<String>,
    /// Return distinct rows only
    pub distinct: bool,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl FeatureQuery {
    /// Query all attributes of matching features.
    #[must_use]
    pub fn new(where_clause: impl Into<String>) -> Self {
        Self {
            where_clause: where_clause.into(),
            ..Self::default()
        }
    }

    /// Restrict the returned attributes.
    #[must_use]
    pub fn out_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.out_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sort by a field.
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by.push(field.into());
        self
    }

    /// Distinct rows only.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Cap the number of rows.
    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Features returned by a query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSet {
    /// Returned features
    pub features: Vec<Feature>,
    /// The service truncated the result
    pub exceeded_transfer_limit: bool,
}

/// Extent of the features matching a where clause.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtentResult {
    /// Bounding box, absent when nothing matches
    pub extent: Option<Extent>,
    /// Number of matching features
    pub count: u64,
}

/// Server-side histogram request.
#[derive(Debug, Clone, Copy)]
pub struct HistogramRequest<'a> {
    /// Field to bin
    pub field: &'a str,
    /// Where clause, server dialect
    pub where_clause: &'a str,
    /// Requested bin count
    pub num_bins: usize,
    /// Field values must be cast to numbers first
    pub numeric_cast: bool,
    /// Bin these features instead of querying
    pub features: Option<&'a [Feature]>,
}

/// Remote feature service.
#[async_trait]
pub trait QueryProvider: Send + Sync {
    /// Query features.
    async fn query_features(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError>;

    /// Count features matching a where clause.
    async fn query_feature_count(&self, where_clause: &str) -> Result<u64, QueryError>;

    /// Extent and count of features matching a where clause.
    async fn query_extent(&self, where_clause: &str) -> Result<ExtentResult, QueryError>;

    /// Server-side binning. Providers without support return
    /// [`QueryError::Unsupported`].
    async fn compute_histogram(
        &self,
        request: &HistogramRequest<'_>,
    ) -> Result<Histogram, QueryError>;

    /// Distinct values with counts, in service order.
    async fn compute_unique_values(&self, field: &str) -> Result<Vec<ValueCount>, QueryError>;
}

/// Resolves dataset metadata.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Load by item id.
    async fn fetch_by_id(&self, id: &str, env: Environment) -> Result<Dataset, Error>;

    /// Load by catalog slug.
    async fn fetch_by_slug(&self, slug: &str, env: Environment) -> Result<Dataset, Error>;
}

/// De-emphasis applied to features excluded by the filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureEffect {
    /// Included features, client dialect
    pub where_clause: String,
    /// Effect for excluded features
    pub excluded_effect: String,
}

/// The map view.
#[async_trait]
pub trait ViewProvider: Send + Sync {
    /// Replace the layer style.
    async fn set_style(&self, style: &StyleDecision) -> Result<(), QueryError>;

    /// Replace the feature effect.
    async fn set_effect(&self, effect: &FeatureEffect) -> Result<(), QueryError>;

    /// Features currently loaded in the view that match a client-dialect clause.
    async fn loaded_features(
        &self,
        where_clause: &str,
        out_fields: &[String],
    ) -> Result<Vec<Feature>, QueryError>;

    /// Current visible extent.
    fn extent(&self) -> Extent;

    /// Navigate to an extent.
    async fn go_to(&self, extent: Extent) -> Result<(), QueryError>;
}

/// Classifies the basemap as light or dark.
#[async_trait]
pub trait ThemeDetector: Send + Sync {
    /// Detect the theme.
    async fn detect(&self) -> Result<BgTheme, Error>;
}

/// Fixed theme, for contexts without a basemap.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticTheme(pub BgTheme);

#[async_trait]
impl ThemeDetector for StaticTheme {
    async fn detect(&self) -> Result<BgTheme, Error> {
        Ok(self.0)
    }
}
