//! Exploratory filtering of map datasets.
//!
//! Given a dataset, facetmap decides which widget suits each field, builds
//! histograms even when the feature service cannot, composes the filters into
//! one predicate and picks a symbology from field statistics and the basemap
//! theme.
//!
//! ```no_run
//! use facetmap::{AppContext, DatasetTarget, HubDatasetProvider};
//! use facetmap_config::Config;
//! use facetmap_core::{BgTheme, Dialect, Environment, StaticTheme};
//! use std::sync::Arc;
//!
//! # async fn run() -> facetmap_core::Result<()> {
//! let config = Config::default();
//! let hub = HubDatasetProvider::new(config.environments.clone());
//! let mut ctx = AppContext::new(config, Arc::new(hub), Arc::new(StaticTheme(BgTheme::Light)));
//! let target = DatasetTarget::Id("35fda63efad14a7b8c2a0a68d77020b7_0".into());
//! ctx.load_dataset(&target, Environment::Prod).await?;
//! ctx.add_filter("POP").await?;
//! println!("{}", ctx.compose(Dialect::Server));
//! # Ok(())
//! # }
//! ```

mod classify;
mod context;
mod filters;
mod histogram;
mod http;
mod stats;
mod style;
mod view;

pub use classify::{Classification, FieldClassifier};
pub use context::{AppContext, CatalogField, Connector, DatasetTarget};
pub use filters::{ChangeOutcome, FilterEntry, FilterRegistry, FilterServices};
pub use histogram::{synthetic_sample, BuiltHistogram, HistogramBuilder, HistogramJob};
pub use http::{FeatureServiceProvider, HubDatasetProvider};
pub use stats::{FieldStatistics, StatsCache, ValueStat};
pub use style::{detect_theme, StyleSelector};
pub use view::{ViewEffectController, ViewUpdate};
