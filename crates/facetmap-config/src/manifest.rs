//! Configuration file types.

use facetmap_core::Environment;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Classification and histogram tunables
    #[serde(default)]
    pub tunables: Tunables,
    /// Hub endpoints per environment
    #[serde(default)]
    pub environments: Environments,
    /// Datasets offered by the catalog
    #[serde(default = "default_datasets")]
    pub datasets: Vec<CatalogEntry>,
    /// View behavior
    #[serde(default)]
    pub view: ViewConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tunables: Tunables::default(),
            environments: Environments::default(),
            datasets: default_datasets(),
            view: ViewConfig::default(),
        }
    }
}

/// Widget used for date fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateWidget {
    /// Range histogram with date labels
    #[default]
    Histogram,
    /// Time window with playback
    TimeWindow,
}

/// Numeric knobs of classification, statistics and throttling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Unique-value ceiling for a categorical field
    #[serde(default = "default_categorical_max")]
    pub categorical_max: usize,
    /// Share of records the leading values must cover for pseudo-categorical
    #[serde(default = "default_pseudo_categorical_coverage")]
    pub pseudo_categorical_coverage: f64,
    /// Maximum number of top values
    #[serde(default = "default_top_values_max")]
    pub top_values_max: usize,
    /// Minimum share for a value to be listed among the top values
    #[serde(default = "default_top_values_min_pct")]
    pub top_values_min_pct: f64,
    /// Histogram bin count
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
    /// Size of the sample rebuilt from unique values
    #[serde(default = "default_synthetic_sample_size")]
    pub synthetic_sample_size: usize,
    /// Filter recomposition throttle window
    #[serde(default = "default_throttle_ms")]
    pub filter_throttle_ms: u64,
    /// Sibling widget refresh throttle window
    #[serde(default = "default_throttle_ms")]
    pub refresh_throttle_ms: u64,
    /// Widget used for date fields
    #[serde(default)]
    pub date_widget: DateWidget,
    /// Maximum number of value search candidates
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            categorical_max: default_categorical_max(),
            pseudo_categorical_coverage: default_pseudo_categorical_coverage(),
            top_values_max: default_top_values_max(),
            top_values_min_pct: default_top_values_min_pct(),
            histogram_bins: default_histogram_bins(),
            synthetic_sample_size: default_synthetic_sample_size(),
            filter_throttle_ms: default_throttle_ms(),
            refresh_throttle_ms: default_throttle_ms(),
            date_widget: DateWidget::default(),
            search_limit: default_search_limit(),
        }
    }
}

impl Tunables {
    /// Filter recomposition window.
    #[must_use]
    pub const fn filter_throttle(&self) -> Duration {
        Duration::from_millis(self.filter_throttle_ms)
    }

    /// Refresh window.
    #[must_use]
    pub const fn refresh_throttle(&self) -> Duration {
        Duration::from_millis(self.refresh_throttle_ms)
    }
}

const fn default_categorical_max() -> usize {
    10
}

const fn default_pseudo_categorical_coverage() -> f64 {
    0.8
}

const fn default_top_values_max() -> usize {
    12
}

const fn default_top_values_min_pct() -> f64 {
    0.015
}

const fn default_histogram_bins() -> usize {
    30
}

const fn default_synthetic_sample_size() -> usize {
    1000
}

const fn default_throttle_ms() -> u64 {
    100
}

const fn default_search_limit() -> usize {
    10
}

/// Hub endpoint of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Base URL of the hub API
    pub hub_url: String,
}

/// Hub endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environments {
    /// Production
    #[serde(default = "default_prod")]
    pub prod: EnvironmentConfig,
    /// Quality assurance
    #[serde(default = "default_qa")]
    pub qa: EnvironmentConfig,
}

impl Default for Environments {
    fn default() -> Self {
        Self {
            prod: default_prod(),
            qa: default_qa(),
        }
    }
}

impl Environments {
    /// Hub base URL for an environment.
    #[must_use]
    pub fn hub_url(&self, env: Environment) -> &str {
        match env {
            Environment::Prod => &self.prod.hub_url,
            Environment::Qa => &self.qa.hub_url,
        }
    }
}

fn default_prod() -> EnvironmentConfig {
    EnvironmentConfig {
        hub_url: "https://opendata.arcgis.com".to_string(),
    }
}

fn default_qa() -> EnvironmentConfig {
    EnvironmentConfig {
        hub_url: "https://opendataqa.arcgis.com".to_string(),
    }
}

/// A dataset offered by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Display name
    pub name: String,
    /// Hub item id
    pub id: String,
}

impl CatalogEntry {
    fn new(name: &str, id: &str) -> Self {
        Self {
            name: name.to_string(),
            id: id.to_string(),
        }
    }
}

fn default_datasets() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry::new("Tucson Demographics", "35fda63efad14a7b8c2a0a68d77020b7_0"),
        CatalogEntry::new("Citclops Water", "8581a7460e144ae09ad25d47f8e82af8_0"),
        CatalogEntry::new("Seattle Bike Facilities", "f4f509fa13504fb7957cef168fad74f0_1"),
        CatalogEntry::new("NYC bags", "7264acdf886941199f7c01648ba04e6b_0"),
        CatalogEntry::new("Black Rat Range", "28b0a8a0727d4cc5a2b9703cf6ca4425_0"),
    ]
}

/// Map view behavior after filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Navigate to the filtered features
    #[serde(default = "default_true")]
    pub zoom_to_data: bool,
    /// Factor applied to the filtered extent before navigating
    #[serde(default = "default_extent_padding")]
    pub extent_padding: f64,
    /// Navigate when the filtered extent fills less than this share of the view
    #[serde(default = "default_min_fill_ratio")]
    pub min_fill_ratio: f64,
    /// Effect applied to excluded features
    #[serde(default = "default_excluded_effect")]
    pub excluded_effect: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            zoom_to_data: true,
            extent_padding: default_extent_padding(),
            min_fill_ratio: default_min_fill_ratio(),
            excluded_effect: default_excluded_effect(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_extent_padding() -> f64 {
    1.10
}

const fn default_min_fill_ratio() -> f64 {
    0.30
}

fn default_excluded_effect() -> String {
    "grayscale(100%) contrast(50%) brightness(200%) opacity(50%)".to_string()
}
