//! Configuration for facetmap.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. Files are read as YAML or TOML by extension.
//!
//! ```yaml
//! tunables:
//!   categorical_max: 8
//!   date_widget: time_window
//! view:
//!   zoom_to_data: false
//! ```

mod error;
mod manifest;

pub use error::ConfigError;
pub use manifest::{
    CatalogEntry, Config, DateWidget, EnvironmentConfig, Environments, Tunables, ViewConfig,
};

use std::path::Path;

impl Config {
    /// Parse YAML text and validate it.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML text and validate it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`, `.yml` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let text = std::fs::read_to_string(path)?;
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&text),
            "toml" => Self::from_toml_str(&text),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tunables;
        if t.categorical_max == 0 {
            return Err(ConfigError::invalid("tunables.categorical_max", "must be at least 1"));
        }
        if !(t.pseudo_categorical_coverage > 0.0 && t.pseudo_categorical_coverage <= 1.0) {
            return Err(ConfigError::invalid(
                "tunables.pseudo_categorical_coverage",
                "must be in (0, 1]",
            ));
        }
        if t.top_values_max == 0 {
            return Err(ConfigError::invalid("tunables.top_values_max", "must be at least 1"));
        }
        if !(t.top_values_min_pct > 0.0 && t.top_values_min_pct <= 1.0) {
            return Err(ConfigError::invalid(
                "tunables.top_values_min_pct",
                "must be in (0, 1]",
            ));
        }
        if t.histogram_bins == 0 {
            return Err(ConfigError::invalid("tunables.histogram_bins", "must be positive"));
        }
        if t.synthetic_sample_size == 0 {
            return Err(ConfigError::invalid(
                "tunables.synthetic_sample_size",
                "must be positive",
            ));
        }
        if t.search_limit == 0 {
            return Err(ConfigError::invalid("tunables.search_limit", "must be positive"));
        }
        if self.view.extent_padding.is_nan() || self.view.extent_padding < 1.0 {
            return Err(ConfigError::invalid("view.extent_padding", "must be at least 1"));
        }
        if !(self.view.min_fill_ratio > 0.0 && self.view.min_fill_ratio <= 1.0) {
            return Err(ConfigError::invalid("view.min_fill_ratio", "must be in (0, 1]"));
        }
        for env in [&self.environments.prod, &self.environments.qa] {
            if env.hub_url.trim().is_empty() {
                return Err(ConfigError::invalid("environments.hub_url", "must not be empty"));
            }
        }
        Ok(())
    }

    /// Catalog entry by name, ignoring case.
    #[must_use]
    pub fn catalog_entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.datasets
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}
