//! Symbology chosen from field statistics and the basemap theme.

use crate::classify::{Classification, FieldClassifier};
use crate::stats::{FieldStatistics, StatsCache, ValueStat};
use facetmap_config::Tunables;
use facetmap_core::value::format_number;
use facetmap_core::{
    BgTheme, ColorRamp, ColorStop, Dataset, Field, GeometryType, LabelSpec, LegendItem,
    LegendSpec, QueryProvider, Renderer, Result, SizeStop, StyleDecision, SymbolKind,
    SymbolPalette, SymbolSpec, ThemeDetector, Value, ValueClass, VisualVariable,
};
use facetmap_widgets::format::{format_date, value_label, NO_VALUE};
use tracing::{debug, warn};

/// Marker sizes by view scale.
const POINT_SIZES: [SizeStop; 2] = [
    SizeStop {
        scale: 18_055.954_822,
        size: 6.0,
    },
    SizeStop {
        scale: 577_790.554_289,
        size: 3.0,
    },
];

/// Line widths by view scale.
const LINE_WIDTHS: [SizeStop; 3] = [
    SizeStop {
        scale: 1_155_581.108_577,
        size: 0.5,
    },
    SizeStop {
        scale: 577_790.554_289,
        size: 1.0,
    },
    SizeStop {
        scale: 144_447.638_572,
        size: 2.0,
    },
];

const OTHERS: &str = "Others";
const LABEL_HALO_SIZE: f64 = 2.0;

/// Detect the basemap theme, defaulting to light when detection fails.
pub async fn detect_theme(detector: &dyn ThemeDetector) -> BgTheme {
    match detector.detect().await {
        Ok(theme) => theme,
        Err(error) => {
            warn!(%error, "theme detection failed, using light");
            BgTheme::Light
        }
    }
}

/// Chooses renderers, legends and labels.
#[derive(Debug, Clone)]
pub struct StyleSelector {
    classifier: FieldClassifier,
    categorical: ColorRamp,
    continuous: ColorRamp,
}

impl StyleSelector {
    /// Selector with the configured thresholds.
    #[must_use]
    pub fn new(tunables: &Tunables) -> Self {
        Self {
            classifier: FieldClassifier::new(tunables),
            categorical: ColorRamp::categorical(),
            continuous: ColorRamp::sequential(),
        }
    }

    /// Style the dataset, by `field` when given, else by geometry alone.
    pub async fn choose_style(
        &self,
        dataset: &Dataset,
        field: Option<&str>,
        theme: BgTheme,
        stats: &StatsCache,
        provider: &dyn QueryProvider,
    ) -> Result<StyleDecision> {
        let palette = SymbolPalette::for_theme(theme);
        let Some(name) = field else {
            return Ok(self.by_geometry(dataset, &palette));
        };
        let field = dataset.field(name)?;
        let field_stats = stats.get_unique_value_stats(dataset, &field.name, provider).await?;
        Ok(self.by_field(dataset, field, &field_stats, &palette))
    }

    /// One color per geometry, varied slightly per feature. Polygons are
    /// labeled with the display field.
    #[must_use]
    pub fn by_geometry(&self, dataset: &Dataset, palette: &SymbolPalette) -> StyleDecision {
        let mut visual_variables = vec![VisualVariable::Color {
            field: None,
            expression: Some("random()".to_string()),
            stops: vec![
                ColorStop {
                    value: 0.0,
                    color: palette.random_low,
                    label: String::new(),
                },
                ColorStop {
                    value: 1.0,
                    color: palette.random_high,
                    label: String::new(),
                },
            ],
        }];
        visual_variables.extend(size_variable(dataset.geometry_type));

        let labels = (dataset.geometry_type == GeometryType::Polygon).then(|| {
            let field = dataset.display_field.as_deref().unwrap_or("NAME");
            label_spec(field, palette)
        });
        StyleDecision {
            renderer: Renderer::Simple {
                symbol: base_symbol(dataset.geometry_type, palette),
                visual_variables,
            },
            legend: None,
            labels,
        }
    }

    /// Style by a field's values.
    #[must_use]
    pub fn by_field(
        &self,
        dataset: &Dataset,
        field: &Field,
        stats: &FieldStatistics,
        palette: &SymbolPalette,
    ) -> StyleDecision {
        let class = self.classifier.classify(field, stats);
        if class.is_categorical || class.is_pseudo_categorical {
            debug!(field = %field.name, "categorical style");
            return self.categorical(dataset, field, stats, &class, palette);
        }
        if class.is_number_like || class.is_date {
            if let Some(style) = self.continuous(dataset, field, stats, &class, palette) {
                debug!(field = %field.name, "continuous style");
                return style;
            }
        }
        debug!(field = %field.name, "labeled style");
        StyleDecision {
            renderer: Renderer::Simple {
                symbol: base_symbol(dataset.geometry_type, palette),
                visual_variables: size_variable(dataset.geometry_type).into_iter().collect(),
            },
            legend: None,
            labels: Some(label_spec(&field.name, palette)),
        }
    }

    fn categorical(
        &self,
        dataset: &Dataset,
        field: &Field,
        stats: &FieldStatistics,
        class: &Classification,
        palette: &SymbolPalette,
    ) -> StyleDecision {
        let mut shown: Vec<&ValueStat> = stats.non_blank().collect();
        let non_blank = shown.len();
        shown.truncate(self.classifier.categorical_max());
        if class.is_categorical {
            shown.sort_by(|a, b| a.value.total_cmp(&b.value));
        }
        let has_others = non_blank > shown.len() || stats.unique_count > stats.values.len() as u64;

        let base = base_symbol(dataset.geometry_type, palette);
        let mut classes: Vec<ValueClass> = shown
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let color = self.categorical.cycled(i);
                let outline = if base.kind == SymbolKind::Marker {
                    color.scale(0.5)
                } else {
                    base.outline
                };
                ValueClass {
                    value: v.value.clone(),
                    label: value_label(&v.value, class.is_date),
                    symbol: SymbolSpec::new(base.kind, color, outline, base.size),
                }
            })
            .collect();
        let mut legend: Vec<LegendItem> = classes
            .iter()
            .map(|c| LegendItem {
                label: c.label.clone(),
                color: c.symbol.color,
            })
            .collect();

        let default_symbol = has_others.then(|| {
            legend.push(LegendItem {
                label: OTHERS.to_string(),
                color: palette.others,
            });
            SymbolSpec::new(base.kind, palette.others, base.outline, base.size)
        });
        if stats.has_blank() {
            legend.push(LegendItem {
                label: NO_VALUE.to_string(),
                color: palette.no_value_fill,
            });
            classes.push(ValueClass {
                value: Value::Null,
                label: NO_VALUE.to_string(),
                symbol: SymbolSpec::new(
                    base.kind,
                    palette.no_value_fill,
                    palette.no_value_ring,
                    base.size,
                ),
            });
        }

        StyleDecision {
            renderer: Renderer::UniqueValue {
                field: field.name.clone(),
                classes,
                default_label: default_symbol.map(|_| OTHERS.to_string()),
                default_symbol,
                visual_variables: size_variable(dataset.geometry_type).into_iter().collect(),
            },
            legend: Some(LegendSpec {
                title: field.display_name().to_string(),
                items: legend,
            }),
            labels: None,
        }
    }

    fn continuous(
        &self,
        dataset: &Dataset,
        field: &Field,
        stats: &FieldStatistics,
        class: &Classification,
        palette: &SymbolPalette,
    ) -> Option<StyleDecision> {
        let (min, max) = stats.numeric_values().fold(None, |acc, (v, _)| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })?;
        let label = |v: f64| {
            if class.is_date {
                format_date(v)
            } else {
                format_number(v)
            }
        };
        let stop = |value: f64, t: f32| ColorStop {
            value,
            color: self.continuous.sample(t),
            label: label(value),
        };

        let no_midpoint = min == max || (class.is_integer && max - min < 2.0);
        let stops = if no_midpoint {
            vec![stop(min, 0.0), stop(max, 1.0)]
        } else {
            vec![stop(min, 0.0), stop((min + max) / 2.0, 0.5), stop(max, 1.0)]
        };
        let legend = LegendSpec {
            title: field.display_name().to_string(),
            items: stops
                .iter()
                .map(|s| LegendItem {
                    label: s.label.clone(),
                    color: s.color,
                })
                .collect(),
        };

        let mut visual_variables = vec![VisualVariable::Color {
            field: Some(field.name.clone()),
            expression: None,
            stops,
        }];
        visual_variables.extend(size_variable(dataset.geometry_type));
        Some(StyleDecision {
            renderer: Renderer::Simple {
                symbol: base_symbol(dataset.geometry_type, palette),
                visual_variables,
            },
            legend: Some(legend),
            labels: None,
        })
    }
}

fn base_symbol(geometry: GeometryType, palette: &SymbolPalette) -> SymbolSpec {
    match geometry {
        GeometryType::Polyline => {
            SymbolSpec::new(SymbolKind::Line, palette.feature, palette.feature, 2.0)
        }
        GeometryType::Polygon => {
            SymbolSpec::new(SymbolKind::Fill, palette.feature, palette.outline, 0.5)
        }
        _ => SymbolSpec::new(SymbolKind::Marker, palette.feature, palette.outline, 5.0),
    }
}

fn size_variable(geometry: GeometryType) -> Option<VisualVariable> {
    let stops = match geometry {
        g if g.is_point() => POINT_SIZES.to_vec(),
        GeometryType::Polyline => LINE_WIDTHS.to_vec(),
        _ => return None,
    };
    Some(VisualVariable::Size { stops })
}

fn label_spec(field: &str, palette: &SymbolPalette) -> LabelSpec {
    LabelSpec {
        field: field.to_string(),
        color: palette.label_text,
        halo: palette.label_halo,
        halo_size: LABEL_HALO_SIZE,
    }
}
