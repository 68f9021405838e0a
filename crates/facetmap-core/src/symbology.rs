//! Renderer, legend and label descriptors handed to the view.

use crate::color::Color;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Shape family of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// Point marker
    Marker,
    /// Line stroke
    Line,
    /// Area fill
    Fill,
}

/// A drawable symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolSpec {
    /// Shape family
    pub kind: SymbolKind,
    /// Fill or stroke color
    pub color: Color,
    /// Outline color
    pub outline: Color,
    /// Marker size or line width in points
    pub size: f64,
}

impl SymbolSpec {
    /// Create a symbol.
    #[must_use]
    pub const fn new(kind: SymbolKind, color: Color, outline: Color, size: f64) -> Self {
        Self {
            kind,
            color,
            outline,
            size,
        }
    }
}

/// A color stop of a continuous color variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    /// Data value
    pub value: f64,
    /// Color at the value
    pub color: Color,
    /// Legend label
    pub label: String,
}

/// A size stop keyed by view scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeStop {
    /// View scale denominator
    pub scale: f64,
    /// Symbol size at that scale
    pub size: f64,
}

/// Data-driven symbol property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VisualVariable {
    /// Color driven by a field or expression
    Color {
        /// Driving field
        field: Option<String>,
        /// Driving expression when no field is used
        expression: Option<String>,
        /// Stops in ascending value order
        stops: Vec<ColorStop>,
    },
    /// Size driven by the view scale
    Size {
        /// Stops keyed by scale
        stops: Vec<SizeStop>,
    },
}

/// One class of a unique-value renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueClass {
    /// Matched value; null matches blank values
    pub value: Value,
    /// Legend label
    pub label: String,
    /// Class symbol
    pub symbol: SymbolSpec,
}

/// How features are drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Renderer {
    /// One symbol for every feature
    Simple {
        /// Symbol
        symbol: SymbolSpec,
        /// Data-driven overrides
        visual_variables: Vec<VisualVariable>,
    },
    /// Symbol chosen per value of a field
    UniqueValue {
        /// Classified field
        field: String,
        /// Classes in legend order
        classes: Vec<ValueClass>,
        /// Symbol for values outside every class
        default_symbol: Option<SymbolSpec>,
        /// Legend label for the default symbol
        default_label: Option<String>,
        /// Data-driven overrides
        visual_variables: Vec<VisualVariable>,
    },
}

impl Renderer {
    /// Data-driven overrides of either renderer kind.
    #[must_use]
    pub fn visual_variables(&self) -> &[VisualVariable] {
        match self {
            Self::Simple {
                visual_variables, ..
            }
            | Self::UniqueValue {
                visual_variables, ..
            } => visual_variables,
        }
    }
}

/// A legend row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    /// Row label
    pub label: String,
    /// Swatch color
    pub color: Color,
}

/// Legend for the current style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendSpec {
    /// Title, usually the field label
    pub title: String,
    /// Rows in display order
    pub items: Vec<LegendItem>,
}

/// Per-feature text labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Field whose value is drawn
    pub field: String,
    /// Text color
    pub color: Color,
    /// Halo color
    pub halo: Color,
    /// Halo size in points
    pub halo_size: f64,
}

/// Complete styling decision for the view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleDecision {
    /// Renderer
    pub renderer: Renderer,
    /// Legend, when the style encodes data
    pub legend: Option<LegendSpec>,
    /// Labels, when enabled
    pub labels: Option<LabelSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_serializes_tagged() {
        let renderer = Renderer::Simple {
            symbol: SymbolSpec::new(SymbolKind::Marker, Color::WHITE, Color::BLACK, 6.0),
            visual_variables: vec![VisualVariable::Size {
                stops: vec![SizeStop {
                    scale: 18_055.954_822,
                    size: 6.0,
                }],
            }],
        };
        let json = serde_json::to_value(&renderer).unwrap();
        assert_eq!(json["type"], "simple");
        assert_eq!(json["symbol"]["color"], "#ffffff");
        assert_eq!(json["visual_variables"][0]["type"], "size");
        assert_eq!(renderer.visual_variables().len(), 1);
    }
}
