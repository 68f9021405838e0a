//! Dataset, field and feature descriptors.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Coarse type family of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimpleType {
    /// Integers and floating point numbers
    Numeric,
    /// Date and timestamp columns
    Date,
    /// Everything else
    String,
}

impl SimpleType {
    /// Map a declared service type (e.g. `esriFieldTypeDouble`) onto a family.
    #[must_use]
    pub fn from_declared(declared: &str) -> Self {
        let lower = declared.to_ascii_lowercase();
        let lower = lower.trim_start_matches("esrifieldtype");
        match lower {
            "date" | "dateonly" | "timestampoffset" | "timeonly" => Self::Date,
            "oid" | "single" | "float" | "double" | "integer" | "smallinteger" | "biginteger" => {
                Self::Numeric
            }
            other if other.contains("date") || other.contains("time") => Self::Date,
            other
                if ["int", "double", "float", "number", "numeric", "decimal"]
                    .iter()
                    .any(|k| other.contains(k)) =>
            {
                Self::Numeric
            }
            _ => Self::String,
        }
    }
}

/// Geometry type of a dataset's features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryType {
    /// Single points
    Point,
    /// Point collections
    Multipoint,
    /// Lines
    Polyline,
    /// Areas
    Polygon,
    /// Table without geometry or unrecognized geometry
    #[default]
    None,
}

impl GeometryType {
    /// Parse a service geometry type such as `esriGeometryPolygon`.
    #[must_use]
    pub fn from_service(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.trim_start_matches("esrigeometry") {
            "point" => Self::Point,
            "multipoint" => Self::Multipoint,
            "polyline" | "line" => Self::Polyline,
            "polygon" | "envelope" => Self::Polygon,
            _ => Self::None,
        }
    }

    /// Point or multipoint.
    #[must_use]
    pub const fn is_point(self) -> bool {
        matches!(self, Self::Point | Self::Multipoint)
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Point => "point",
            Self::Multipoint => "multipoint",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Axis-aligned bounding box in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Minimum x
    pub xmin: f64,
    /// Minimum y
    pub ymin: f64,
    /// Maximum x
    pub xmax: f64,
    /// Maximum y
    pub ymax: f64,
}

impl Extent {
    /// Create an extent from its corners.
    #[must_use]
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Width in map units.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height in map units.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Area in square map units.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Zero-area or inverted extents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.xmin + self.xmax) / 2.0,
            (self.ymin + self.ymax) / 2.0,
        )
    }

    /// Whether `other` lies entirely inside this extent.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.xmin >= self.xmin
            && other.ymin >= self.ymin
            && other.xmax <= self.xmax
            && other.ymax <= self.ymax
    }

    /// Scale around the center.
    #[must_use]
    pub fn expand(&self, factor: f64) -> Self {
        let (cx, cy) = self.center();
        let hw = self.width() * factor / 2.0;
        let hh = self.height() * factor / 2.0;
        Self::new(cx - hw, cy - hh, cx + hw, cy + hh)
    }
}

/// A value and the number of records holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    /// The value
    pub value: Value,
    /// Number of records
    pub count: u64,
}

impl ValueCount {
    /// Create a value count.
    #[must_use]
    pub fn new(value: impl Into<Value>, count: u64) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Statistics block attached to a field by the dataset metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    /// Record count the statistics were computed over
    #[serde(default)]
    pub count: Option<u64>,
    /// Number of distinct values
    #[serde(default)]
    pub unique_count: Option<u64>,
    /// Minimum value
    #[serde(default)]
    pub min: Option<Value>,
    /// Maximum value
    #[serde(default)]
    pub max: Option<Value>,
    /// Value counts, possibly truncated
    #[serde(default)]
    pub values: Vec<ValueCount>,
}

/// A dataset attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Column name
    pub name: String,
    /// Display alias, may be empty
    #[serde(default)]
    pub alias: String,
    /// Declared service type
    pub declared_type: String,
    /// Coarse type family
    pub simple_type: SimpleType,
    /// Metadata statistics, when the dataset carries them
    #[serde(default)]
    pub summary: Option<FieldSummary>,
}

impl Field {
    /// Create a field, deriving the simple type from the declared type.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        let declared_type = declared_type.into();
        Self {
            name: name.into(),
            alias: String::new(),
            simple_type: SimpleType::from_declared(&declared_type),
            declared_type,
            summary: None,
        }
    }

    /// Set the display alias.
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    /// Attach metadata statistics.
    #[must_use]
    pub fn with_summary(mut self, summary: FieldSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Alias when present, otherwise the name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.alias.trim().is_empty() {
            &self.name
        } else {
            &self.alias
        }
    }

    /// Declared type belongs to the integer family.
    #[must_use]
    pub fn is_declared_integer(&self) -> bool {
        let lower = self.declared_type.to_ascii_lowercase();
        lower.contains("integer") || lower.ends_with("oid")
    }

    /// Field holds exactly one distinct value according to its summary.
    #[must_use]
    pub fn is_single_valued(&self) -> bool {
        let Some(summary) = &self.summary else {
            return false;
        };
        if summary.unique_count.is_some_and(|n| n > 1) {
            return false;
        }
        match (&summary.min, &summary.max) {
            (Some(min), Some(max)) => min == max,
            _ => summary.unique_count == Some(1),
        }
    }
}

/// A loaded dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Hub item id
    pub id: String,
    /// Title
    pub name: String,
    /// Feature service layer URL
    pub url: String,
    /// Geometry of the features
    pub geometry_type: GeometryType,
    /// Full extent of the data
    #[serde(default)]
    pub extent: Option<Extent>,
    /// Total number of records
    pub record_count: u64,
    /// Attributes
    pub fields: Vec<Field>,
    /// Field used for polygon labels
    #[serde(default)]
    pub display_field: Option<String>,
}

impl Dataset {
    /// Look up a field by name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Result<&Field> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))
    }

    /// Fields worth offering to the user: single-valued fields are left out.
    pub fn catalog_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.is_single_valued())
    }
}

/// A record with its attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    /// Attribute values by field name
    pub attributes: BTreeMap<String, Value>,
}

static NULL: Value = Value::Null;

impl Feature {
    /// Build a feature from name/value pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            attributes: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Attribute value; missing attributes read as null.
    #[must_use]
    pub fn get(&self, name: &str) -> &Value {
        self.attributes
            .get(name)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .unwrap_or(&NULL)
    }

    /// Keep only the named attributes.
    #[must_use]
    pub fn project(&self, names: &[String]) -> Self {
        if names.is_empty() || names.iter().any(|n| n == "*") {
            return self.clone();
        }
        Self {
            attributes: names
                .iter()
                .map(|n| (n.clone(), self.get(n).clone()))
                .collect(),
        }
    }
}
