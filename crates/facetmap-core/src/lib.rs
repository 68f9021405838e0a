//! Core types for facetmap: values, dataset model, predicate language,
//! histogram bins, symbology descriptors and the provider traits the engine
//! talks to.

pub mod color;
pub mod error;
mod eval;
pub mod histogram;
pub mod model;
pub mod parser;
pub mod predicate;
pub mod provider;
pub mod symbology;
pub mod theme;
pub mod throttle;
pub mod value;

pub use color::{Color, ColorParseError, ColorRamp};
pub use error::{Error, QueryError, Result};
pub use histogram::{Bin, Histogram, HistogramSource, HistogramStrategy, TierFailure};
pub use model::{Dataset, Extent, Feature, Field, FieldSummary, GeometryType, SimpleType, ValueCount};
pub use predicate::{Dialect, Expr, PredicateError, WhereClause};
pub use provider::{
    DatasetProvider, Environment, ExtentResult, FeatureEffect, FeatureQuery, FeatureSet,
    HistogramRequest, QueryProvider, StaticTheme, ThemeDetector, ViewProvider,
};
pub use symbology::{
    ColorStop, LabelSpec, LegendItem, LegendSpec, Renderer, SizeStop, StyleDecision, SymbolKind,
    SymbolSpec, ValueClass, VisualVariable,
};
pub use theme::{BgTheme, SymbolPalette};
pub use throttle::Throttle;
pub use value::Value;
