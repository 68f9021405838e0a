//! Field classification and widget choice.

use crate::stats::FieldStatistics;
use facetmap_config::{DateWidget, Tunables};
use facetmap_core::{Field, SimpleType};
use facetmap_widgets::WidgetKind;
use serde::Serialize;

/// How a field's values behave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Integer typed, or every value is a whole number
    pub is_integer: bool,
    /// Values are numbers, natively or as text
    pub is_number_like: bool,
    /// Few enough distinct values to enumerate
    pub is_categorical: bool,
    /// Leading values cover most records
    pub is_pseudo_categorical: bool,
    /// Date typed
    pub is_date: bool,
}

impl Classification {
    /// Number-like values stored as text, which servers must cast.
    #[must_use]
    pub const fn needs_cast(&self, field: &Field) -> bool {
        self.is_number_like && matches!(field.simple_type, SimpleType::String)
    }
}

/// Classifies fields from their statistics. Pure: no state beyond the
/// thresholds it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldClassifier {
    categorical_max: usize,
    pseudo_categorical_coverage: f64,
    date_widget: DateWidget,
}

impl FieldClassifier {
    /// Classifier with the configured thresholds.
    #[must_use]
    pub const fn new(tunables: &Tunables) -> Self {
        Self {
            categorical_max: tunables.categorical_max,
            pseudo_categorical_coverage: tunables.pseudo_categorical_coverage,
            date_widget: tunables.date_widget,
        }
    }

    /// Unique-value ceiling for categorical fields.
    #[must_use]
    pub const fn categorical_max(&self) -> usize {
        self.categorical_max
    }

    /// Classify a field.
    #[must_use]
    pub fn classify(&self, field: &Field, stats: &FieldStatistics) -> Classification {
        Classification {
            is_integer: is_integer(field, stats),
            is_number_like: is_number_like(field, stats),
            is_categorical: stats.unique_count <= self.categorical_max as u64,
            is_pseudo_categorical: self.is_pseudo_categorical(stats),
            is_date: field.simple_type == SimpleType::Date,
        }
    }

    fn is_pseudo_categorical(&self, stats: &FieldStatistics) -> bool {
        let covered: f64 = stats
            .values
            .iter()
            .take(self.categorical_max)
            .map(|v| v.pct)
            .sum();
        covered >= self.pseudo_categorical_coverage
    }

    /// Widget for a classified field.
    #[must_use]
    pub fn widget_kind(&self, field: &Field, class: &Classification) -> WidgetKind {
        if field.simple_type == SimpleType::String && !class.is_number_like {
            return WidgetKind::ValueList;
        }
        if class.is_pseudo_categorical {
            return WidgetKind::ValueList;
        }
        match (class.is_date, self.date_widget) {
            (true, DateWidget::TimeWindow) => WidgetKind::TimeWindow,
            _ => WidgetKind::RangeHistogram,
        }
    }
}

/// Blank values do not count against integrality, so an all-blank field is
/// integral.
fn is_integer(field: &Field, stats: &FieldStatistics) -> bool {
    field.is_declared_integer() || stats.non_blank().all(|v| v.value.is_integral())
}

fn is_number_like(field: &Field, stats: &FieldStatistics) -> bool {
    match field.simple_type {
        SimpleType::Numeric => true,
        SimpleType::Date => false,
        SimpleType::String => {
            let mut seen = false;
            for v in stats.non_blank() {
                if v.value.as_f64().is_none() {
                    return false;
                }
                seen = true;
            }
            seen
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_core::{Value, ValueCount};

    fn stats(values: Vec<ValueCount>) -> FieldStatistics {
        FieldStatistics::from_counts("F", values, None, None, &Tunables::default())
    }

    fn tunables(categorical_max: usize) -> Tunables {
        Tunables {
            categorical_max,
            ..Tunables::default()
        }
    }

    #[test]
    fn test_uniform_numbers_are_continuous() {
        let s = stats((0..100).map(|i| ValueCount::new(i64::from(i), 10)).collect());
        let field = Field::new("Age", "esriFieldTypeDouble");
        let classifier = FieldClassifier::new(&tunables(7));
        let class = classifier.classify(&field, &s);
        assert!(!class.is_categorical);
        assert!(!class.is_pseudo_categorical);
        assert!(class.is_integer);
        assert!(class.is_number_like);
        assert_eq!(classifier.widget_kind(&field, &class), WidgetKind::RangeHistogram);
    }

    #[test]
    fn test_number_like_strings() {
        let s = stats(vec![
            ValueCount::new("20", 3),
            ValueCount::new(" 35.5 ", 2),
            ValueCount::new(Value::Null, 1),
            ValueCount::new("", 1),
        ]);
        let field = Field::new("Age", "esriFieldTypeString");
        let class = FieldClassifier::new(&Tunables::default()).classify(&field, &s);
        assert!(class.is_number_like);
        assert!(!class.is_integer);
        assert!(class.needs_cast(&field));
    }

    #[test]
    fn test_text_is_not_number_like() {
        let s = stats(vec![ValueCount::new("20", 3), ValueCount::new("n/a", 1)]);
        let field = Field::new("Age", "esriFieldTypeString");
        let classifier = FieldClassifier::new(&Tunables::default());
        let class = classifier.classify(&field, &s);
        assert!(!class.is_number_like);
        assert_eq!(classifier.widget_kind(&field, &class), WidgetKind::ValueList);
    }

    #[test]
    fn test_dates_never_number_like() {
        let s = stats((0..50).map(|i| ValueCount::new(i64::from(i) * 86_400_000, 1)).collect());
        let field = Field::new("Opened", "esriFieldTypeDate");
        let class = FieldClassifier::new(&Tunables::default()).classify(&field, &s);
        assert!(!class.is_number_like);
        assert!(class.is_date);
        assert!(!class.needs_cast(&field));

        let histogram = FieldClassifier::new(&Tunables::default());
        assert_eq!(histogram.widget_kind(&field, &class), WidgetKind::RangeHistogram);
        let window = FieldClassifier::new(&Tunables {
            date_widget: DateWidget::TimeWindow,
            ..Tunables::default()
        });
        assert_eq!(window.widget_kind(&field, &class), WidgetKind::TimeWindow);
    }

    #[test]
    fn test_declared_integer() {
        let s = stats(vec![ValueCount::new(1.5, 1)]);
        let field = Field::new("Count", "esriFieldTypeSmallInteger");
        assert!(FieldClassifier::new(&Tunables::default())
            .classify(&field, &s)
            .is_integer);
    }

    #[test]
    fn test_all_blank_values_are_integral() {
        let s = stats(vec![ValueCount::new(Value::Null, 4), ValueCount::new("", 2)]);
        let field = Field::new("Floors", "esriFieldTypeDouble");
        assert!(FieldClassifier::new(&Tunables::default())
            .classify(&field, &s)
            .is_integer);
    }

    #[test]
    fn test_few_numeric_values_use_value_list() {
        let s = stats(vec![ValueCount::new(1i64, 10), ValueCount::new(2i64, 5)]);
        let field = Field::new("Floors", "esriFieldTypeInteger");
        let classifier = FieldClassifier::new(&Tunables::default());
        let class = classifier.classify(&field, &s);
        assert!(class.is_categorical);
        assert!(class.is_pseudo_categorical);
        assert_eq!(classifier.widget_kind(&field, &class), WidgetKind::ValueList);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_classification_is_deterministic(
                raw in prop::collection::vec((0i64..1000, 1u64..100), 1..80),
                categorical_max in 1usize..20,
            ) {
                let counts: Vec<ValueCount> =
                    raw.iter().map(|(v, c)| ValueCount::new(*v, *c)).collect();
                let field = Field::new("F", "esriFieldTypeDouble");
                let classifier = FieldClassifier::new(&tunables(categorical_max));
                let first = classifier.classify(&field, &stats(counts.clone()));
                let second = classifier.classify(&field, &stats(counts));
                prop_assert_eq!(first, second);
            }
        }
    }
}
