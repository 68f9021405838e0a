//! Checkbox list over a field's most frequent values.

use crate::format::{format_pct, value_label};
use facetmap_core::{Error, Expr, Result, Value};
use serde::Serialize;

/// One row of a value list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueItem {
    /// The value
    pub value: Value,
    /// Record count
    pub count: u64,
    /// Share of records, when known
    pub pct: Option<f64>,
    /// Checked state
    pub checked: bool,
}

impl ValueItem {
    /// Unchecked item.
    #[must_use]
    pub const fn new(value: Value, count: u64, pct: Option<f64>) -> Self {
        Self {
            value,
            count,
            pct,
            checked: false,
        }
    }
}

/// Summary of the values not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OthersSummary {
    /// Distinct values not listed
    pub values: u64,
    /// Records holding them
    pub records: u64,
}

/// Value list filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueList {
    field: String,
    is_date: bool,
    items: Vec<ValueItem>,
    unique_count: u64,
    total: u64,
}

impl ValueList {
    /// Create a list; every item starts unchecked.
    #[must_use]
    pub fn new(field: impl Into<String>, items: Vec<ValueItem>, unique_count: u64, total: u64) -> Self {
        Self {
            field: field.into(),
            is_date: false,
            items,
            unique_count,
            total,
        }
    }

    /// Treat values as epoch-millisecond dates.
    #[must_use]
    pub const fn date(mut self, is_date: bool) -> Self {
        self.is_date = is_date;
        self
    }

    /// Filtered field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Values are dates.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        self.is_date
    }

    /// Rows.
    #[must_use]
    pub fn items(&self) -> &[ValueItem] {
        &self.items
    }

    /// Checked values.
    pub fn checked_values(&self) -> impl Iterator<Item = &Value> {
        self.items.iter().filter(|i| i.checked).map(|i| &i.value)
    }

    /// Row label, e.g. `No value` for blanks.
    #[must_use]
    pub fn label(&self, index: usize) -> Option<String> {
        self.items.get(index).map(|i| value_label(&i.value, self.is_date))
    }

    /// Row share, e.g. `12.50%`.
    #[must_use]
    pub fn pct_label(&self, index: usize) -> Option<String> {
        self.items.get(index).and_then(|i| i.pct).map(format_pct)
    }

    /// More distinct values exist than are listed.
    #[must_use]
    pub fn has_search(&self) -> bool {
        self.unique_count > self.items.len() as u64
    }

    /// Values and records not covered by the rows.
    #[must_use]
    pub fn others(&self) -> Option<OthersSummary> {
        let listed: u64 = self.items.iter().map(|i| i.count).sum();
        let values = self.unique_count.saturating_sub(self.items.len() as u64);
        (values > 0).then(|| OthersSummary {
            values,
            records: self.total.saturating_sub(listed),
        })
    }

    fn item_mut(&mut self, index: usize) -> Result<&mut ValueItem> {
        let len = self.items.len();
        self.items.get_mut(index).ok_or_else(|| {
            Error::InvalidInteraction(format!("value index {index} out of range ({len} items)"))
        })
    }

    /// Check or uncheck one row.
    pub fn toggle(&mut self, index: usize, checked: bool) -> Result<()> {
        self.item_mut(index)?.checked = checked;
        Ok(())
    }

    /// Check one row and uncheck every other.
    pub fn only(&mut self, index: usize) -> Result<()> {
        self.item_mut(index)?;
        for (i, item) in self.items.iter_mut().enumerate() {
            item.checked = i == index;
        }
        Ok(())
    }

    /// Uncheck every row.
    pub fn clear(&mut self) {
        for item in &mut self.items {
            item.checked = false;
        }
    }

    /// Check a search candidate, appending a row when it is not listed.
    pub fn add_candidate(&mut self, value: Value) -> usize {
        let index = match self.items.iter().position(|i| i.value == value) {
            Some(index) => index,
            None => {
                self.items.push(ValueItem::new(value, 0, None));
                self.items.len() - 1
            }
        };
        self.items[index].checked = true;
        index
    }

    /// Predicate selecting the checked values; `1=1` when nothing is checked.
    #[must_use]
    pub fn predicate(&self) -> Expr {
        let checked: Vec<&Value> = self.checked_values().collect();
        if checked.is_empty() {
            return Expr::tautology();
        }
        let has_null = checked.iter().any(|v| v.is_null());
        let literals = checked.iter().filter(|v| !v.is_null()).map(|v| match v {
            Value::Number(n) => Expr::num(*n),
            other => Expr::text(other.to_string()),
        });

        let col = || Expr::col(&self.field);
        let base = if self.is_date {
            Expr::any_of(literals.map(|lit| col().equals(lit)))
        } else {
            let list: Vec<Expr> = literals.collect();
            (!list.is_empty()).then(|| col().in_list(list))
        };

        match (base, has_null) {
            (Some(base), true) => base.or(col().is_null()),
            (Some(base), false) => base,
            (None, _) => col().is_null(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses() -> ValueList {
        ValueList::new(
            "Status",
            vec![
                ValueItem::new(Value::text("A"), 50, Some(0.5)),
                ValueItem::new(Value::text("B"), 30, Some(0.3)),
                ValueItem::new(Value::Null, 10, Some(0.1)),
            ],
            5,
            100,
        )
    }

    #[test]
    fn test_nothing_checked_is_tautology() {
        assert_eq!(statuses().predicate().to_string(), "1=1");
    }

    #[test]
    fn test_in_list() {
        let mut list = statuses();
        list.toggle(0, true).unwrap();
        list.toggle(1, true).unwrap();
        assert_eq!(list.predicate().to_string(), "Status IN ('A', 'B')");
    }

    #[test]
    fn test_null_is_added_not_substituted() {
        let mut list = statuses();
        list.toggle(0, true).unwrap();
        list.toggle(2, true).unwrap();
        assert_eq!(
            list.predicate().to_string(),
            "Status IN ('A') OR Status IS NULL"
        );
        list.only(2).unwrap();
        assert_eq!(list.predicate().to_string(), "Status IS NULL");
    }

    #[test]
    fn test_date_values_use_equality() {
        let mut list = ValueList::new(
            "Opened",
            vec![
                ValueItem::new(Value::Number(0.0), 2, None),
                ValueItem::new(Value::Number(86_400_000.0), 1, None),
            ],
            2,
            3,
        )
        .date(true);
        list.toggle(0, true).unwrap();
        list.toggle(1, true).unwrap();
        assert_eq!(
            list.predicate().to_string(),
            "Opened = 0 OR Opened = 86400000"
        );
        assert_eq!(list.label(1).unwrap(), "1/2/1970");
    }

    #[test]
    fn test_only_and_clear() {
        let mut list = statuses();
        list.toggle(0, true).unwrap();
        list.only(1).unwrap();
        let checked: Vec<_> = list.checked_values().cloned().collect();
        assert_eq!(checked, vec![Value::text("B")]);
        list.clear();
        assert_eq!(list.checked_values().count(), 0);
    }

    #[test]
    fn test_out_of_range_index() {
        let mut list = statuses();
        assert!(matches!(list.toggle(9, true), Err(Error::InvalidInteraction(_))));
        assert!(list.only(9).is_err());
    }

    #[test]
    fn test_add_candidate() {
        let mut list = statuses();
        assert_eq!(list.add_candidate(Value::text("B")), 1);
        assert_eq!(list.add_candidate(Value::text("Z")), 3);
        assert_eq!(list.items().len(), 4);
        assert_eq!(list.predicate().to_string(), "Status IN ('B', 'Z')");
    }

    #[test]
    fn test_labels_and_others() {
        let list = statuses();
        assert_eq!(list.label(2).unwrap(), "No value");
        assert_eq!(list.pct_label(0).unwrap(), "50.00%");
        assert!(list.has_search());
        assert_eq!(
            list.others(),
            Some(OthersSummary {
                values: 2,
                records: 10
            })
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_any_checked_subset_parses(mask in prop::collection::vec(any::<bool>(), 3)) {
                let mut list = statuses();
                for (i, checked) in mask.iter().enumerate() {
                    list.toggle(i, *checked).unwrap();
                }
                let text = list.predicate().to_string();
                let parsed = Expr::parse(&text).unwrap();
                prop_assert_eq!(parsed.to_string(), text);
                prop_assert_eq!(parsed.is_tautology(), !mask.contains(&true));
            }
        }
    }

    #[test]
    fn test_fragment_parses_back() {
        let mut list = statuses();
        list.toggle(0, true).unwrap();
        list.toggle(2, true).unwrap();
        let text = list.predicate().to_string();
        assert_eq!(Expr::parse(&text).unwrap().to_string(), text);
    }
}
