//! Per-field unique value statistics, cached per dataset.

use facetmap_config::Tunables;
use facetmap_core::{Dataset, Error, QueryProvider, Result, Value, ValueCount};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A distinct value with its frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueStat {
    /// The value
    pub value: Value,
    /// Records holding it
    pub count: u64,
    /// `count / total`
    pub pct: f64,
}

/// Distribution of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldStatistics {
    /// Resolved field name
    pub field: String,
    /// Total records
    pub count: u64,
    /// Distinct values
    pub unique_count: u64,
    /// Every known value, most frequent first
    pub values: Vec<ValueStat>,
    /// Values worth listing individually
    pub top_values: Vec<ValueStat>,
}

impl FieldStatistics {
    /// Build statistics from raw counts.
    ///
    /// `total` and `unique_count` default to what the counts imply. Counts are
    /// stable-sorted by descending frequency.
    #[must_use]
    pub fn from_counts(
        field: impl Into<String>,
        mut counts: Vec<ValueCount>,
        total: Option<u64>,
        unique_count: Option<u64>,
        tunables: &Tunables,
    ) -> Self {
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        let total = total
            .filter(|t| *t > 0)
            .unwrap_or_else(|| counts.iter().map(|c| c.count).sum());
        let unique_count = unique_count.unwrap_or(counts.len() as u64);
        let values: Vec<ValueStat> = counts
            .into_iter()
            .map(|c| ValueStat {
                pct: if total == 0 {
                    0.0
                } else {
                    c.count as f64 / total as f64
                },
                value: c.value,
                count: c.count,
            })
            .collect();
        let top_values = top_values(&values, unique_count, tunables);
        Self {
            field: field.into(),
            count: total,
            unique_count,
            values,
            top_values,
        }
    }

    /// Numeric values with their counts, nulls and text skipped.
    pub fn numeric_values(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.values
            .iter()
            .filter_map(|v| v.value.as_f64().map(|n| (n, v.count)))
    }

    /// Some value is null or whitespace.
    #[must_use]
    pub fn has_blank(&self) -> bool {
        self.values.iter().any(|v| v.value.is_blank())
    }

    /// Known values other than blanks.
    pub fn non_blank(&self) -> impl Iterator<Item = &ValueStat> {
        self.values.iter().filter(|v| !v.value.is_blank())
    }
}

/// Leading values until `top_values_max` are taken or the next one falls
/// under `top_values_min_pct`. Fields with fewer distinct values than the cap
/// keep them all.
fn top_values(values: &[ValueStat], unique_count: u64, tunables: &Tunables) -> Vec<ValueStat> {
    if unique_count < tunables.top_values_max as u64 {
        return values.to_vec();
    }
    values
        .iter()
        .take_while(|v| v.pct >= tunables.top_values_min_pct)
        .take(tunables.top_values_max)
        .cloned()
        .collect()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache of [`FieldStatistics`] keyed by field name.
///
/// Concurrent misses for the same field may both query; the first result
/// stored wins and every caller gets the same `Arc`. A dataset switch bumps
/// the generation, and results of queries started before it are discarded.
#[derive(Debug)]
pub struct StatsCache {
    tunables: Tunables,
    entries: Mutex<HashMap<String, Arc<FieldStatistics>>>,
    generation: AtomicU64,
}

impl StatsCache {
    /// Empty cache.
    #[must_use]
    pub fn new(tunables: Tunables) -> Self {
        Self {
            tunables,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current dataset generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop every entry and start a new generation.
    pub fn invalidate(&self) -> u64 {
        lock(&self.entries).clear();
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Cached entry, if any.
    #[must_use]
    pub fn cached(&self, field: &str) -> Option<Arc<FieldStatistics>> {
        lock(&self.entries).get(field).cloned()
    }

    /// Number of cached fields.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Nothing cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistics of `field`, from the dataset summary when it carries value
    /// counts, otherwise from the provider.
    pub async fn get_unique_value_stats(
        &self,
        dataset: &Dataset,
        field: &str,
        provider: &dyn QueryProvider,
    ) -> Result<Arc<FieldStatistics>> {
        let field = dataset.field(field)?;
        if let Some(hit) = self.cached(&field.name) {
            debug!(field = %field.name, "stats cache hit");
            return Ok(hit);
        }

        let generation = self.generation();
        let summary = field.summary.as_ref().filter(|s| !s.values.is_empty());
        let stats = match summary {
            Some(summary) => FieldStatistics::from_counts(
                &field.name,
                summary.values.clone(),
                summary.count,
                summary.unique_count,
                &self.tunables,
            ),
            None => {
                let counts = provider
                    .compute_unique_values(&field.name)
                    .await
                    .map_err(|reason| Error::StatsUnavailable {
                        field: field.name.clone(),
                        reason,
                    })?;
                let total = field.summary.as_ref().and_then(|s| s.count);
                FieldStatistics::from_counts(&field.name, counts, total, None, &self.tunables)
            }
        };

        if self.generation() != generation {
            debug!(field = %field.name, "discarding stats from a previous dataset");
            return Err(Error::StaleDataset(field.name.clone()));
        }
        debug!(field = %field.name, unique = stats.unique_count, "stats cached");
        let mut entries = lock(&self.entries);
        Ok(entries
            .entry(field.name.clone())
            .or_insert_with(|| Arc::new(stats))
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pairs: &[(&str, u64)]) -> Vec<ValueCount> {
        pairs.iter().map(|(v, c)| ValueCount::new(*v, *c)).collect()
    }

    #[test]
    fn test_sorted_descending_ties_keep_order() {
        let stats = FieldStatistics::from_counts(
            "Status",
            counts(&[("C", 2), ("A", 5), ("B", 2)]),
            None,
            None,
            &Tunables::default(),
        );
        let order: Vec<_> = stats.values.iter().map(|v| v.value.to_string()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
        assert_eq!(stats.count, 9);
        assert_eq!(stats.unique_count, 3);
        assert_eq!(stats.top_values.len(), 3);
    }

    #[test]
    fn test_pct_uses_summary_total() {
        let stats = FieldStatistics::from_counts(
            "Status",
            counts(&[("A", 25)]),
            Some(100),
            Some(1),
            &Tunables::default(),
        );
        assert_eq!(stats.values[0].pct, 0.25);
    }

    #[test]
    fn test_top_values_stop_at_min_pct() {
        let mut pairs: Vec<(String, u64)> = (0..5).map(|i| (format!("big{i}"), 100)).collect();
        pairs.extend((0..20).map(|i| (format!("small{i}"), 1)));
        let counts = pairs.iter().map(|(v, c)| ValueCount::new(v.as_str(), *c)).collect();
        let stats = FieldStatistics::from_counts("F", counts, None, None, &Tunables::default());
        assert_eq!(stats.unique_count, 25);
        assert_eq!(stats.top_values.len(), 5);
    }

    #[test]
    fn test_top_values_capped() {
        let counts = (0..40).map(|i| ValueCount::new(format!("v{i}"), 10)).collect();
        let stats = FieldStatistics::from_counts("F", counts, None, None, &Tunables::default());
        assert_eq!(stats.top_values.len(), 12);
    }

    #[test]
    fn test_blank_detection() {
        let stats = FieldStatistics::from_counts(
            "F",
            vec![ValueCount::new("A", 3), ValueCount::new(Value::Null, 1)],
            None,
            None,
            &Tunables::default(),
        );
        assert!(stats.has_blank());
        assert_eq!(stats.non_blank().count(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_top_values_coverage(raw in prop::collection::vec(1u64..500, 1..60)) {
                let tunables = Tunables::default();
                let counts = raw
                    .iter()
                    .enumerate()
                    .map(|(i, c)| ValueCount::new(format!("v{i}"), *c))
                    .collect();
                let stats = FieldStatistics::from_counts("F", counts, None, None, &tunables);
                let top = stats.top_values.len();
                if stats.unique_count < tunables.top_values_max as u64 {
                    prop_assert_eq!(top as u64, stats.unique_count);
                } else {
                    prop_assert!(top <= tunables.top_values_max);
                    if top < tunables.top_values_max {
                        prop_assert!(stats.values[top].pct < tunables.top_values_min_pct);
                    }
                }
            }
        }
    }
}
