//! Incremental search for values missing from a value list.

use crate::format::value_label;
use facetmap_core::predicate::CastType;
use facetmap_core::{Error, Expr, FeatureQuery, QueryProvider, Result, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// A value offered by the search box.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// The value
    pub value: Value,
    /// Display label
    pub label: String,
}

/// Distinct-value search over one field.
///
/// Each call to [`ValueSearch::search`] supersedes the ones before it; a
/// superseded call resolves to [`Error::SearchSuperseded`].
#[derive(Debug)]
pub struct ValueSearch {
    field: String,
    is_date: bool,
    limit: usize,
    generation: AtomicU64,
}

impl ValueSearch {
    /// Create a search returning at most `limit` candidates.
    #[must_use]
    pub fn new(field: impl Into<String>, is_date: bool, limit: usize) -> Self {
        Self {
            field: field.into(),
            is_date,
            limit,
            generation: AtomicU64::new(0),
        }
    }

    /// Case-insensitive substring match on the field.
    #[must_use]
    pub fn clause(&self, query: &str) -> Expr {
        let subject = if self.is_date {
            Expr::col(&self.field).cast(CastType::Varchar(Some(256)))
        } else {
            Expr::col(&self.field).lower()
        };
        subject.like(Expr::text(format!("%{query}%")).lower())
    }

    /// Query candidates matching `query`, skipping values already checked.
    pub async fn search(
        &self,
        provider: &dyn QueryProvider,
        query: &str,
        exclude: &[Value],
    ) -> Result<Vec<Candidate>> {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = FeatureQuery::new(self.clause(query).to_string())
            .out_fields([self.field.as_str()])
            .order_by(self.field.as_str())
            .distinct()
            .limit(self.limit);
        let set = provider.query_features(&request).await?;

        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!(field = %self.field, query, "search superseded");
            return Err(Error::SearchSuperseded(query.to_string()));
        }

        let mut seen: Vec<Value> = Vec::new();
        for feature in &set.features {
            let value = match feature.get(&self.field) {
                Value::Text(s) => Value::text(s.trim()),
                other => other.clone(),
            };
            if value.is_blank() || seen.contains(&value) || exclude.contains(&value) {
                continue;
            }
            seen.push(value);
            if seen.len() == self.limit {
                break;
            }
        }
        Ok(seen
            .into_iter()
            .map(|value| Candidate {
                label: value_label(&value, self.is_date),
                value,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facetmap_core::Feature;
    use facetmap_test::MockQueryProvider;
    use std::sync::Arc;

    fn provider() -> MockQueryProvider {
        let names = ["Alpha", "alpine ", "Beta", "Alpha", "ALPS", ""];
        MockQueryProvider::new(
            names
                .iter()
                .map(|n| Feature::from_pairs([("Name", Value::text(*n))]))
                .collect(),
        )
    }

    #[test]
    fn test_clause() {
        let search = ValueSearch::new("Name", false, 10);
        assert_eq!(
            search.clause("al").to_string(),
            "lower(Name) LIKE lower('%al%')"
        );
        let dates = ValueSearch::new("Opened", true, 10);
        assert_eq!(
            dates.clause("2020").to_string(),
            "CAST(Opened AS VARCHAR(256)) LIKE lower('%2020%')"
        );
    }

    #[tokio::test]
    async fn test_search_trims_dedupes_and_excludes() {
        let provider = provider();
        let search = ValueSearch::new("Name", false, 10);
        let found = search
            .search(&provider, "AL", &[Value::text("ALPS")])
            .await
            .unwrap();
        let labels: Vec<_> = found.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Alpha", "alpine"]);
    }

    #[tokio::test]
    async fn test_limit() {
        let provider = provider();
        let search = ValueSearch::new("Name", false, 1);
        let found = search.search(&provider, "a", &[]).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latest_search_wins() {
        let provider = Arc::new(provider().with_latency(std::time::Duration::from_millis(50)));
        let search = Arc::new(ValueSearch::new("Name", false, 10));

        let first = {
            let (provider, search) = (provider.clone(), search.clone());
            tokio::spawn(async move { search.search(provider.as_ref(), "a", &[]).await })
        };
        tokio::task::yield_now().await;
        let second = search.search(provider.as_ref(), "alp", &[]).await.unwrap();

        assert!(matches!(
            first.await.unwrap(),
            Err(Error::SearchSuperseded(q)) if q == "a"
        ));
        assert_eq!(second.len(), 3);
    }
}
