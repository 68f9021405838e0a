//! HTTP providers: the open data hub catalog and feature service queries.

use async_trait::async_trait;
use facetmap_config::Environments;
use facetmap_core::{
    Dataset, DatasetProvider, Environment, Error, Extent, ExtentResult, Feature, FeatureQuery,
    FeatureSet, Field, FieldSummary, GeometryType, Histogram, HistogramRequest, QueryError,
    QueryProvider, SimpleType, Value, ValueCount,
};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct HubOne {
    data: HubItem,
}

#[derive(Debug, Deserialize)]
struct HubMany {
    data: Vec<HubItem>,
}

#[derive(Debug, Deserialize)]
struct HubItem {
    id: String,
    attributes: HubAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubAttributes {
    name: String,
    url: String,
    #[serde(default)]
    record_count: Option<u64>,
    #[serde(default)]
    geometry_type: Option<String>,
    #[serde(default)]
    extent: Option<HubExtent>,
    #[serde(default)]
    display_field: Option<String>,
    #[serde(default)]
    fields: Vec<HubField>,
    #[serde(default)]
    statistics: HubStatistics,
}

#[derive(Debug, Deserialize)]
struct HubExtent {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct HubField {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(rename = "type")]
    field_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct HubStatistics {
    #[serde(default)]
    numeric: HashMap<String, HubFieldStats>,
    #[serde(default)]
    date: HashMap<String, HubFieldStats>,
    #[serde(default)]
    string: HashMap<String, HubFieldStats>,
}

#[derive(Debug, Deserialize)]
struct HubFieldStats {
    statistics: HubStatBlock,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HubStatBlock {
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    unique_count: Option<u64>,
    #[serde(default)]
    values: Option<serde_json::Value>,
}

impl HubStatBlock {
    /// Numeric and date blocks carry `{min, max}`; string blocks carry value
    /// counts.
    fn into_summary(self) -> FieldSummary {
        let mut summary = FieldSummary {
            count: self.count,
            unique_count: self.unique_count,
            ..FieldSummary::default()
        };
        match self.values {
            Some(serde_json::Value::Object(map)) => {
                summary.min = map.get("min").and_then(json_value);
                summary.max = map.get("max").and_then(json_value);
            }
            Some(serde_json::Value::Array(items)) => {
                summary.values = items
                    .into_iter()
                    .filter_map(|item| serde_json::from_value::<ValueCount>(item).ok())
                    .collect();
            }
            _ => {}
        }
        summary
    }
}

fn json_value(v: &serde_json::Value) -> Option<Value> {
    match v {
        serde_json::Value::Number(n) => n.as_f64().map(Value::Number),
        serde_json::Value::String(s) => Some(Value::text(s.as_str())),
        _ => None,
    }
}

impl HubItem {
    fn into_dataset(self) -> Dataset {
        let HubAttributes {
            name,
            url,
            record_count,
            geometry_type,
            extent,
            display_field,
            fields,
            mut statistics,
        } = self.attributes;

        let fields = fields
            .into_iter()
            .map(|f| {
                let mut field = Field::new(f.name, f.field_type);
                if let Some(alias) = f.alias {
                    field = field.with_alias(alias);
                }
                let bucket = match field.simple_type {
                    SimpleType::Numeric => &mut statistics.numeric,
                    SimpleType::Date => &mut statistics.date,
                    SimpleType::String => &mut statistics.string,
                };
                match bucket.remove(&field.name.to_lowercase()) {
                    Some(stats) => field.with_summary(stats.statistics.into_summary()),
                    None => field,
                }
            })
            .collect();

        let extent = extent.and_then(|e| match e.coordinates.as_slice() {
            [[xmin, ymin], [xmax, ymax], ..] => Some(Extent::new(*xmin, *ymin, *xmax, *ymax)),
            _ => None,
        });

        Dataset {
            id: self.id,
            name,
            url,
            geometry_type: geometry_type
                .as_deref()
                .map_or(GeometryType::None, GeometryType::from_service),
            extent,
            record_count: record_count.unwrap_or(0),
            fields,
            display_field,
        }
    }
}

/// Dataset metadata from the open data hub API.
#[derive(Debug, Clone)]
pub struct HubDatasetProvider {
    client: Client,
    environments: Environments,
}

impl HubDatasetProvider {
    /// Provider over the configured hub endpoints.
    #[must_use]
    pub fn new(environments: Environments) -> Self {
        Self {
            client: Client::new(),
            environments,
        }
    }

    fn datasets_url(&self, env: Environment) -> String {
        format!(
            "{}/api/v3/datasets",
            self.environments.hub_url(env).trim_end_matches('/')
        )
    }

    async fn get<T: DeserializeOwned>(
        &self,
        target: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T, Error> {
        let load_failed = |reason: String| Error::DatasetLoadFailed {
            target: target.to_string(),
            reason,
        };
        request
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| load_failed(e.to_string()))?
            .json::<T>()
            .await
            .map_err(|e| load_failed(e.to_string()))
    }
}

#[async_trait]
impl DatasetProvider for HubDatasetProvider {
    async fn fetch_by_id(&self, id: &str, env: Environment) -> Result<Dataset, Error> {
        let url = format!("{}/{id}", self.datasets_url(env));
        debug!(%url, "fetching dataset");
        let one: HubOne = self.get(id, self.client.get(&url)).await?;
        let dataset = one.data.into_dataset();
        info!(id = %dataset.id, name = %dataset.name, %env, "dataset loaded");
        Ok(dataset)
    }

    async fn fetch_by_slug(&self, slug: &str, env: Environment) -> Result<Dataset, Error> {
        let request = self
            .client
            .get(self.datasets_url(env))
            .query(&[("filter[slug]", slug)]);
        let many: HubMany = self.get(slug, request).await?;
        let item = many
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::DatasetLoadFailed {
                target: slug.to_string(),
                reason: "no dataset with this slug".to_string(),
            })?;
        let dataset = item.into_dataset();
        info!(id = %dataset.id, slug, %env, "dataset loaded");
        Ok(dataset)
    }
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    error: Option<ServiceError>,
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    exceeded_transfer_limit: bool,
    #[serde(default)]
    count: Option<u64>,
    #[serde(default)]
    extent: Option<Extent>,
}

/// Queries against a feature service layer's `/query` endpoint.
///
/// The service has no binning endpoint, so [`QueryProvider::compute_histogram`]
/// reports [`QueryError::Unsupported`].
#[derive(Debug, Clone)]
pub struct FeatureServiceProvider {
    client: Client,
    query_url: String,
}

impl FeatureServiceProvider {
    /// Provider for the layer at `layer_url`.
    #[must_use]
    pub fn new(layer_url: &str) -> Self {
        Self {
            client: Client::new(),
            query_url: format!("{}/query", layer_url.trim_end_matches('/')),
        }
    }

    async fn query(&self, params: &[(&str, String)]) -> Result<QueryResponse, QueryError> {
        let response: QueryResponse = self
            .client
            .get(&self.query_url)
            .query(&[("f", "json"), ("returnGeometry", "false")])
            .query(params)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| QueryError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| QueryError::InvalidResponse(e.to_string()))?;
        response.into_result()
    }
}

impl QueryResponse {
    /// A service answers failures with HTTP 200 and an `error` body.
    fn into_result(mut self) -> Result<Self, QueryError> {
        match self.error.take() {
            Some(ServiceError { code, message }) => Err(QueryError::Service { code, message }),
            None => Ok(self),
        }
    }
}

fn out_fields(fields: &[String]) -> String {
    if fields.is_empty() {
        "*".to_string()
    } else {
        fields.join(",")
    }
}

#[async_trait]
impl QueryProvider for FeatureServiceProvider {
    async fn query_features(&self, query: &FeatureQuery) -> Result<FeatureSet, QueryError> {
        let mut params = vec![
            ("where", query.where_clause.clone()),
            ("outFields", out_fields(&query.out_fields)),
            ("returnDistinctValues", query.distinct.to_string()),
        ];
        if !query.order_by.is_empty() {
            params.push(("orderByFields", query.order_by.join(",")));
        }
        if let Some(limit) = query.limit {
            params.push(("resultRecordCount", limit.to_string()));
        }
        let response = self.query(&params).await?;
        Ok(FeatureSet {
            features: response.features,
            exceeded_transfer_limit: response.exceeded_transfer_limit,
        })
    }

    async fn query_feature_count(&self, where_clause: &str) -> Result<u64, QueryError> {
        let response = self
            .query(&[
                ("where", where_clause.to_string()),
                ("returnCountOnly", "true".to_string()),
            ])
            .await?;
        response
            .count
            .ok_or_else(|| QueryError::InvalidResponse("missing count".to_string()))
    }

    async fn query_extent(&self, where_clause: &str) -> Result<ExtentResult, QueryError> {
        let response = self
            .query(&[
                ("where", where_clause.to_string()),
                ("returnExtentOnly", "true".to_string()),
                ("returnCountOnly", "true".to_string()),
            ])
            .await?;
        Ok(ExtentResult {
            extent: response.extent.filter(|e| e.xmin.is_finite() && e.xmax.is_finite()),
            count: response.count.unwrap_or(0),
        })
    }

    async fn compute_histogram(
        &self,
        _request: &HistogramRequest<'_>,
    ) -> Result<Histogram, QueryError> {
        Err(QueryError::Unsupported(
            "feature service histograms".to_string(),
        ))
    }

    async fn compute_unique_values(&self, field: &str) -> Result<Vec<ValueCount>, QueryError> {
        let statistics = serde_json::json!([{
            "statisticType": "count",
            "onStatisticField": field,
            "outStatisticFieldName": "facetmap_count",
        }]);
        let response = self
            .query(&[
                ("where", "1=1".to_string()),
                ("groupByFieldsForStatistics", field.to_string()),
                ("outStatistics", statistics.to_string()),
            ])
            .await?;
        Ok(response
            .features
            .iter()
            .map(|f| {
                let count = f.get("facetmap_count").as_f64().unwrap_or(0.0);
                ValueCount::new(f.get(field).clone(), count as u64)
            })
            .collect())
    }
}
