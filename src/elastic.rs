//! Elasticsearch implementation of [`SearchGateway`].
//!
//! Talks to the REST API with `reqwest`. Each operation is a single HTTP
//! request; there is no retry. Failures map onto [`GatewayError`]:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | connect failure, timeout | [`GatewayError::Unavailable`] |
//! | non-2xx status, JSON or not | [`GatewayError::Backend`] (with `error.reason` when present) |
//! | unexpected 2xx body shape | [`GatewayError::Decode`] |
//!
//! `GET /{index}/_doc/{id}` answering `found: false` (or a bare 404) is
//! reported as `Ok(None)`. A 404 carrying an `error` object, such as
//! `index_not_found_exception`, is a [`GatewayError::Backend`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use es_assistant_core::gateway::{FieldCounts, GatewayError, SearchGateway};
use es_assistant_core::models::{Document, IndexStats};

use crate::config::ElasticsearchConfig;

/// Fields searched by [`SearchGateway::search`]; the title counts double.
pub const SEARCH_FIELDS: [&str; 3] = ["title^2", "content", "tags"];

/// Gateway to one Elasticsearch index.
pub struct ElasticsearchGateway {
    client: Client,
    base_url: Url,
    index: String,
    max_buckets: usize,
}

impl ElasticsearchGateway {
    pub fn new(config: &ElasticsearchConfig) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| GatewayError::Unavailable(format!("invalid url '{}': {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Unavailable(format!(
                "invalid url '{}': not a base url",
                config.url
            )));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            index: config.index.clone(),
            max_buckets: config.max_buckets,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(segments);
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> Result<(StatusCode, Value), GatewayError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;
        if text.trim().is_empty() {
            return Ok((status, Value::Null));
        }
        let body = match serde_json::from_str(&text) {
            Ok(body) => body,
            // error pages from proxies are not JSON; the status still counts
            Err(_) if !status.is_success() => Value::Null,
            Err(e) => return Err(GatewayError::Decode(e.to_string())),
        };
        Ok((status, body))
    }

    async fn request_json(&self, request: RequestBuilder) -> Result<Value, GatewayError> {
        let (status, body) = self.send(request).await?;
        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        Ok(body)
    }

    async fn search_hits(&self, body: Value) -> Result<Vec<Document>, GatewayError> {
        debug!(index = %self.index, query = %body, "search request");
        let url = self.endpoint(&[&self.index, "_search"]);
        let response = self.request_json(self.client.post(url).json(&body)).await?;
        parse_hits(&response)
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Unavailable(format!("request timed out: {}", err))
    } else if err.is_connect() {
        GatewayError::Unavailable(format!("connection failed: {}", err))
    } else {
        GatewayError::Unavailable(err.to_string())
    }
}

fn backend_error(status: StatusCode, body: &Value) -> GatewayError {
    let message = body
        .pointer("/error/reason")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| body.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
    GatewayError::Backend {
        status: status.as_u16(),
        message,
    }
}

/// Decode `hits.hits[]._source` into documents.
fn parse_hits(response: &Value) -> Result<Vec<Document>, GatewayError> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Decode("missing hits.hits".to_string()))?;
    hits.iter()
        .map(|hit| {
            let source = hit
                .get("_source")
                .cloned()
                .ok_or_else(|| GatewayError::Decode("hit without _source".to_string()))?;
            serde_json::from_value(source).map_err(|e| GatewayError::Decode(e.to_string()))
        })
        .collect()
}

/// Decode `aggregations.<name>.buckets[]` into value counts.
fn parse_buckets(response: &Value, name: &str) -> Result<FieldCounts, GatewayError> {
    let buckets = response
        .get("aggregations")
        .and_then(|a| a.get(name))
        .and_then(|a| a.get("buckets"))
        .and_then(Value::as_array)
        .ok_or_else(|| GatewayError::Decode(format!("missing aggregations.{}.buckets", name)))?;

    let mut counts = FieldCounts::new();
    for bucket in buckets {
        let key = match bucket.get("key") {
            Some(Value::String(s)) => s.clone(),
            Some(other) if !other.is_null() => other.to_string(),
            _ => return Err(GatewayError::Decode("bucket without key".to_string())),
        };
        let count = bucket
            .get("doc_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::Decode("bucket without doc_count".to_string()))?;
        if count > 0 {
            counts.insert(key, count);
        }
    }
    Ok(counts)
}

#[async_trait]
impl SearchGateway for ElasticsearchGateway {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Document>, GatewayError> {
        self.search_hits(json!({
            "query": {
                "multi_match": {
                    "query": text,
                    "fields": SEARCH_FIELDS,
                    "type": "best_fields"
                }
            },
            "size": limit
        }))
        .await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, GatewayError> {
        debug!(index = %self.index, id, "get request");
        let url = self.endpoint(&[&self.index, "_doc", id]);
        let (status, body) = self.send(self.client.get(url)).await?;
        let found = body.get("found").and_then(Value::as_bool);
        if found == Some(false) {
            return Ok(None);
        }
        // a 404 with an error body is a missing index, not a missing document
        if status == StatusCode::NOT_FOUND && body.get("error").is_none() {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(backend_error(status, &body));
        }
        let source = body
            .get("_source")
            .cloned()
            .ok_or_else(|| GatewayError::Decode("document without _source".to_string()))?;
        serde_json::from_value(source)
            .map(Some)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn aggregate_by_field(&self, field: &str) -> Result<FieldCounts, GatewayError> {
        let body = json!({
            "size": 0,
            "aggs": {
                "values": {
                    "terms": { "field": field, "size": self.max_buckets }
                }
            }
        });
        debug!(index = %self.index, field, "aggregation request");
        let url = self.endpoint(&[&self.index, "_search"]);
        let response = self.request_json(self.client.post(url).json(&body)).await?;
        parse_buckets(&response, "values")
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Document>, GatewayError> {
        self.search_hits(json!({
            "query": { "match_all": {} },
            "sort": [ { "created_at": { "order": "desc" } } ],
            "size": limit
        }))
        .await
    }

    async fn index_stats(&self) -> Result<IndexStats, GatewayError> {
        let url = self.endpoint(&[&self.index, "_stats"]);
        let body = self.request_json(self.client.get(url)).await?;
        let primaries = body
            .pointer("/_all/primaries")
            .ok_or_else(|| GatewayError::Decode("missing _all.primaries".to_string()))?;
        let document_count = primaries
            .pointer("/docs/count")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::Decode("missing docs.count".to_string()))?;
        let size_in_bytes = primaries
            .pointer("/store/size_in_bytes")
            .and_then(Value::as_u64)
            .ok_or_else(|| GatewayError::Decode("missing store.size_in_bytes".to_string()))?;
        Ok(IndexStats {
            document_count,
            size_in_bytes,
        })
    }

    async fn field_mapping(&self) -> Result<Value, GatewayError> {
        let url = self.endpoint(&[&self.index, "_mapping"]);
        let body = self.request_json(self.client.get(url)).await?;
        body.get(&self.index)
            .cloned()
            .ok_or_else(|| GatewayError::Decode(format!("no mapping for index '{}'", self.index)))
    }

    async fn ping(&self) -> Result<String, GatewayError> {
        let body = self
            .request_json(self.client.get(self.base_url.clone()))
            .await?;
        let version = body
            .pointer("/version/number")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Decode("missing version.number".to_string()))?;
        Ok(format!("Elasticsearch {}", version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(url: &str) -> ElasticsearchGateway {
        ElasticsearchGateway::new(&ElasticsearchConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let gw = gateway("http://localhost:9200");
        assert_eq!(
            gw.endpoint(&["sample_data", "_doc", "post_1"]).as_str(),
            "http://localhost:9200/sample_data/_doc/post_1"
        );
        let gw = gateway("http://proxy.local/es/");
        assert_eq!(
            gw.endpoint(&["sample_data", "_search"]).as_str(),
            "http://proxy.local/es/sample_data/_search"
        );
    }

    #[test]
    fn test_endpoint_escapes_ids() {
        let gw = gateway("http://localhost:9200");
        let url = gw.endpoint(&["sample_data", "_doc", "a/b c"]);
        assert_eq!(url.path(), "/sample_data/_doc/a%2Fb%20c");
    }

    #[test]
    fn test_rejects_invalid_url() {
        let err = ElasticsearchGateway::new(&ElasticsearchConfig {
            url: "not a url".to_string(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, GatewayError::Unavailable(_)));
    }

    #[test]
    fn test_parse_hits() {
        let response = json!({
            "hits": { "hits": [
                { "_id": "post_1", "_source": { "id": "post_1", "title": "a" } },
                { "_id": "post_2", "_source": { "id": "post_2", "title": "b" } }
            ] }
        });
        let docs = parse_hits(&response).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].title, "b");
        assert!(parse_hits(&json!({})).is_err());
    }

    #[test]
    fn test_parse_buckets_skips_zero_counts() {
        let response = json!({
            "aggregations": { "values": { "buckets": [
                { "key": "blog_post", "doc_count": 20 },
                { "key": 7, "doc_count": 2 },
                { "key": "empty", "doc_count": 0 }
            ] } }
        });
        let counts = parse_buckets(&response, "values").unwrap();
        assert_eq!(counts.get("blog_post"), Some(&20));
        assert_eq!(counts.get("7"), Some(&2));
        assert!(!counts.contains_key("empty"));
    }

    #[test]
    fn test_backend_error_prefers_reason() {
        let err = backend_error(
            StatusCode::BAD_REQUEST,
            &json!({ "error": { "reason": "no such index [x]" }, "status": 400 }),
        );
        assert_eq!(err.to_string(), "backend error (HTTP 400): no such index [x]");

        let err = backend_error(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        assert_eq!(
            err.to_string(),
            "backend error (HTTP 500): Internal Server Error"
        );
    }
}
