//! Callable tools exposed over the JSON-RPC protocol.
//!
//! Every tool publishes a closed list of [`ParamSpec`] declarations. The same
//! declarations produce the `inputSchema` advertised by `tools/list` and gate
//! what a handler may read at call time: arguments are only reachable
//! through [`ToolArgs`], and asking it for a parameter the tool did not
//! declare is an error. The advertised schema and the consumed arguments
//! therefore cannot drift apart.
//!
//! # Built-in tools
//!
//! | Name | Parameters | Payload |
//! |------|------------|---------|
//! | `search_documents` | `query` (required), `size` = 10 | `{results, total, query}` |
//! | `get_document_by_id` | `document_id` (required) | the document, or `null` |
//! | `aggregate_by_category` | none | `{categories, total_categories}` |
//! | `list_recent_documents` | `limit` = 5 | `{recent_documents, count}` |
//!
//! `size` and `limit` are passed to the gateway as given; only the chat path
//! clamps its limit.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

use es_assistant_core::gateway::{GatewayError, SearchGateway, CATEGORY_FIELD};

// ═══════════════════════════════════════════════════════════════════════
// Parameter declarations
// ═══════════════════════════════════════════════════════════════════════

/// Primitive type of a tool parameter, as written in the JSON schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

/// One declared tool parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: ParamType,
    pub required: bool,
    /// Value used when an optional integer parameter is absent.
    pub default: Option<i64>,
}

/// Build `{"type":"object","properties":{..},"required":[..]}` from
/// parameter declarations.
pub fn schema_for(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    for param in params {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(param.kind.as_str()));
        property.insert("description".to_string(), json!(param.description));
        if let Some(default) = param.default {
            property.insert("default".to_string(), json!(default));
        }
        properties.insert(param.name.to_string(), Value::Object(property));
    }
    let required: Vec<&str> = params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name)
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Arguments
// ═══════════════════════════════════════════════════════════════════════

/// Argument validation failures. Reported to callers as `TOOL_ERROR`.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArgumentError {
    #[error("arguments must be a JSON object")]
    NotAnObject,
    #[error("missing required parameter: {0}")]
    Missing(&'static str),
    #[error("parameter '{name}' must be of type '{expected}', got {found}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("parameter '{0}' must not be negative")]
    Negative(&'static str),
    #[error("parameter '{0}' is not declared by this tool")]
    Undeclared(&'static str),
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Validated arguments of one tool call.
///
/// Values are looked up by [`ParamSpec`], never by raw key. Parameters not
/// declared by the tool are ignored at parse time and refused at lookup.
#[derive(Debug)]
pub struct ToolArgs {
    declared: &'static [ParamSpec],
    values: Map<String, Value>,
}

impl ToolArgs {
    /// Check `arguments` against `declared`.
    ///
    /// A missing or `null` arguments value counts as an empty object. A
    /// `null` parameter value counts as absent.
    pub fn parse(declared: &'static [ParamSpec], arguments: &Value) -> Result<Self, ArgumentError> {
        let supplied = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            _ => return Err(ArgumentError::NotAnObject),
        };

        let mut values = Map::new();
        for param in declared {
            match supplied.get(param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ArgumentError::Missing(param.name));
                    }
                }
                Some(value) => {
                    if !param.kind.accepts(value) {
                        return Err(ArgumentError::WrongType {
                            name: param.name,
                            expected: param.kind.as_str(),
                            found: json_type_name(value),
                        });
                    }
                    values.insert(param.name.to_string(), value.clone());
                }
            }
        }

        Ok(Self { declared, values })
    }

    fn lookup(&self, param: &ParamSpec) -> Result<Option<&Value>, ArgumentError> {
        if !self.declared.iter().any(|d| d.name == param.name) {
            return Err(ArgumentError::Undeclared(param.name));
        }
        Ok(self.values.get(param.name))
    }

    /// Read a string parameter. String parameters carry no default.
    pub fn string(&self, param: &ParamSpec) -> Result<String, ArgumentError> {
        match self.lookup(param)? {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(ArgumentError::WrongType {
                name: param.name,
                expected: ParamType::String.as_str(),
                found: json_type_name(other),
            }),
            None => Err(ArgumentError::Missing(param.name)),
        }
    }

    /// Read a non-negative integer parameter, falling back to its default.
    pub fn integer(&self, param: &ParamSpec) -> Result<usize, ArgumentError> {
        let raw = match self.lookup(param)? {
            Some(value) => {
                if let Some(n) = value.as_u64() {
                    return Ok(usize::try_from(n).unwrap_or(usize::MAX));
                }
                value.as_i64().ok_or(ArgumentError::WrongType {
                    name: param.name,
                    expected: ParamType::Integer.as_str(),
                    found: json_type_name(value),
                })?
            }
            None => param.default.ok_or(ArgumentError::Missing(param.name))?,
        };
        usize::try_from(raw).map_err(|_| ArgumentError::Negative(param.name))
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Tool trait
// ═══════════════════════════════════════════════════════════════════════

/// Tool execution failures. Reported to callers as `TOOL_ERROR`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything a tool may touch while executing.
#[derive(Clone)]
pub struct ToolContext {
    gateway: Arc<dyn SearchGateway>,
}

impl ToolContext {
    pub fn new(gateway: Arc<dyn SearchGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &dyn SearchGateway {
        self.gateway.as_ref()
    }
}

/// A named operation callable through `tools/call`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (e.g. `"search_documents"`).
    fn name(&self) -> &str;

    /// One-line description for `tools/list`.
    fn description(&self) -> &str;

    /// The closed list of parameters this tool reads.
    fn params(&self) -> &'static [ParamSpec];

    /// JSON schema advertised as `inputSchema`. Derived from [`Tool::params`].
    fn input_schema(&self) -> Value {
        schema_for(self.params())
    }

    /// Run the tool. The returned value becomes the text of the `content`
    /// envelope.
    async fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> Result<Value, ToolError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

pub const SEARCH_QUERY: ParamSpec = ParamSpec {
    name: "query",
    description: "Free-text search query",
    kind: ParamType::String,
    required: true,
    default: None,
};

pub const SEARCH_SIZE: ParamSpec = ParamSpec {
    name: "size",
    description: "Maximum number of results",
    kind: ParamType::Integer,
    required: false,
    default: Some(10),
};

pub const DOCUMENT_ID: ParamSpec = ParamSpec {
    name: "document_id",
    description: "Document ID",
    kind: ParamType::String,
    required: true,
    default: None,
};

pub const RECENT_LIMIT: ParamSpec = ParamSpec {
    name: "limit",
    description: "Number of documents to return",
    kind: ParamType::Integer,
    required: false,
    default: Some(5),
};

const SEARCH_PARAMS: &[ParamSpec] = &[SEARCH_QUERY, SEARCH_SIZE];
const GET_PARAMS: &[ParamSpec] = &[DOCUMENT_ID];
const RECENT_PARAMS: &[ParamSpec] = &[RECENT_LIMIT];

/// `search_documents`: multi-field relevance search.
pub struct SearchDocumentsTool;

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search documents in Elasticsearch using free text"
    }

    fn params(&self) -> &'static [ParamSpec] {
        SEARCH_PARAMS
    }

    async fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> Result<Value, ToolError> {
        let query = args.string(&SEARCH_QUERY)?;
        let size = args.integer(&SEARCH_SIZE)?;
        let results = ctx.gateway().search(&query, size).await?;
        Ok(json!({
            "total": results.len(),
            "results": results,
            "query": query,
        }))
    }
}

/// `get_document_by_id`: exact lookup; not found is a `null` payload.
pub struct GetDocumentByIdTool;

#[async_trait]
impl Tool for GetDocumentByIdTool {
    fn name(&self) -> &str {
        "get_document_by_id"
    }

    fn description(&self) -> &str {
        "Fetch a specific document by ID"
    }

    fn params(&self) -> &'static [ParamSpec] {
        GET_PARAMS
    }

    async fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> Result<Value, ToolError> {
        let id = args.string(&DOCUMENT_ID)?;
        let doc = ctx.gateway().get_by_id(&id).await?;
        Ok(serde_json::to_value(doc)?)
    }
}

/// `aggregate_by_category`: document count per category.
pub struct AggregateByCategoryTool;

#[async_trait]
impl Tool for AggregateByCategoryTool {
    fn name(&self) -> &str {
        "aggregate_by_category"
    }

    fn description(&self) -> &str {
        "Count documents per category"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &[]
    }

    async fn execute(&self, _args: ToolArgs, ctx: &ToolContext) -> Result<Value, ToolError> {
        let categories = ctx.gateway().aggregate_by_field(CATEGORY_FIELD).await?;
        Ok(json!({
            "total_categories": categories.len(),
            "categories": categories,
        }))
    }
}

/// `list_recent_documents`: newest documents first.
pub struct ListRecentDocumentsTool;

#[async_trait]
impl Tool for ListRecentDocumentsTool {
    fn name(&self) -> &str {
        "list_recent_documents"
    }

    fn description(&self) -> &str {
        "List the most recent documents"
    }

    fn params(&self) -> &'static [ParamSpec] {
        RECENT_PARAMS
    }

    async fn execute(&self, args: ToolArgs, ctx: &ToolContext) -> Result<Value, ToolError> {
        let limit = args.integer(&RECENT_LIMIT)?;
        let docs = ctx.gateway().list_recent(limit).await?;
        Ok(json!({
            "count": docs.len(),
            "recent_documents": docs,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use es_assistant_core::gateway::memory::InMemoryGateway;
    use es_assistant_core::models::Document;

    fn ctx() -> ToolContext {
        let mut a = Document::new("post_1", "Rust ownership");
        a.category = "blog_post".into();
        a.created_at = "2024-01-01T00:00:00".into();
        let mut b = Document::new("post_2", "Async Rust");
        b.category = "tutorial".into();
        b.created_at = "2024-03-01T00:00:00".into();
        ToolContext::new(Arc::new(InMemoryGateway::with_documents(
            "sample_data",
            vec![a, b],
        )))
    }

    #[test]
    fn test_schema_lists_required_and_defaults() {
        let schema = schema_for(SEARCH_PARAMS);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["query"]));
        assert_eq!(schema["properties"]["query"]["type"], "string");
        assert_eq!(schema["properties"]["size"]["type"], "integer");
        assert_eq!(schema["properties"]["size"]["default"], 10);
        assert!(schema["properties"]["query"].get("default").is_none());
    }

    #[test]
    fn test_defaults_only_on_optional_integers() {
        for param in SEARCH_PARAMS.iter().chain(GET_PARAMS).chain(RECENT_PARAMS) {
            if param.default.is_some() {
                assert_eq!(param.kind, ParamType::Integer, "{}", param.name);
                assert!(!param.required, "{}", param.name);
            }
        }
        let args = ToolArgs::parse(GET_PARAMS, &json!({ "document_id": "post_1" })).unwrap();
        assert_eq!(args.string(&DOCUMENT_ID).unwrap(), "post_1");
    }

    #[test]
    fn test_empty_schema() {
        let schema = schema_for(&[]);
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn test_parse_applies_defaults() {
        let args = ToolArgs::parse(SEARCH_PARAMS, &json!({ "query": "rust" })).unwrap();
        assert_eq!(args.string(&SEARCH_QUERY).unwrap(), "rust");
        assert_eq!(args.integer(&SEARCH_SIZE).unwrap(), 10);

        let args = ToolArgs::parse(RECENT_PARAMS, &Value::Null).unwrap();
        assert_eq!(args.integer(&RECENT_LIMIT).unwrap(), 5);
    }

    #[test]
    fn test_parse_rejects_missing_required() {
        let err = ToolArgs::parse(SEARCH_PARAMS, &json!({ "size": 3 })).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("query"));
        let err = ToolArgs::parse(GET_PARAMS, &json!({ "document_id": null })).unwrap_err();
        assert_eq!(err, ArgumentError::Missing("document_id"));
    }

    #[test]
    fn test_parse_rejects_wrong_types() {
        let err = ToolArgs::parse(SEARCH_PARAMS, &json!({ "query": "x", "size": "3" })).unwrap_err();
        assert_eq!(err.to_string(), "parameter 'size' must be of type 'integer', got string");
        let err = ToolArgs::parse(SEARCH_PARAMS, &json!({ "query": "x", "size": 2.5 })).unwrap_err();
        assert!(matches!(err, ArgumentError::WrongType { found: "number", .. }));
        let err = ToolArgs::parse(SEARCH_PARAMS, &json!(["query"])).unwrap_err();
        assert_eq!(err, ArgumentError::NotAnObject);
    }

    #[test]
    fn test_negative_integer() {
        let args = ToolArgs::parse(RECENT_PARAMS, &json!({ "limit": -1 })).unwrap();
        assert_eq!(args.integer(&RECENT_LIMIT).unwrap_err(), ArgumentError::Negative("limit"));
    }

    #[test]
    fn test_undeclared_lookup_refused() {
        let args = ToolArgs::parse(RECENT_PARAMS, &json!({ "limit": 2, "query": "x" })).unwrap();
        assert_eq!(
            args.string(&SEARCH_QUERY).unwrap_err(),
            ArgumentError::Undeclared("query")
        );
    }

    #[tokio::test]
    async fn test_search_tool_payload() {
        let args = ToolArgs::parse(SEARCH_PARAMS, &json!({ "query": "rust", "size": 1 })).unwrap();
        let out = SearchDocumentsTool.execute(args, &ctx()).await.unwrap();
        assert_eq!(out["total"], 1);
        assert_eq!(out["query"], "rust");
        assert_eq!(out["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_tool_not_found_is_null() {
        let args = ToolArgs::parse(GET_PARAMS, &json!({ "document_id": "post_99" })).unwrap();
        let out = GetDocumentByIdTool.execute(args, &ctx()).await.unwrap();
        assert!(out.is_null());
    }

    #[tokio::test]
    async fn test_aggregate_tool_payload() {
        let args = ToolArgs::parse(&[], &json!({})).unwrap();
        let out = AggregateByCategoryTool.execute(args, &ctx()).await.unwrap();
        assert_eq!(out["total_categories"], 2);
        assert_eq!(out["categories"]["blog_post"], 1);
    }

    #[tokio::test]
    async fn test_recent_tool_orders_newest_first() {
        let args = ToolArgs::parse(RECENT_PARAMS, &json!({})).unwrap();
        let out = ListRecentDocumentsTool.execute(args, &ctx()).await.unwrap();
        assert_eq!(out["count"], 2);
        assert_eq!(out["recent_documents"][0]["id"], "post_2");
    }
}
