//! Request routing for the tool protocol.
//!
//! [`Dispatcher`] holds no per-message state: each request is routed,
//! executed against the gateway and answered before the transport reads
//! the next one. Every failure, including malformed input, becomes a
//! structured error in the response; nothing escapes to the transport.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use es_assistant_core::gateway::{SearchGateway, CATEGORY_FIELD};

use crate::catalog::{ResourceFacet, ToolCatalog};
use crate::protocol::{
    initialize_result, pretty, resource_contents, text_content, DispatchError, Method, RpcRequest,
    RpcResponse,
};
use crate::tools::{ToolArgs, ToolContext, ToolError};

/// Routes protocol requests to catalog entries.
#[derive(Clone)]
pub struct Dispatcher {
    catalog: Arc<ToolCatalog>,
    ctx: ToolContext,
}

impl Dispatcher {
    pub fn new(catalog: Arc<ToolCatalog>, gateway: Arc<dyn SearchGateway>) -> Self {
        Self {
            catalog,
            ctx: ToolContext::new(gateway),
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Answer one request. Never fails; errors are carried in the response.
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        debug!(method = %request.method, id = %request.id, "dispatch");
        match self.route(&request).await {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(err) => {
                warn!(
                    method = %request.method,
                    code = err.code().as_str(),
                    error = %err,
                    "request failed"
                );
                RpcResponse::failure(request.id, &err)
            }
        }
    }

    /// Parse one line of input and answer it.
    ///
    /// Input that is not JSON, or JSON that is not an object, yields
    /// `PARSE_ERROR` with a `null` id. An object without a string `method`
    /// is an unknown method and yields `METHOD_NOT_FOUND`. Any other
    /// malformed object (e.g. a non-string `jsonrpc`) yields `PARSE_ERROR`.
    /// Both echo the object's `id` member when present.
    pub async fn dispatch_line(&self, line: &str) -> RpcResponse {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "unparseable request");
                return RpcResponse::failure(Value::Null, &DispatchError::Parse(e.to_string()));
            }
        };
        let Some(object) = value.as_object() else {
            warn!("request is not a JSON object");
            return RpcResponse::failure(
                Value::Null,
                &DispatchError::Parse("request must be a JSON object".to_string()),
            );
        };
        let id = object.get("id").cloned().unwrap_or(Value::Null);

        match object.get("method") {
            Some(Value::String(_)) => {}
            Some(Value::Null) | None => {
                let err = DispatchError::MethodNotFound(String::new());
                warn!(code = err.code().as_str(), "request without method");
                return RpcResponse::failure(id, &err);
            }
            Some(other) => {
                let err = DispatchError::MethodNotFound(other.to_string());
                warn!(code = err.code().as_str(), "request with non-string method");
                return RpcResponse::failure(id, &err);
            }
        }

        match serde_json::from_value::<RpcRequest>(value) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => {
                warn!(error = %e, "malformed request");
                RpcResponse::failure(id, &DispatchError::Parse(e.to_string()))
            }
        }
    }

    async fn route(&self, request: &RpcRequest) -> Result<Value, DispatchError> {
        let method = Method::parse(&request.method)
            .ok_or_else(|| DispatchError::MethodNotFound(request.method.clone()))?;

        match method {
            Method::Initialize => Ok(initialize_result()),
            Method::ToolsList => Ok(self.list_tools()),
            Method::ToolsCall => {
                let name = request.param_str("name").unwrap_or_default();
                let arguments = request.params.get("arguments").unwrap_or(&Value::Null);
                self.call_tool(name, arguments).await
            }
            Method::ResourcesList => Ok(json!({ "resources": self.catalog.resources() })),
            Method::ResourcesRead => {
                let uri = request.param_str("uri").unwrap_or_default();
                self.read_resource(uri).await
            }
        }
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .catalog
            .tools()
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "inputSchema": t.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    /// Execute a tool and wrap its payload in a `content` envelope.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value, DispatchError> {
        let tool = self
            .catalog
            .find_tool(name)
            .ok_or_else(|| DispatchError::UnknownTool(name.to_string()))?;
        let args = ToolArgs::parse(tool.params(), arguments).map_err(ToolError::from)?;
        let payload = tool.execute(args, &self.ctx).await?;
        Ok(text_content(pretty(&payload)))
    }

    /// Read a resource and wrap it in a `contents` envelope.
    pub async fn read_resource(&self, uri: &str) -> Result<Value, DispatchError> {
        let resource = self
            .catalog
            .find_resource(uri)
            .ok_or_else(|| DispatchError::ResourceNotFound(uri.to_string()))?;
        let gateway = self.ctx.gateway();

        let body = match resource.facet {
            ResourceFacet::Stats => {
                let stats = gateway
                    .index_stats()
                    .await
                    .map_err(DispatchError::Resource)?;
                let categories = gateway
                    .aggregate_by_field(CATEGORY_FIELD)
                    .await
                    .map_err(DispatchError::Resource)?;
                json!({
                    "index": gateway.index_name(),
                    "document_count": stats.document_count,
                    "size_in_bytes": stats.size_in_bytes,
                    "categories": categories,
                })
            }
            ResourceFacet::Schema => gateway
                .field_mapping()
                .await
                .map_err(DispatchError::Resource)?,
        };

        Ok(resource_contents(
            &resource.uri,
            &resource.mime_type,
            pretty(&body),
        ))
    }
}
