//! JSON-RPC style wire types.
//!
//! # Envelope
//!
//! ```json
//! // request
//! { "jsonrpc": "2.0", "method": "tools/call", "params": { "name": "...", "arguments": {} }, "id": 7 }
//! // response (success and failure alike)
//! { "jsonrpc": "2.0", "id": 7, "result": { ... } }
//! ```
//!
//! Failures are not JSON-RPC `error` members: they travel inside `result`
//! as `{ "error": { "code": "UNKNOWN_TOOL", "message": "..." } }`. The `id`
//! is echoed unmodified, whatever its JSON type.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use es_assistant_core::gateway::GatewayError;

use crate::tools::ToolError;

/// Protocol version reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "elasticsearch-mcp-server";

pub const JSONRPC_VERSION: &str = "2.0";

/// An incoming request. `params` and `id` default to `null` when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: method.into(),
            params,
            id,
        }
    }

    /// A string member of `params`, or `None` if absent or not a string.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// An outgoing response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    pub result: Value,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
        }
    }

    pub fn failure(id: Value, error: &DispatchError) -> Self {
        Self::success(id, error.to_payload())
    }

    /// The error code carried in `result.error.code`, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.result.pointer("/error/code").and_then(Value::as_str)
    }
}

/// Recognized methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "tools/list" => Some(Method::ToolsList),
            "tools/call" => Some(Method::ToolsCall),
            "resources/list" => Some(Method::ResourcesList),
            "resources/read" => Some(Method::ResourcesRead),
            _ => None,
        }
    }
}

// ============ Errors ============

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MethodNotFound,
    UnknownTool,
    ToolError,
    ResourceNotFound,
    ResourceError,
    ParseError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MethodNotFound => "METHOD_NOT_FOUND",
            ErrorCode::UnknownTool => "UNKNOWN_TOOL",
            ErrorCode::ToolError => "TOOL_ERROR",
            ErrorCode::ResourceNotFound => "RESOURCE_NOT_FOUND",
            ErrorCode::ResourceError => "RESOURCE_ERROR",
            ErrorCode::ParseError => "PARSE_ERROR",
        }
    }
}

/// Every way a request can fail. Each variant maps to one [`ErrorCode`].
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Method '{0}' not found")]
    MethodNotFound(String),
    #[error("Tool '{0}' not found")]
    UnknownTool(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Resource '{0}' not found")]
    ResourceNotFound(String),
    #[error(transparent)]
    Resource(GatewayError),
    #[error("invalid request: {0}")]
    Parse(String),
}

impl DispatchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            DispatchError::UnknownTool(_) => ErrorCode::UnknownTool,
            DispatchError::Tool(_) => ErrorCode::ToolError,
            DispatchError::ResourceNotFound(_) => ErrorCode::ResourceNotFound,
            DispatchError::Resource(_) => ErrorCode::ResourceError,
            DispatchError::Parse(_) => ErrorCode::ParseError,
        }
    }

    /// `{ "error": { "code": ..., "message": ... } }`
    pub fn to_payload(&self) -> Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
    }
}

// ============ Payload envelopes ============

/// Pretty-printed JSON text, as embedded in content envelopes.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// `{ "content": [ { "type": "text", "text": ... } ] }`
pub fn text_content(text: String) -> Value {
    json!({
        "content": [
            { "type": "text", "text": text }
        ]
    })
}

/// `{ "contents": [ { "uri": ..., "mimeType": ..., "text": ... } ] }`
pub fn resource_contents(uri: &str, mime_type: &str, text: String) -> Value {
    json!({
        "contents": [
            { "uri": uri, "mimeType": mime_type, "text": text }
        ]
    })
}

/// The `initialize` payload.
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": true,
            "resources": true,
            "prompts": false,
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
