//! JSON-RPC protocol representations
//!
//! Parses inbound envelopes into [`RpcRequest`] and maps every failure of the MCP endpoint
//! onto an HTTP status and a JSON-RPC error object via [`RpcFailure`].

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{auth::AuthRejection, domain::tools::RegisteredTool, mcp::server::McpMethod};

pub const JSONRPC_VERSION: &str = "2.0";

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
pub const UNAUTHORIZED: i32 = -32001;

#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// `None` when the `id` key is absent, which marks a notification.
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

impl RpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// A rejected envelope, with whatever id could still be recovered from it.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidEnvelope {
    pub id: Value,
}

pub fn parse_request(body: &[u8]) -> Result<RpcRequest, InvalidEnvelope> {
    let Ok(Value::Object(mut object)) = serde_json::from_slice::<Value>(body) else {
        return Err(InvalidEnvelope { id: Value::Null });
    };

    let id = match object.remove("id") {
        None => None,
        Some(id @ (Value::Null | Value::String(_) | Value::Number(_))) => Some(id),
        Some(_) => return Err(InvalidEnvelope { id: Value::Null }),
    };
    let invalid = || InvalidEnvelope {
        id: id.clone().unwrap_or(Value::Null),
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid());
    }

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => method,
        _ => return Err(invalid()),
    };

    Ok(RpcRequest {
        id,
        method,
        params: object.remove("params"),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,
    #[serde(flatten)]
    pub payload: RpcPayload,
    pub id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcPayload {
    Result(Value),
    Error(RpcError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: RpcPayload::Result(result),
            id,
        }
    }

    pub fn error(id: Value, error: RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            payload: RpcPayload::Error(error),
            id,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.payload, RpcPayload::Error(_))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcFailure {
    #[error("request is not a JSON-RPC 2.0 envelope")]
    InvalidRequest,
    #[error("HTTP method not allowed")]
    MethodNotAllowed,
    #[error("authentication required")]
    AuthenticationRequired {
        challenge: String,
        issuer_domain: String,
        audience: String,
    },
    #[error("invalid token")]
    InvalidToken,
    #[error("unknown tool {requested:?}")]
    UnknownTool { requested: Option<String> },
    #[error("method {0} not found")]
    MethodNotFound(String),
    #[error("server configuration error")]
    Misconfigured,
    #[error("internal error: {0}")]
    Internal(String),
}

impl RpcFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest | Self::UnknownTool { .. } | Self::MethodNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::AuthenticationRequired { .. } | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::Misconfigured | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::InvalidRequest | Self::MethodNotAllowed => INVALID_REQUEST,
            Self::AuthenticationRequired { .. } | Self::InvalidToken => UNAUTHORIZED,
            Self::UnknownTool { .. } => INVALID_PARAMS,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::Misconfigured | Self::Internal(_) => INTERNAL_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "Invalid Request - not JSON-RPC 2.0",
            Self::MethodNotAllowed => "Method not allowed",
            Self::AuthenticationRequired { .. } => "Authentication required",
            Self::InvalidToken => "Invalid token",
            Self::UnknownTool { .. } => "Invalid tool name",
            Self::MethodNotFound(_) => "Method not found",
            Self::Misconfigured => "Server configuration error",
            Self::Internal(_) => "Internal error",
        }
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Self::AuthenticationRequired {
                issuer_domain,
                audience,
                ..
            } => Some(json!({
                "auth0_domain": issuer_domain,
                "audience": audience,
            })),
            Self::UnknownTool { .. } => Some(json!({
                "available_tools": RegisteredTool::names(),
            })),
            Self::MethodNotFound(method) => Some(json!({
                "available_methods": McpMethod::names(),
                "requested_method": method,
            })),
            Self::Internal(error) => Some(json!({ "error": error })),
            Self::InvalidRequest
            | Self::MethodNotAllowed
            | Self::InvalidToken
            | Self::Misconfigured => None,
        }
    }

    /// Only a missing credential advertises where to obtain one.
    pub fn www_authenticate(&self) -> Option<&str> {
        match self {
            Self::AuthenticationRequired { challenge, .. } => Some(challenge.as_str()),
            _ => None,
        }
    }

    pub fn to_rpc_error(&self) -> RpcError {
        RpcError {
            code: self.code(),
            message: self.message().to_string(),
            data: self.data(),
        }
    }
}

impl From<AuthRejection> for RpcFailure {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Misconfigured => Self::Misconfigured,
            AuthRejection::MissingCredentials {
                challenge,
                issuer_domain,
                audience,
            } => Self::AuthenticationRequired {
                challenge,
                issuer_domain,
                audience,
            },
            AuthRejection::InvalidToken => Self::InvalidToken,
        }
    }
}
