//! The central Model Context Protocol engine
//!
//! Every request makes a single pass through HTTP method preflight, envelope validation,
//! the per-method auth gate and method dispatch, ending in exactly one [`McpReply`].

use std::panic::{self, AssertUnwindSafe};

use axum::{
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ListToolsResult, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};
use tracing::{debug, error, info};

use crate::{
    auth::authenticate,
    domain::tools::{build_tools_list, handle_tools_call},
    mcp::rpc::{parse_request, InvalidEnvelope, RpcFailure, RpcRequest, RpcResponse},
    AppState,
};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, IntoStaticStr)]
pub enum McpMethod {
    #[strum(serialize = "initialize")]
    Initialize,
    #[strum(serialize = "initialized")]
    Initialized,
    #[strum(serialize = "ping")]
    Ping,
    #[strum(serialize = "tools/list")]
    ToolsList,
    #[strum(serialize = "tools/call")]
    ToolsCall,
}

impl McpMethod {
    pub fn parse(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn names() -> Vec<&'static str> {
        Self::iter().map(Self::name).collect()
    }

    /// Methods that need a verified caller. Only `tools/call` reaches a tool.
    pub fn requires_auth(self) -> bool {
        match self {
            Self::ToolsCall => true,
            Self::Initialize | Self::Initialized | Self::Ping | Self::ToolsList => false,
        }
    }
}

/// Informational answer to `GET /mcp`; not a JSON-RPC envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    pub transport: &'static str,
    pub capabilities: DescriptorCapabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorCapabilities {
    pub tools: bool,
}

impl CapabilityDescriptor {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            transport: "http",
            capabilities: DescriptorCapabilities { tools: true },
        }
    }
}

#[derive(Debug)]
pub enum McpReply {
    /// 200 with no body: CORS preflight or a handled notification.
    Empty,
    Descriptor(CapabilityDescriptor),
    Envelope {
        status: StatusCode,
        response: RpcResponse,
        www_authenticate: Option<String>,
    },
}

impl McpReply {
    fn success(id: Value, result: Value) -> Self {
        Self::Envelope {
            status: StatusCode::OK,
            response: RpcResponse::result(id, result),
            www_authenticate: None,
        }
    }

    fn failure(id: Value, failure: RpcFailure) -> Self {
        Self::Envelope {
            status: failure.status(),
            www_authenticate: failure.www_authenticate().map(str::to_string),
            response: RpcResponse::error(id, failure.to_rpc_error()),
        }
    }
}

impl IntoResponse for McpReply {
    fn into_response(self) -> Response {
        match self {
            Self::Empty => StatusCode::OK.into_response(),
            Self::Descriptor(descriptor) => (StatusCode::OK, Json(descriptor)).into_response(),
            Self::Envelope {
                status,
                response,
                www_authenticate,
            } => {
                let mut http_response = (status, Json(response)).into_response();
                if let Some(challenge) =
                    www_authenticate.and_then(|value| HeaderValue::from_str(&value).ok())
                {
                    http_response
                        .headers_mut()
                        .insert(header::WWW_AUTHENTICATE, challenge);
                }
                http_response
            }
        }
    }
}

pub async fn handle_mcp_request(
    state: &AppState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> McpReply {
    if *method == Method::OPTIONS {
        return McpReply::Empty;
    }
    if *method == Method::GET {
        return McpReply::Descriptor(CapabilityDescriptor::current());
    }
    if *method != Method::POST {
        return McpReply::failure(Value::Null, RpcFailure::MethodNotAllowed);
    }

    let request = match parse_request(body) {
        Ok(request) => request,
        Err(InvalidEnvelope { id }) => return McpReply::failure(id, RpcFailure::InvalidRequest),
    };

    let known_method = McpMethod::parse(&request.method);
    if known_method.is_some_and(McpMethod::requires_auth) {
        if let Err(rejection) =
            authenticate(state.oauth.as_deref(), state.verifier.as_ref(), headers).await
        {
            return McpReply::failure(request.response_id(), rejection.into());
        }
    }

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(known_method, &request)))
        .unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            error!(method = %request.method, error = %message, "mcp method handler panicked");
            Err(RpcFailure::Internal(message))
        });

    audit(&request, &outcome);

    if request.is_notification() {
        if let Err(failure) = &outcome {
            debug!(method = %request.method, error = %failure, "notification failed without reply");
        }
        return McpReply::Empty;
    }

    match outcome {
        Ok(result) => McpReply::success(request.response_id(), result),
        Err(failure) => McpReply::failure(request.response_id(), failure),
    }
}

fn dispatch(method: Option<McpMethod>, request: &RpcRequest) -> Result<Value, RpcFailure> {
    let Some(method) = method else {
        return Err(RpcFailure::MethodNotFound(request.method.clone()));
    };

    match method {
        McpMethod::Initialize => to_result(initialize_result()),
        McpMethod::Initialized | McpMethod::Ping => Ok(json!({})),
        McpMethod::ToolsList => to_result(ListToolsResult {
            meta: None,
            next_cursor: None,
            tools: build_tools_list(),
        }),
        McpMethod::ToolsCall => handle_tools_call(request.params.as_ref()),
    }
}

pub fn initialize_result() -> InitializeResult {
    InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            logging: Some(Map::new()),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: None,
        meta: None,
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, RpcFailure> {
    serde_json::to_value(value).map_err(|err| RpcFailure::Internal(err.to_string()))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "method handler panicked".to_string())
}

fn audit(request: &RpcRequest, outcome: &Result<Value, RpcFailure>) {
    info!(
        method = %request.method,
        params = %redact_audit_params(request.params.as_ref()),
        notification = request.is_notification(),
        outcome = if outcome.is_ok() { "success" } else { "failure" },
        "mcp action audited"
    );
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "api_key" | "apikey" | "jwt"
    ) || ["token", "secret", "password", "credential"]
        .iter()
        .any(|fragment| normalized.contains(fragment))
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;
    use serde_json::json;

    use super::*;

    #[test]
    fn only_tools_call_requires_auth() {
        let gated: Vec<_> = McpMethod::iter()
            .filter(|method| method.requires_auth())
            .collect();
        assert_eq!(gated, vec![McpMethod::ToolsCall]);
    }

    #[test]
    fn method_names_round_trip_through_the_registry() {
        assert_eq!(
            McpMethod::names(),
            vec!["initialize", "initialized", "ping", "tools/list", "tools/call"]
        );
        assert_eq!(McpMethod::parse("tools/call"), Some(McpMethod::ToolsCall));
        assert_eq!(McpMethod::parse("resources/call"), None);
        assert_eq!(McpMethod::parse("Tools/Call"), None);
    }

    #[test]
    fn initialize_declares_tools_and_logging() {
        let result = serde_json::to_value(initialize_result()).expect("initialize serializes");

        assert_eq!(result["protocolVersion"], SUPPORTED_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], env!("CARGO_PKG_NAME"));
        assert_eq!(result["serverInfo"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["logging"].is_object());
        assert!(result["capabilities"]["resources"].is_null());
    }

    #[test]
    fn unknown_method_reports_available_methods() {
        let request = RpcRequest {
            id: Some(json!(9)),
            method: "resources/list".to_string(),
            params: None,
        };

        let err = dispatch(McpMethod::parse(&request.method), &request)
            .expect_err("unknown method fails");
        let data = err.data().expect("method not found carries data");
        assert_eq!(data["requested_method"], "resources/list");
        assert_eq!(data["available_methods"].as_array().map(Vec::len), Some(5));
    }

    #[test]
    fn redacts_sensitive_fields_in_audit_params() {
        let params = json!({
            "name": "get_random_joke",
            "arguments": {
                "topic": "rust",
                "access_token": "should-not-appear",
                "api_key": "should-not-appear",
                "nested": {
                    "client_secret": "should-not-appear"
                }
            }
        });

        let redacted = redact_audit_params(Some(&params));

        assert_eq!(redacted["name"], json!("get_random_joke"));
        assert_eq!(redacted["arguments"]["topic"], json!("rust"));
        assert_eq!(redacted["arguments"]["access_token"], json!("[REDACTED]"));
        assert_eq!(redacted["arguments"]["api_key"], json!("[REDACTED]"));
        assert_eq!(
            redacted["arguments"]["nested"]["client_secret"],
            json!("[REDACTED]")
        );
    }

    #[tokio::test]
    async fn internal_failure_renders_server_error_envelope() {
        let response = McpReply::failure(json!(11), RpcFailure::Internal("boom".to_string()))
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
        let body = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        let body: Value = serde_json::from_slice(&body).expect("json body");
        assert_eq!(body["error"]["code"], -32603);
        assert_eq!(body["error"]["data"]["error"], "boom");
        assert_eq!(body["id"], 11);
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("tool exploded");
        assert_eq!(panic_message(payload.as_ref()), "tool exploded");

        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("formatted panic"));
        assert_eq!(panic_message(payload.as_ref()), "formatted panic");

        let payload: Box<dyn std::any::Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "method handler panicked");
    }
}
