//! Axum HTTP handlers for the web server
//!
//! Provides the primary Model Context Protocol endpoint, the REST tool endpoint, and the
//! metadata documents clients use for discovery.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use rust_mcp_sdk::schema::Tool;
use serde::{Deserialize, Serialize};

use crate::{
    auth::authenticate,
    domain::tools::{build_tools_list, RegisteredTool},
    errors::AppError,
    mcp::server::{handle_mcp_request, DescriptorCapabilities, SUPPORTED_PROTOCOL_VERSION},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServerManifest {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub protocol_version: &'static str,
    pub endpoints: ManifestEndpoints,
    pub oauth: Option<ManifestOAuth>,
    pub capabilities: DescriptorCapabilities,
    pub tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
pub struct ManifestEndpoints {
    pub jsonrpc: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestOAuth {
    pub authorization_url: String,
    pub token_url: String,
    pub audience: String,
    pub scopes: Vec<String>,
}

/// OAuth 2.0 Protected Resource Metadata (RFC 9728).
#[derive(Debug, Serialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub tool: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResponse {
    pub success: bool,
    pub tool: &'static str,
    pub joke: String,
    pub user: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery(State(state): State<AppState>, headers: HeaderMap) -> Json<ServerManifest> {
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");

    Json(ServerManifest {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        description: "MCP server providing random programming jokes",
        protocol_version: SUPPORTED_PROTOCOL_VERSION,
        endpoints: ManifestEndpoints {
            jsonrpc: format!("https://{host}/mcp"),
        },
        oauth: state.oauth.as_deref().map(|settings| ManifestOAuth {
            authorization_url: settings.authorize_url(),
            token_url: settings.token_url(),
            audience: settings.audience.clone(),
            scopes: vec![],
        }),
        capabilities: DescriptorCapabilities { tools: true },
        tools: build_tools_list(),
    })
}

pub async fn protected_resource(
    State(state): State<AppState>,
) -> Result<Json<ProtectedResourceMetadata>, AppError> {
    let settings = state.oauth.as_deref().ok_or(AppError::Misconfigured)?;

    Ok(Json(ProtectedResourceMetadata {
        resource: settings.audience.clone(),
        authorization_servers: vec![settings.authorization_server()],
        bearer_methods_supported: vec!["header"],
    }))
}

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_mcp_request(&state, &method, &headers, &body)
        .await
        .into_response()
}

/// Authenticated single-shot tool invocation outside of JSON-RPC.
pub async fn call_tool(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method == Method::OPTIONS {
        return Ok(StatusCode::OK.into_response());
    }
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed);
    }

    let claims = authenticate(state.oauth.as_deref(), state.verifier.as_ref(), &headers).await?;

    let request: CallToolRequest = serde_json::from_slice(&body)
        .map_err(|_| AppError::bad_request("request body must be a JSON object"))?;
    let requested = request.tool.unwrap_or_default();
    let tool = RegisteredTool::from_name(&requested)
        .ok_or_else(|| AppError::ToolNotFound { name: requested })?;

    let output = tool.invoke();
    tracing::info!(tool = tool.name(), user = %claims.sub, "tool invoked");

    Ok(Json(CallToolResponse {
        success: true,
        tool: tool.name(),
        joke: output.text,
        user: claims.sub,
    })
    .into_response())
}
