use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{auth::AuthRejection, domain::tools::RegisteredTool};

/// Failures of the plain JSON routes (`/call-tool` and the discovery documents).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("server configuration error")]
    Misconfigured,
    #[error("missing bearer token")]
    MissingToken { challenge: String },
    #[error("invalid bearer token")]
    InvalidToken,
    #[error("bad request: {message}")]
    BadRequest { message: String },
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_tools: Option<Vec<&'static str>>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Misconfigured => Self::Misconfigured,
            AuthRejection::MissingCredentials { challenge, .. } => Self::MissingToken { challenge },
            AuthRejection::InvalidToken => Self::InvalidToken,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut challenge = None;
        let mut available_tools = None;

        let (status, error, message) = match self {
            Self::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed", None),
            Self::Misconfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server configuration error",
                Some("Identity provider settings are not properly configured".to_string()),
            ),
            Self::MissingToken { challenge: value } => {
                challenge = Some(value);
                (
                    StatusCode::UNAUTHORIZED,
                    "Missing or invalid authorization header",
                    Some("Please provide a valid Bearer token".to_string()),
                )
            }
            Self::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid token",
                Some("Token verification failed".to_string()),
            ),
            Self::BadRequest { message } => (StatusCode::BAD_REQUEST, "Bad request", Some(message)),
            Self::ToolNotFound { name } => {
                available_tools = Some(RegisteredTool::names());
                (
                    StatusCode::NOT_FOUND,
                    "Tool not found",
                    Some(format!("The tool \"{name}\" is not supported")),
                )
            }
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error,
                message,
                available_tools,
            }),
        )
            .into_response();

        if let Some(value) = challenge.and_then(|value| HeaderValue::from_str(&value).ok()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_sets_challenge_header() {
        let response = AppError::MissingToken {
            challenge: "Bearer realm=\"aud\"".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Bearer realm=\"aud\""))
        );
    }

    #[test]
    fn invalid_token_has_no_challenge() {
        let response = AppError::InvalidToken.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn unknown_tool_is_not_found() {
        let response = AppError::ToolNotFound {
            name: "tell_fortune".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
