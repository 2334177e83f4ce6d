//! Bearer token authentication
//!
//! Tokens are JWTs issued by the configured identity provider and verified against its
//! published key set. The gate in [`authenticate`] is shared by every route that needs a
//! caller identity.

pub mod jwks;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::OAuthSettings;

pub use jwks::{JwksVerifier, RemoteJwks};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Validated token payload. Only a [`TokenVerifier`] produces these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: Audience,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed token header: {0}")]
    MalformedHeader(#[source] jsonwebtoken::errors::Error),
    #[error("token header has no key id")]
    MissingKeyId,
    #[error("no key with id {0} in the published key set")]
    UnknownKey(String),
    #[error("failed to fetch key set: {0}")]
    KeySetFetch(#[from] reqwest::Error),
    #[error("token algorithm {alg:?} does not match published key {kid}")]
    AlgorithmMismatch {
        kid: String,
        alg: jsonwebtoken::Algorithm,
    },
    #[error("published key {kid} is unusable: {source}")]
    UnusableKey {
        kid: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
    #[error("token rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Checks signature, issuer, audience and expiry. Any violation is an error.
    async fn verify(
        &self,
        token: &str,
        issuer_domain: &str,
        audience: &str,
    ) -> Result<Claims, VerifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// Issuer domain or audience is not configured.
    Misconfigured,
    /// No usable `Authorization: Bearer` header.
    MissingCredentials {
        challenge: String,
        issuer_domain: String,
        audience: String,
    },
    InvalidToken,
}

pub async fn authenticate(
    oauth: Option<&OAuthSettings>,
    verifier: &dyn TokenVerifier,
    headers: &HeaderMap,
) -> Result<Claims, AuthRejection> {
    let Some(settings) = oauth else {
        error!("token verification requested but the identity provider is not configured");
        return Err(AuthRejection::Misconfigured);
    };

    let Some(auth) = headers.typed_get::<Authorization<Bearer>>() else {
        return Err(AuthRejection::MissingCredentials {
            challenge: settings.challenge(),
            issuer_domain: settings.issuer_domain.clone(),
            audience: settings.audience.clone(),
        });
    };

    verifier
        .verify(auth.token(), &settings.issuer_domain, &settings.audience)
        .await
        .map_err(|err| {
            warn!(error = %err, "token verification failed");
            AuthRejection::InvalidToken
        })
}
