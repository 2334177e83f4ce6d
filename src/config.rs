use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DOMAIN_VAR: &str = "AUTH0_DOMAIN";
pub const AUDIENCE_VAR: &str = "AUTH0_AUDIENCE";

#[derive(Debug, Clone)]
pub struct Config {
    pub oauth: Option<OAuthSettings>,
    /// OAuth variables that were absent or blank, reported at startup only.
    pub missing_oauth_vars: Vec<&'static str>,
    pub bind_addr: String,
    pub bind_port: u16,
}

/// Identity provider coordinates used to verify bearer tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    pub issuer_domain: String,
    pub audience: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let domain = non_empty(DOMAIN_VAR);
        let audience = non_empty(AUDIENCE_VAR);
        let missing_oauth_vars = [
            (DOMAIN_VAR, domain.is_none()),
            (AUDIENCE_VAR, audience.is_none()),
        ]
        .into_iter()
        .filter_map(|(key, missing)| missing.then_some(key))
        .collect();
        let oauth = match (domain, audience) {
            (Some(issuer_domain), Some(audience)) => Some(OAuthSettings {
                issuer_domain,
                audience,
            }),
            _ => None,
        };

        let bind_addr = non_empty("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = non_empty("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);

        let config = Self {
            oauth,
            missing_oauth_vars,
            bind_addr,
            bind_port,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

impl OAuthSettings {
    pub fn new(issuer_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: issuer_domain.into(),
            audience: audience.into(),
        }
    }

    pub fn issuer(&self) -> String {
        issuer_for(&self.issuer_domain)
    }

    pub fn authorization_server(&self) -> String {
        format!("https://{}", self.issuer_domain)
    }

    pub fn jwks_url(&self) -> String {
        jwks_url_for(&self.issuer_domain)
    }

    pub fn authorize_url(&self) -> String {
        format!("https://{}/authorize", self.issuer_domain)
    }

    pub fn token_url(&self) -> String {
        format!("https://{}/oauth/token", self.issuer_domain)
    }

    /// Value of the `WWW-Authenticate` header sent when no bearer token is presented.
    pub fn challenge(&self) -> String {
        format!(
            "Bearer realm=\"{}\", authorization_uri=\"{}\", token_uri=\"{}\"",
            self.audience,
            self.authorize_url(),
            self.token_url()
        )
    }
}

pub fn issuer_for(issuer_domain: &str) -> String {
    format!("https://{issuer_domain}/")
}

pub fn jwks_url_for(issuer_domain: &str) -> String {
    format!("https://{issuer_domain}/.well-known/jwks.json")
}
