//! Runtime configuration from environment variables.

use std::time::Duration;

use deepcheck_auth::{AuthStateMachine, SessionGate, SessionToken};
use deepcheck_core::{MEBIBYTE, MediaKind, SizeLimits};
use deepcheck_upload::AnalysisEndpoints;

use crate::AppError;

/// Default detection service base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default sign-in page.
pub const DEFAULT_SIGN_IN_URL: &str = "http://localhost:5173/sign-in";

/// Default lifetime of an environment-provided access token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3_600);

/// Resolved application configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Service base URL.
    pub api_url: String,
    /// Per-kind endpoints.
    pub endpoints: AnalysisEndpoints,
    /// Per-kind size ceilings.
    pub limits: SizeLimits,
    /// Access token for the authorization gate and bearer header.
    pub access_token: Option<String>,
    /// How long the access token is treated as valid.
    pub token_ttl: Duration,
    /// Sign-in page the redirect points at.
    pub sign_in_url: String,
    /// Whole-request timeout; `None` keeps the transport default.
    pub request_timeout: Option<Duration>,
}

impl AppConfig {
    /// Loads configuration from the process environment.
    ///
    /// # Errors
    /// See [`AppConfig::from_lookup`].
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from `lookup`, which maps variable names to values.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for malformed numbers and
    /// [`AppError::Upload`] for endpoints that violate transport policy.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let api_url = value("DEEPCHECK_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let mut endpoints = AnalysisEndpoints::from_base(&api_url)?;
        let mut limits = SizeLimits::default();

        for kind in MediaKind::ALL {
            let family = kind.mime_family().to_ascii_uppercase();
            if let Some(endpoint) = value(&format!("DEEPCHECK_{family}_ENDPOINT")) {
                endpoints = endpoints.with_endpoint(kind, &endpoint)?;
            }

            let key = format!("DEEPCHECK_MAX_{family}_MB");
            if let Some(raw) = value(&key) {
                let megabytes = parse_positive(&key, &raw)?;
                let max_bytes = megabytes.checked_mul(MEBIBYTE).ok_or_else(|| {
                    AppError::Config(format!("{key} is too large: {megabytes}"))
                })?;
                limits = limits.with_max_bytes(kind, max_bytes);
            }
        }

        let token_ttl = match value("DEEPCHECK_TOKEN_TTL_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("DEEPCHECK_TOKEN_TTL_SECS", &raw)?),
            None => DEFAULT_TOKEN_TTL,
        };
        let request_timeout = value("DEEPCHECK_REQUEST_TIMEOUT_SECS")
            .map(|raw| parse_positive("DEEPCHECK_REQUEST_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            api_url,
            endpoints,
            limits,
            access_token: value("DEEPCHECK_ACCESS_TOKEN"),
            token_ttl,
            sign_in_url: value("DEEPCHECK_SIGN_IN_URL")
                .unwrap_or_else(|| DEFAULT_SIGN_IN_URL.to_string()),
            request_timeout,
        })
    }

    /// Builds an authorization gate from the configured token.
    ///
    /// Without a token the gate refuses every attempt.
    pub fn session_gate(&self, now_ms: u64) -> SessionGate {
        let gate = SessionGate::new(AuthStateMachine::new());
        if let Some(token) = &self.access_token {
            gate.sign_in(SessionToken {
                access_token: token.clone(),
                session_id: "environment".to_string(),
                expires_at_ms: now_ms.saturating_add(self.token_ttl.as_millis() as u64),
            });
        }
        gate
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_url", &self.api_url)
            .field("endpoints", &self.endpoints)
            .field("limits", &self.limits)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_ttl", &self.token_ttl)
            .field("sign_in_url", &self.sign_in_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, AppError> {
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(AppError::Config(format!(
            "{key} must be a positive whole number, got {raw:?}"
        ))),
    }
}
