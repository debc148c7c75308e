#![warn(missing_docs)]
//! # deepcheck-auth
//!
//! ## Purpose
//! Models the authorization collaborator consulted before any upload.
//!
//! ## Responsibilities
//! - Define the [`AuthorizationGate`] and [`SignInRedirect`] seams the
//!   submission controller depends on.
//! - Track session lifetime with an explicit state machine.
//! - Validate the sign-in target used by the redirect side-channel.
//!
//! ## Data flow
//! The host signs the user in elsewhere and hands a [`SessionToken`] to
//! [`SessionGate`]. The controller asks the gate before each attempt; on
//! refusal it calls [`SignInRedirect::redirect_to_sign_in`] instead of
//! touching the network.
//!
//! ## Error model
//! Sign-in target policy violations return [`AuthError`]. Gate checks are
//! infallible booleans.
//!
//! ## Security and privacy notes
//! Token values are never logged; only session ids and expiry appear in
//! tracing output.
//!
//! ## Example
//! ```rust
//! use deepcheck_auth::{AuthState, AuthStateMachine};
//!
//! let mut machine = AuthStateMachine::new();
//! assert_eq!(machine.state(), &AuthState::SignedOut);
//! assert!(!machine.expire_at(0));
//! ```

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use url::Url;

/// Answers whether the current caller may start an analysis.
pub trait AuthorizationGate: Send + Sync {
    /// Returns `true` when an attempt may proceed.
    fn is_authorized(&self) -> bool;
}

/// Side-channel invoked when an unauthorized caller requests analysis.
pub trait SignInRedirect: Send + Sync {
    /// Sends the caller to the external sign-in surface.
    fn redirect_to_sign_in(&self);
}

/// Credentials the host hands over once the user has signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Sent as `Authorization: Bearer` with uploads. Never logged.
    pub access_token: String,
    /// Opaque id that may appear in logs.
    pub session_id: String,
    /// Wall-clock deadline, epoch milliseconds.
    pub expires_at_ms: u64,
}

impl SessionToken {
    /// Milliseconds of validity left at `now_ms`, or `None` once lapsed.
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.expires_at_ms
            .checked_sub(now_ms)
            .filter(|remaining| *remaining > 0)
    }
}

/// Where the session lifecycle currently stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody has signed in, or the user signed out.
    #[default]
    SignedOut,
    /// A session is held and was valid at the last check.
    Active(SessionToken),
    /// The held session lapsed. The access token has been dropped and only
    /// the id is kept for diagnostics.
    Expired {
        /// Id of the lapsed session.
        session_id: String,
    },
}

/// Session lifecycle: `SignedOut -> Active -> Expired`, with sign-in and
/// sign-out legal from every state.
#[derive(Debug, Clone, Default)]
pub struct AuthStateMachine {
    state: AuthState,
}

impl AuthStateMachine {
    /// Starts signed out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// Replaces whatever session is held with `token`.
    pub fn establish(&mut self, token: SessionToken) {
        self.state = AuthState::Active(token);
    }

    /// Moves an active session to `Expired` once it has lapsed at `now_ms`.
    ///
    /// Returns `true` when this call performed the transition.
    pub fn expire_at(&mut self, now_ms: u64) -> bool {
        let session_id = match &self.state {
            AuthState::Active(token) if token.remaining_ms(now_ms).is_none() => {
                token.session_id.clone()
            }
            _ => return false,
        };
        self.state = AuthState::Expired { session_id };
        true
    }

    /// Drops any session.
    pub fn sign_out(&mut self) {
        self.state = AuthState::SignedOut;
    }

    /// The session, if one is held and still valid at `now_ms`.
    pub fn active_at(&self, now_ms: u64) -> Option<&SessionToken> {
        match &self.state {
            AuthState::Active(token) => token.remaining_ms(now_ms).map(|_| token),
            _ => None,
        }
    }
}

/// [`AuthorizationGate`] backed by a session state machine and a clock.
pub struct SessionGate {
    machine: Mutex<AuthStateMachine>,
    clock: fn() -> u64,
}

impl SessionGate {
    /// Creates a gate reading wall-clock time.
    pub fn new(machine: AuthStateMachine) -> Self {
        Self::with_clock(machine, unix_millis)
    }

    /// Creates a gate with a caller-supplied millisecond clock.
    pub fn with_clock(machine: AuthStateMachine, clock: fn() -> u64) -> Self {
        Self {
            machine: Mutex::new(machine),
            clock,
        }
    }

    /// Applies a completed sign-in.
    pub fn sign_in(&self, token: SessionToken) {
        if let Ok(mut machine) = self.machine.lock() {
            tracing::info!(
                stage = "auth",
                action = "sign_in",
                session_id = %token.session_id,
                expires_at_ms = token.expires_at_ms,
                "session established"
            );
            machine.establish(token);
        }
    }

    /// Signs the current session out.
    pub fn sign_out(&self) {
        if let Ok(mut machine) = self.machine.lock() {
            machine.sign_out();
            tracing::info!(stage = "auth", action = "sign_out", "session cleared");
        }
    }

    /// Current state after applying expiry.
    pub fn state(&self) -> AuthState {
        match self.machine.lock() {
            Ok(mut machine) => {
                machine.expire_at((self.clock)());
                machine.state().clone()
            }
            Err(_) => AuthState::SignedOut,
        }
    }

    /// Access token of the active session, if any.
    pub fn access_token(&self) -> Option<String> {
        let now_ms = (self.clock)();
        self.machine
            .lock()
            .ok()
            .and_then(|machine| {
                machine
                    .active_at(now_ms)
                    .map(|token| token.access_token.clone())
            })
    }
}

impl AuthorizationGate for SessionGate {
    fn is_authorized(&self) -> bool {
        let now_ms = (self.clock)();
        match self.machine.lock() {
            Ok(mut machine) => {
                if machine.expire_at(now_ms) {
                    tracing::info!(stage = "auth", action = "expire", "session lapsed");
                }
                machine.active_at(now_ms).is_some()
            }
            // A poisoned lock never grants access.
            Err(_) => false,
        }
    }
}

/// Gate with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticGate(pub bool);

impl AuthorizationGate for StaticGate {
    fn is_authorized(&self) -> bool {
        self.0
    }
}

/// Redirect that records the sign-in target in the log.
///
/// Used by hosts without a navigable UI, such as the command-line client.
#[derive(Debug, Clone)]
pub struct LoggingRedirect {
    target: Url,
}

impl LoggingRedirect {
    /// Creates a redirect pointing at a validated sign-in URL.
    ///
    /// # Errors
    /// Returns [`AuthError::InvalidSignInUrl`] when `target` violates
    /// [`validate_sign_in_url`].
    pub fn new(target: &str) -> Result<Self, AuthError> {
        Ok(Self {
            target: validate_sign_in_url(target)?,
        })
    }

    /// Sign-in URL the redirect points at.
    pub fn target(&self) -> &Url {
        &self.target
    }
}

impl SignInRedirect for LoggingRedirect {
    fn redirect_to_sign_in(&self) {
        tracing::warn!(
            stage = "auth",
            action = "redirect",
            target = %self.target,
            "sign in required before analysis"
        );
    }
}

/// Validates the sign-in target.
///
/// HTTPS is required except for loopback hosts used in local development.
///
/// # Errors
/// Returns [`AuthError::InvalidSignInUrl`] for unparseable URLs, non-HTTP
/// schemes, or plain HTTP on a non-loopback host.
pub fn validate_sign_in_url(target: &str) -> Result<Url, AuthError> {
    let parsed = Url::parse(target)
        .map_err(|error| AuthError::InvalidSignInUrl(format!("invalid sign-in url: {error}")))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if is_loopback_host(&parsed) => Ok(parsed),
        "http" => Err(AuthError::InvalidSignInUrl(
            "sign-in url must use https outside loopback".to_string(),
        )),
        other => Err(AuthError::InvalidSignInUrl(format!(
            "unsupported sign-in scheme: {other}"
        ))),
    }
}

fn is_loopback_host(url: &Url) -> bool {
    match url.host() {
        Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(url::Host::Ipv4(address)) => address.is_loopback(),
        Some(url::Host::Ipv6(address)) => address.is_loopback(),
        None => false,
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

/// Errors produced by auth configuration.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-in target violates URL policy.
    #[error("invalid sign-in target: {0}")]
    InvalidSignInUrl(String),
}
