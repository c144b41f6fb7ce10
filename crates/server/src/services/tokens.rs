//! Bearer tokens.
//!
//! A token is `base64url(profile_name) "." expires_at "." base64url(signature)`,
//! where `expires_at` is a Unix timestamp in seconds and the signature is
//! HMAC-SHA256 over the first two segments.

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use review_desk_core::ProfileName;

use crate::config::TokenConfig;

type HmacSha256 = Hmac<Sha256>;

/// Extracts a token from a request and resolves it to a user name.
pub trait TokenResolver: Send + Sync {
    /// The raw token carried by the request, if any.
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;

    /// The profile name a token was issued for.
    ///
    /// `None` for malformed, forged or expired tokens.
    fn user_name_for(&self, token: &str) -> Option<ProfileName>;
}

/// Reasons a token is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("invalid profile name in token")]
    InvalidProfileName,

    #[error("invalid signing key")]
    InvalidKey,
}

/// HMAC-SHA256 token issuer and verifier.
#[derive(Clone)]
pub struct HmacTokenResolver {
    mac: HmacSha256,
    ttl: Duration,
}

impl std::fmt::Debug for HmacTokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenResolver")
            .field("mac", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl HmacTokenResolver {
    /// Create a resolver from token configuration.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidKey` if the secret cannot key the MAC.
    pub fn new(config: &TokenConfig) -> Result<Self, TokenError> {
        let mac = HmacSha256::new_from_slice(config.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::InvalidKey)?;
        Ok(Self {
            mac,
            ttl: config.ttl,
        })
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `profile_name`, valid from now for the configured TTL.
    #[must_use]
    pub fn issue(&self, profile_name: &ProfileName) -> String {
        self.issue_at(profile_name, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    #[must_use]
    pub fn issue_at(&self, profile_name: &ProfileName, now: DateTime<Utc>) -> String {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.timestamp().saturating_add(ttl);

        let payload = format!(
            "{}.{expires_at}",
            URL_SAFE_NO_PAD.encode(profile_name.as_str())
        );
        let signature = URL_SAFE_NO_PAD.encode(self.sign(&payload));

        format!("{payload}.{signature}")
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns the first reason the token is rejected. The signature is checked
    /// before anything inside the token is trusted.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<ProfileName, TokenError> {
        let mut parts = token.split('.');
        let (Some(name), Some(expires_at), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(name.as_bytes());
        mac.update(b".");
        mac.update(expires_at.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let expires_at: i64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;
        if now.timestamp() >= expires_at {
            return Err(TokenError::Expired);
        }

        let name = URL_SAFE_NO_PAD
            .decode(name)
            .map_err(|_| TokenError::Malformed)?;
        let name = String::from_utf8(name).map_err(|_| TokenError::Malformed)?;

        ProfileName::parse(&name).map_err(|_| TokenError::InvalidProfileName)
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

impl TokenResolver for HmacTokenResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
        let (scheme, token) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let token = token.trim();
        (!token.is_empty()).then(|| token.to_owned())
    }

    fn user_name_for(&self, token: &str) -> Option<ProfileName> {
        match self.verify_at(token, Utc::now()) {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(reason = %e, "Rejected bearer token");
                None
            }
        }
    }
}
