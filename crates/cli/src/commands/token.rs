//! Bearer token commands.
//!
//! # Usage
//!
//! ```bash
//! rd-cli token issue --profile-name "Karl"
//! rd-cli token issue --profile-name "Karl" --ttl-secs 600
//! ```
//!
//! # Environment Variables
//!
//! - `REVIEWS_TOKEN_SECRET` - Signing secret shared with the server
//! - `REVIEWS_TOKEN_TTL_SECS` - Default token lifetime

use std::time::Duration;

use review_desk_core::ProfileName;
use review_desk_server::config::ServerConfig;
use review_desk_server::services::tokens::HmacTokenResolver;

use super::CommandError;

/// Issue a bearer token for `profile_name`.
///
/// The token is accepted by any server sharing the same secret; it only
/// authenticates once a user with that profile name exists.
///
/// # Errors
///
/// Returns `CommandError` if the configuration is missing or invalid.
pub fn issue(profile_name: &str, ttl_secs: Option<u64>) -> Result<String, CommandError> {
    let profile_name = ProfileName::parse(profile_name)?;

    let mut tokens = ServerConfig::from_env()?.tokens;
    if let Some(secs) = ttl_secs {
        tokens.ttl = Duration::from_secs(secs);
    }

    let resolver = HmacTokenResolver::new(&tokens)?;
    tracing::info!(ttl_secs = resolver.ttl().as_secs(), "Issuing token for {}", profile_name);

    Ok(resolver.issue(&profile_name))
}
