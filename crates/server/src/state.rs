//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::reviews::ReviewAccess;
use crate::services::tokens::{HmacTokenResolver, TokenError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    tokens: HmacTokenResolver,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Review and user store
    ///
    /// # Errors
    ///
    /// Returns an error if the token secret cannot key the signer.
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Result<Self, TokenError> {
        let tokens = HmacTokenResolver::new(&config.tokens)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tokens,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Get a reference to the bearer token resolver.
    #[must_use]
    pub fn tokens(&self) -> &HmacTokenResolver {
        &self.inner.tokens
    }

    /// Review operations backed by this state's store and tokens.
    #[must_use]
    pub fn reviews(&self) -> ReviewAccess<'_> {
        ReviewAccess::new(self.store(), self.tokens())
    }
}
