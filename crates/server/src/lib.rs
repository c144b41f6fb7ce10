//! Review Desk server library.
//!
//! Product reviews with per-user ownership, bearer-token authentication and
//! word statistics, served over HTTP. Exposed as a library so the binary, the
//! CLI and the integration tests share one implementation.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
