//! Review Desk Core - Shared domain types.
//!
//! This crate provides the types used across all Review Desk components:
//! - `server` - HTTP API for reviews and word statistics
//! - `cli` - Command-line tools for migrations, users and tokens
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Ownership bookkeeping lives on [`User`] so both the
//! `PostgreSQL` and in-memory stores share the same rules.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, profile names, reviews and users
//! - [`words`] - Review text tokenization and word-frequency ranking

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod words;

pub use types::*;
pub use words::WordCount;
