//! Business logic services.
//!
//! # Services
//!
//! - `reviews` - Review creation, editing, deletion and word statistics,
//!   with ownership checks
//! - `tokens` - Bearer token issuing and verification

pub mod reviews;
pub mod tokens;
