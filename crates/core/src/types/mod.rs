//! Core types for Review Desk.
//!
//! This module provides type-safe wrappers for the review domain.

pub mod id;
pub mod profile_name;
pub mod review;
pub mod user;

pub use id::*;
pub use profile_name::{ProfileName, ProfileNameError};
pub use review::{NewReview, Review, ReviewChanges};
pub use user::User;
