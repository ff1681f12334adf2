//! # FBK Common Library
//!
//! Shared code for the FBK review client crates including:
//! - Review model (`ReviewRecord`, `ReviewDraft`, `StarRating`)
//! - HTTP client for the review backend
//! - Configuration loading
//! - Error types
//! - Build identification for startup banners

pub mod api;
pub mod build_info;
pub mod config;
pub mod error;
pub mod review;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use review::{ReviewDraft, ReviewId, ReviewRecord, StarRating};
