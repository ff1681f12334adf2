//! Test helper modules for fbk-admin integration tests
//!
//! - MockBackend: listing + event stream backend with failure injection
//! - review_json: backend-shaped review payloads

#![allow(dead_code)]

pub mod mock_backend;

pub use mock_backend::{eventually, MockBackend};

use serde_json::{json, Value};

/// Review as the backend serializes it; `minute` offsets `created_at`
pub fn review_json(id: i64, business_name: &str, stars: i32, minute: u32) -> Value {
    json!({
        "id": id,
        "business_name": business_name,
        "stars": stars,
        "text": format!("Review {}", id),
        "created_at": format!("2024-06-01T12:{:02}:00", minute),
        "sentiment_analysis": null,
        "recommended_action": null,
    })
}
