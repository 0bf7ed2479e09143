//! HTTP REST API
//!
//! - `common`: response envelope, error mapping, validated JSON bodies
//! - `modules`: handlers and DTOs per resource
//! - `router`: route table, middleware stack and OpenAPI document

pub mod common;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiDoc, ApiState};
