//! Request and Response models for the document API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing proxy invocations and HTTP response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{HttpContext, ProxyEvent, RequestContext};
pub use responses::{
    CacheSnapshot, ErrorBody, HealthResponse, ProxyResponse, QueryMatch, QueryResponse,
};
