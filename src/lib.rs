//! Bucketview - serve one JSON document from object storage over HTTP
//!
//! A read-through cache in front of a single S3 object, answering API
//! Gateway proxy events (or local HTTP) with the document, sub-documents
//! and filtered collections.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod function;
pub mod lambda;
pub mod models;
pub mod server;
pub mod storage;

pub use config::{Config, RunMode};
pub use function::Function;
