//! API Module
//!
//! Transport-independent request dispatch for the document API.
//!
//! # Endpoints
//! - `OPTIONS *` - CORS preflight, 204
//! - `GET /health` - Health check with cache snapshot
//! - `GET /` - The whole document
//! - `GET /{path..}` - Sub-document, or a filtered collection with `?q=&limit=&field=`

pub mod cors;
pub mod handlers;
pub mod query;
pub mod request;
pub mod response;
pub mod routes;

pub use cors::CorsPolicy;
pub use handlers::Dispatcher;
pub use query::Filter;
pub use request::Request;
pub use response::Response;
pub use routes::{resolve, Route};
