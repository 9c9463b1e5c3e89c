//! API Routes
//!
//! Static route table and request resolution.
//!
//! # Routes
//! - `OPTIONS *` - CORS preflight
//! - `GET|HEAD /health` - Health check, never touches storage
//! - `GET|HEAD /` - Whole document, byte-for-byte
//! - `GET|HEAD /*` - Sub-document by path, filtered when query parameters are present

use axum::http::Method;

use super::cors::ALLOW_METHODS;
use super::query::{json_pointer, Filter};
use super::request::Request;
use crate::error::{ApiError, Result};

/// Methods a route answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodSet {
    Options,
    Read,
}

impl MethodSet {
    fn allows(self, method: &Method) -> bool {
        match self {
            MethodSet::Options => *method == Method::OPTIONS,
            MethodSet::Read => *method == Method::GET || *method == Method::HEAD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPattern {
    Root,
    Exact(&'static str),
    Any,
}

impl PathPattern {
    fn matches(self, path: &str) -> bool {
        match self {
            PathPattern::Root => path == "/",
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Preflight,
    Health,
    Document,
    Select,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteRule {
    pub methods: MethodSet,
    pub pattern: PathPattern,
    pub kind: RouteKind,
}

/// Evaluated top to bottom; first rule whose method and path match wins.
pub const ROUTES: &[RouteRule] = &[
    RouteRule {
        methods: MethodSet::Options,
        pattern: PathPattern::Any,
        kind: RouteKind::Preflight,
    },
    RouteRule {
        methods: MethodSet::Read,
        pattern: PathPattern::Exact("/health"),
        kind: RouteKind::Health,
    },
    RouteRule {
        methods: MethodSet::Read,
        pattern: PathPattern::Root,
        kind: RouteKind::Document,
    },
    RouteRule {
        methods: MethodSet::Read,
        pattern: PathPattern::Any,
        kind: RouteKind::Select,
    },
];

/// A resolved request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Preflight,
    Health,
    Document,
    Select { pointer: String },
    Query { pointer: String, filter: Filter },
}

/// Matches `request` against [`ROUTES`].
pub fn resolve(request: &Request) -> Result<Route> {
    let path = normalize(&request.path);
    let mut path_matched = false;

    for rule in ROUTES {
        if !rule.pattern.matches(&path) {
            continue;
        }
        if !rule.methods.allows(&request.method) {
            path_matched = true;
            continue;
        }
        return build(rule.kind, request);
    }

    if path_matched {
        Err(ApiError::MethodNotAllowed {
            method: request.method.to_string(),
            allow: ALLOW_METHODS,
        })
    } else {
        Err(ApiError::NotFound(format!("no route for {}", request.path)))
    }
}

fn build(kind: RouteKind, request: &Request) -> Result<Route> {
    let route = match kind {
        RouteKind::Preflight => Route::Preflight,
        RouteKind::Health => Route::Health,
        RouteKind::Document | RouteKind::Select => {
            let pointer = json_pointer(&request.segments());
            let filter = Filter::from_query(&request.query)?;
            match (filter.is_empty(), pointer.is_empty()) {
                (true, true) => Route::Document,
                (true, false) => Route::Select { pointer },
                (false, _) => Route::Query { pointer, filter },
            }
        }
    };
    Ok(route)
}

/// Collapses empty segments so `/health/` and `//health` resolve like `/health`.
fn normalize(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{joined}")
}
