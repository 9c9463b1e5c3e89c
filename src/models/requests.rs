//! Request DTOs for the proxy integration
//!
//! Defines the invocation payloads delivered by API Gateway. Both the REST
//! API (payload v1) and HTTP API (payload v2) shapes deserialize into the
//! same struct; the fields that one version omits are simply absent.

use std::collections::HashMap;

use serde::Deserialize;

/// Proxy invocation payload (`/{proxy+}` and `/` routes).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    /// v1 method
    #[serde(default)]
    pub http_method: Option<String>,
    /// v1 path, stage already stripped
    #[serde(default)]
    pub path: Option<String>,
    /// v2 path, may carry a `/{stage}` prefix
    #[serde(default)]
    pub raw_path: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

/// Request context block of a proxy event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    /// Present on v2 payloads only
    #[serde(default)]
    pub http: Option<HttpContext>,
}

/// v2 `requestContext.http` block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HttpContext {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ProxyEvent {
    /// Method from whichever payload version supplied it.
    pub fn method(&self) -> Option<&str> {
        self.http_method.as_deref().or_else(|| {
            self.request_context
                .as_ref()
                .and_then(|ctx| ctx.http.as_ref())
                .and_then(|http| http.method.as_deref())
        })
    }

    /// Request path with any `/{stage}` prefix removed. Defaults to `/`.
    pub fn resource_path(&self) -> String {
        if let Some(path) = self.path.as_deref() {
            return normalize(path);
        }

        let raw = self
            .raw_path
            .as_deref()
            .or_else(|| {
                self.request_context
                    .as_ref()
                    .and_then(|ctx| ctx.http.as_ref())
                    .and_then(|http| http.path.as_deref())
            })
            .unwrap_or("/");

        let stage = self
            .request_context
            .as_ref()
            .and_then(|ctx| ctx.stage.as_deref())
            .filter(|stage| !stage.is_empty() && *stage != "$default");

        match stage {
            Some(stage) => normalize(strip_stage(raw, stage)),
            None => normalize(raw),
        }
    }

    /// API Gateway request id, if any.
    pub fn request_id(&self) -> Option<&str> {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.request_id.as_deref())
    }
}

fn strip_stage<'a>(path: &'a str, stage: &str) -> &'a str {
    let Some(rest) = path
        .strip_prefix('/')
        .and_then(|p| p.strip_prefix(stage))
    else {
        return path;
    };

    if rest.is_empty() {
        "/"
    } else if rest.starts_with('/') {
        rest
    } else {
        // `/devices` under stage `dev` is not a stage prefix
        path
    }
}

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
