use axum::body::{to_bytes, Body};
use axum::extract::OriginalUri;
use axum::http::{HeaderMap, HeaderName, Request};
use axum::response::Response;
use billgate_core::config::UpstreamConfig;
use billgate_core::{CoreError, Result};
use std::time::Duration;
use tracing::{debug, warn};

const HOP_BY_HOP: [&str; 10] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_forwardable(name: &HeaderName) -> bool {
    !HOP_BY_HOP.contains(&name.as_str())
}

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from.iter().filter(|(name, _)| is_forwardable(name)) {
        to.append(name.clone(), value.clone());
    }
}

/// Forwards admitted requests to the billing backend.
pub struct UpstreamProxy {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamProxy {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| CoreError::ConfigurationError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url, path_and_query)
    }

    pub async fn forward(&self, req: Request<Body>) -> Result<Response> {
        let (parts, body) = req.into_parts();
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or(parts.uri);
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target_url(path_and_query);

        let body = to_bytes(body, usize::MAX)
            .await
            .map_err(|e| CoreError::InvalidInput(format!("Unreadable request body: {}", e)))?;

        let mut headers = HeaderMap::new();
        copy_headers(&parts.headers, &mut headers);

        debug!(method = %parts.method, url = url, "Forwarding request upstream");

        let upstream = self
            .client
            .request(parts.method, url.as_str())
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                warn!(url = url, error = %e, "Upstream request failed");
                CoreError::UpstreamError(e.to_string())
            })?;

        let status = upstream.status();
        let mut response_headers = HeaderMap::new();
        copy_headers(upstream.headers(), &mut response_headers);

        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| CoreError::UpstreamError(e.to_string()))?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}
