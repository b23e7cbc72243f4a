// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::error_handler::GatewayRejection;
use crate::middleware::utils::{
    bearer_token, capture_headers, extract_subscriber, get_client_ip, request_size,
};
use axum::body::{to_bytes, Body, HttpBody};
use axum::extract::OriginalUri;
use axum::http::{header, request::Parts, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use billgate_core::audit::{AuditRecord, AuthStatus, DynAuditSink};
use billgate_core::auth::{AuthClaims, TokenVerifier};
use billgate_core::config::GatewayConfig;
use billgate_core::rate_limit::DailyQuotaLimiter;
use chrono::Utc;
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error as _;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Everything about a request the audit record needs, gathered before the
/// downstream handler consumes the request.
struct RequestContext {
    start: Instant,
    endpoint: String,
    method: String,
    client_ip: Option<String>,
    headers: BTreeMap<String, Option<String>>,
    has_auth_header: bool,
    claims_attached: bool,
    subscriber_no: Option<String>,
    request_size: u64,
}

/// Authentication, daily quota and audit around every proxied request.
pub struct Gateway {
    config: GatewayConfig,
    verifier: Arc<dyn TokenVerifier>,
    limiter: DailyQuotaLimiter,
    sink: DynAuditSink,
    trusted_proxies: Vec<IpAddr>,
    total_submitted: Arc<AtomicU64>,
    total_errors: Arc<AtomicU64>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, verifier: Arc<dyn TokenVerifier>, sink: DynAuditSink) -> Self {
        let limiter = DailyQuotaLimiter::new(sink.clone(), config.daily_quota);
        Self {
            config,
            verifier,
            limiter,
            sink,
            trusted_proxies: Vec::new(),
            total_submitted: Arc::new(AtomicU64::new(0)),
            total_errors: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_trusted_proxies(mut self, proxies: Vec<IpAddr>) -> Self {
        self.trusted_proxies = proxies;
        self
    }

    pub fn get_total_submitted(&self) -> u64 {
        self.total_submitted.load(Ordering::SeqCst)
    }

    pub fn get_total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::SeqCst)
    }

    pub async fn intercept(&self, req: Request<Body>, next: Next) -> Response {
        let start = Instant::now();
        let (mut parts, body) = req.into_parts();

        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map(|original| original.0.clone())
            .unwrap_or_else(|| parts.uri.clone());
        let path = uri.path().to_string();
        let endpoint = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| path.clone());

        let mut ctx = RequestContext {
            start,
            endpoint,
            method: parts.method.to_string(),
            client_ip: get_client_ip(&parts, &self.trusted_proxies),
            headers: capture_headers(&parts.headers, &self.config.audited_headers),
            has_auth_header: parts
                .headers
                .get(header::AUTHORIZATION)
                .is_some_and(|value| !value.is_empty()),
            claims_attached: false,
            subscriber_no: None,
            request_size: 0,
        };

        let bytes = match to_bytes(body, self.config.max_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(endpoint = ctx.endpoint, error = %e, "Request body rejected");
                ctx.request_size = request_size(&parts.headers, None);
                return self.finish(ctx, body_rejection(&e).into_response()).await;
            }
        };

        let json = serde_json::from_slice::<Value>(&bytes).ok();
        ctx.request_size = request_size(&parts.headers, json.as_ref());
        ctx.subscriber_no = extract_subscriber(json.as_ref(), &self.config.subscriber_field);

        if let Err(rejection) = self.admit(&mut parts, &mut ctx, &path).await {
            return self.finish(ctx, rejection.into_response()).await;
        }

        let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;
        self.finish(ctx, response).await
    }

    /// Token check on protected routes, then the daily quota.
    async fn admit(
        &self,
        parts: &mut Parts,
        ctx: &mut RequestContext,
        path: &str,
    ) -> Result<(), GatewayRejection> {
        if self.config.is_protected(&ctx.endpoint) {
            let claims = self.authenticate(parts)?;
            parts.extensions.insert(claims);
            ctx.claims_attached = true;
        }

        if !self
            .config
            .is_rate_limited(&ctx.method, path, &ctx.endpoint)
        {
            return Ok(());
        }

        let Some(subscriber_no) = ctx.subscriber_no.as_deref() else {
            return Ok(());
        };

        match self
            .limiter
            .is_exceeded(subscriber_no, &self.config.endpoint_family, Utc::now())
            .await
        {
            Ok(true) => {
                debug!(
                    subscriber = subscriber_no,
                    threshold = self.limiter.threshold(),
                    "Daily quota exhausted"
                );
                Err(GatewayRejection::QuotaExceeded)
            }
            Ok(false) => Ok(()),
            Err(e) => {
                warn!(subscriber = subscriber_no, error = %e, "Quota check failed, admitting request");
                Ok(())
            }
        }
    }

    fn authenticate(&self, parts: &Parts) -> Result<AuthClaims, GatewayRejection> {
        let token = bearer_token(&parts.headers).ok_or(GatewayRejection::MissingToken)?;
        self.verifier
            .verify(token)
            .ok_or(GatewayRejection::InvalidToken)
    }

    /// Observe the outgoing response and hand its audit record to the sink.
    async fn finish(&self, ctx: RequestContext, response: Response) -> Response {
        let (response, response_size) = measure_response(response).await;
        let status = response.status().as_u16();

        let auth_status = AuthStatus::derive(ctx.has_auth_header, ctx.claims_attached, status);
        let record = AuditRecord::new(ctx.endpoint, ctx.method, status, auth_status)
            .with_subscriber(ctx.subscriber_no)
            .with_ip_address(ctx.client_ip)
            .with_headers(ctx.headers)
            .with_sizes(ctx.request_size, response_size)
            .with_duration(ctx.start.elapsed().as_millis() as u64);

        debug!(
            endpoint = record.endpoint,
            method = record.method,
            status = status,
            auth_status = %record.auth_status,
            "Submitting audit record"
        );

        self.total_submitted.fetch_add(1, Ordering::SeqCst);
        let sink = self.sink.clone();
        let errors = self.total_errors.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.append(record).await {
                errors.fetch_add(1, Ordering::SeqCst);
                warn!(error = %e, "Failed to write audit record");
            }
        });

        response
    }
}

/// 413 when the body outgrew `max_body_bytes`, 400 for any other read failure.
fn body_rejection(error: &axum::Error) -> GatewayRejection {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause.is::<LengthLimitError>() {
            return GatewayRejection::PayloadTooLarge;
        }
        source = cause.source();
    }
    GatewayRejection::InvalidBody
}

/// Body size of `response`, buffering it only when the size is not known
/// up front. The payload is returned unchanged.
async fn measure_response(response: Response) -> (Response, u64) {
    if let Some(size) = response.body().size_hint().exact() {
        return (response, size);
    }

    let (parts, body) = response.into_parts();
    match to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            let size = bytes.len() as u64;
            (Response::from_parts(parts, Body::from(bytes)), size)
        }
        Err(e) => {
            warn!(error = %e, "Failed to read response body");
            (GatewayRejection::Internal.into_response(), 0)
        }
    }
}
