//! Fixed-window request limiter for the `/api` routes.

use crate::api::error::ApiError;
use crate::config::{RateLimitConfig, ServerConfig};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Per-client request counters, shared by every clone.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Window>>>,
    max_requests: u32,
    window: Duration,
    trust_proxy: bool,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: Arc::new(Mutex::new(HashMap::new())),
            max_requests,
            window,
            trust_proxy: false,
        }
    }

    pub fn from_config(rate_limit: &RateLimitConfig, server: &ServerConfig) -> Self {
        Self::new(
            rate_limit.max_requests,
            Duration::from_secs(rate_limit.window_seconds),
        )
        .with_trust_proxy(server.trust_proxy)
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    /// Counts one request for `key` at `now`.
    ///
    /// Expired windows of every client are dropped first, so the map only
    /// holds clients seen during their current window.
    pub fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        windows.retain(|_, w| now.saturating_duration_since(w.started) < self.window);

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        entry.count = entry.count.saturating_add(1);

        if entry.count > self.max_requests {
            let elapsed = now.saturating_duration_since(entry.started);
            Decision::Limited {
                retry_after: self.window.saturating_sub(elapsed),
            }
        } else {
            Decision::Allowed {
                remaining: self.max_requests - entry.count,
            }
        }
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Peer IP, or the first `X-Forwarded-For` hop when proxies are trusted.
    pub fn client_key(&self, request: &Request) -> String {
        if self.trust_proxy {
            let forwarded = request
                .headers()
                .get(FORWARDED_FOR)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.split(',').next())
                .map(str::trim)
                .filter(|value| !value.is_empty());

            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

/// Middleware rejecting requests over the limit with 429.
pub async fn enforce(State(limiter): State<RateLimiter>, request: Request, next: Next) -> Response {
    let key = limiter.client_key(&request);

    match limiter.check(&key) {
        Decision::Allowed { remaining } => {
            debug!("Rate limit for {}: {} requests remaining", key, remaining);

            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max_requests()));
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            warn!("Rate limit exceeded for {}", key);

            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let mut response =
                ApiError::too_many_requests("Too many requests, please try again later.")
                    .into_response();
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_secs.max(1)));
            headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.max_requests()));
            headers.insert(REMAINING_HEADER, HeaderValue::from(0u32));
            response
        }
    }
}
