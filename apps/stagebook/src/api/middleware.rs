//! # Middleware Module
//!
//! Global request throttling for the HTTP API.
//!
//! `server.rate_limit` / `STAGEBOOK_RATE_LIMIT` sets the requests per second
//! shared by all clients (default: 100). With a rate of 0 `create_router`
//! never installs this layer; `create_rate_limiter(0)` itself still falls
//! back to 100. Rejected requests get a 429 error body and a `Retry-After`
//! header.

use super::types::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(100) {
    Some(rps) => rps,
    None => NonZeroU32::MIN,
};

/// Shared limiter; one bucket for the whole server.
pub type GlobalRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Build the limiter. Zero falls back to 100 requests per second.
pub fn create_rate_limiter(requests_per_second: u32) -> GlobalRateLimiter {
    let rps = NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS);
    Arc::new(RateLimiter::direct(Quota::per_second(rps)))
}

pub async fn rate_limit_middleware(
    State(limiter): State<GlobalRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let not_until = match limiter.check() {
        Ok(()) => return next.run(request).await,
        Err(not_until) => not_until,
    };

    // Whole seconds, never less than one.
    let retry_after = not_until
        .wait_time_from(DefaultClock::default().now())
        .as_secs()
        .max(1);
    tracing::warn!(
        event = "rate_limited",
        path = %request.uri().path(),
        retry_after,
        "Rate limit exceeded"
    );
    let mut response = ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "rate_limited",
        "Too Many Requests",
    )
    .into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
