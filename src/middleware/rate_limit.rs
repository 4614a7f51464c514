use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Process-wide fixed-window counter shared by a route group. Resets on
/// restart; not shared across instances.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    rps: u32,
    window: Arc<Mutex<WindowState>>,
}

impl RateLimiter {
    fn new(rps: u32) -> Self {
        Self {
            rps: rps.max(1),
            window: Arc::new(Mutex::new(WindowState {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    fn allow(&self) -> bool {
        let mut guard = self.window.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        if now.duration_since(guard.start) >= Duration::from_secs(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(state): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.allow() {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_rps_state(rps: u32) -> RateLimiter {
    RateLimiter::new(rps)
}

/// Per-client fixed window for the public verification routes: `limit`
/// requests per `window`; request `limit + 1` gets 429.
#[derive(Clone, Debug)]
pub struct IpRateLimiter {
    limit: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<String, WindowState>>>,
}

impl IpRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        let mut guard = self.windows.lock().expect("ip limiter mutex poisoned");
        let now = Instant::now();
        guard.retain(|_, w| now.duration_since(w.start) < self.window);
        let entry = guard.entry(key.to_string()).or_insert(WindowState {
            start: now,
            count: 0,
        });
        if now.duration_since(entry.start) >= self.window {
            entry.start = now;
            entry.count = 0;
        }
        if entry.count < self.limit {
            entry.count += 1;
            true
        } else {
            false
        }
    }
}

fn client_key(req: &Request<Body>) -> String {
    if let Some(forwarded) = req.headers().get("x-forwarded-for") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let first = first.trim();
                if !first.is_empty() {
                    return first.to_string();
                }
            }
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn ip_rate_limit_middleware(
    State(state): State<IpRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.allow(&client_key(&req)) {
        return (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded").into_response();
    }
    next.run(req).await
}

pub fn new_ip_limiter_state(limit: u32, window_secs: u64) -> IpRateLimiter {
    IpRateLimiter::new(limit, Duration::from_secs(window_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thirty_first_request_in_window_is_denied() {
        let limiter = IpRateLimiter::new(30, Duration::from_secs(60));
        for _ in 0..30 {
            assert!(limiter.allow("203.0.113.7"));
        }
        assert!(!limiter.allow("203.0.113.7"));
    }

    #[test]
    fn windows_are_isolated_per_client() {
        let limiter = IpRateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.allow("203.0.113.7"));
        assert!(!limiter.allow("203.0.113.7"));
        assert!(limiter.allow("203.0.113.8"));
    }
}
