use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::errors::AppError;
use crate::logging::{SanitizedIpAddr, SecurityEvent};

/// Bucket count above which finished windows are swept before counting.
const PRUNE_THRESHOLD: usize = 1024;

/// Fixed-window request counter per client IP.
#[derive(Clone)]
pub struct RateLimiterState {
    max_requests: u32,
    window: Duration,
    trust_proxy_headers: bool,
    buckets: Arc<DashMap<IpAddr, RateWindow>>,
}

#[derive(Debug)]
struct RateWindow {
    started_at: Instant,
    hits: u32,
}

impl RateLimiterState {
    pub fn new(calls: NonZeroU32, window: Duration) -> Self {
        Self {
            max_requests: calls.get(),
            window,
            trust_proxy_headers: false,
            buckets: Arc::new(DashMap::new()),
        }
    }

    /// Keys clients by `X-Forwarded-For`/`X-Real-IP` instead of the socket
    /// address. Only safe behind a proxy that overwrites those headers.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    fn client_ip(&self, headers: &HeaderMap, peer: IpAddr) -> IpAddr {
        if self.trust_proxy_headers {
            select_client_ip(headers, peer)
        } else {
            peer
        }
    }

    /// Drops buckets whose window has already closed.
    fn prune(&self, now: Instant) {
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.started_at) < self.window);
    }

    /// Counts one hit for `ip`. `Err` carries how long until the window resets.
    fn register(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() >= PRUNE_THRESHOLD {
            self.prune(now);
        }

        match self.buckets.entry(ip) {
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                let elapsed = now.saturating_duration_since(bucket.started_at);

                if elapsed >= self.window {
                    bucket.started_at = now;
                    bucket.hits = 0;
                } else if bucket.hits >= self.max_requests {
                    return Err(self.window - elapsed);
                }

                bucket.hits += 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(RateWindow {
                    started_at: now,
                    hits: 1,
                });
                Ok(())
            }
        }
    }
}

pub async fn enforce_rate_limit(
    State(state): State<RateLimiterState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = state.client_ip(request.headers(), addr.ip());

    if let Err(retry_after) = state.register(client_ip, Instant::now()) {
        crate::log_security_event!(
            SecurityEvent::RateLimitExceeded,
            client_ip = %SanitizedIpAddr::new(client_ip),
            path = %request.uri().path(),
            "Rate limit exceeded for client"
        );

        return Err(AppError::RateLimitExceeded {
            retry_after: Some(retry_after.max(Duration::from_secs(1))),
        });
    }

    Ok(next.run(request).await)
}

fn select_client_ip(headers: &HeaderMap, fallback: IpAddr) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or(real_ip).unwrap_or(fallback)
}
