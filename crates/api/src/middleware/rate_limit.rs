//! Per-client rate limiting.
//!
//! Authenticated callers are limited per user id, anonymous callers per
//! client IP. One keyed GCRA limiter holds every key; idle keys are dropped
//! by the prune job.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter as GovRateLimiter,
};
use serde_json::json;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
};

use crate::app::AppState;
use crate::middleware::user_auth::UserAuth;

type KeyedRateLimiter = GovRateLimiter<ClientKey, DefaultKeyedStateStore<ClientKey>, DefaultClock>;

const FALLBACK_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(120) {
    Some(n) => n,
    None => unreachable!(),
};

/// Who a request is counted against.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientKey {
    User(uuid::Uuid),
    Ip(IpAddr),
    Unknown,
}

pub struct RateLimiterState {
    limiter: KeyedRateLimiter,
    rate_limit_per_minute: u32,
    trusted_proxies: Vec<IpAddr>,
    clock: DefaultClock,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32, trusted_proxies: Vec<IpAddr>) -> Self {
        let per_minute = NonZeroU32::new(rate_limit_per_minute).unwrap_or(FALLBACK_PER_MINUTE);
        Self {
            limiter: GovRateLimiter::keyed(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
            trusted_proxies,
            clock: DefaultClock::default(),
        }
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// `Err(retry_after_secs)` when the key has exhausted its quota.
    pub fn check(&self, key: &ClientKey) -> Result<(), u64> {
        self.limiter.check_key(key).map_err(|not_until| {
            not_until
                .wait_time_from(self.clock.now())
                .as_secs()
                .max(1)
        })
    }

    pub fn client_key(
        &self,
        auth: Option<&UserAuth>,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
    ) -> ClientKey {
        if let Some(auth) = auth {
            return ClientKey::User(auth.user_id);
        }
        client_ip(headers, peer, &self.trusted_proxies).map_or(ClientKey::Unknown, ClientKey::Ip)
    }

    /// Forgets keys whose quota has fully replenished. Returns how many remain.
    pub fn prune(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("tracked_clients", &self.tracked_clients())
            .finish()
    }
}

/// The socket peer, unless it is a trusted proxy. Then the `X-Forwarded-For`
/// chain is walked right to left and the first hop not appended by a trusted
/// proxy is the client. Unparseable hops stop the walk at the last proxy.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, trusted: &[IpAddr]) -> Option<IpAddr> {
    let peer = peer?.ip();
    if !trusted.contains(&peer) {
        return Some(peer);
    }

    let hops: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .collect();

    let mut client = peer;
    for hop in hops.into_iter().rev() {
        match hop.parse::<IpAddr>() {
            Ok(ip) if trusted.contains(&ip) => client = ip,
            Ok(ip) => return Some(ip),
            Err(_) => break,
        }
    }
    Some(client)
}

/// Runs after `optional_user_auth`, which leaves a valid token's claims in
/// the request extensions.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };

    let auth = req.extensions().get::<UserAuth>().cloned();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = limiter.client_key(auth.as_ref(), req.headers(), peer);

    if let Err(retry_after) = limiter.check(&key) {
        tracing::debug!(client = ?key, retry_after, "Rate limit exceeded");
        return rate_limited_response(limiter.rate_limit_per_minute(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retry_after": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
