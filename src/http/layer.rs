//! Tower layers enforcing rate limits ahead of axum handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::{OriginalUri, Request};
use axum::response::{IntoResponse, Response};
use tower::{Layer, Service};
use tracing::{error, warn};

use super::identity::{IdentityExtractor, PeerAddr};
use super::response::FailurePolicy;
use crate::error::FloodgateError;
use crate::ratelimit::{LimitKey, RateLimiter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Global,
    Route,
}

/// Shared state of one enforcement point.
#[derive(Clone)]
struct Enforcement {
    limiter: Arc<RateLimiter>,
    /// Rate override; the limiter's default applies when unset
    rate: Option<String>,
    extractor: Arc<dyn IdentityExtractor>,
    on_storage_failure: FailurePolicy,
    kind: ScopeKind,
}

impl Enforcement {
    fn new(limiter: Arc<RateLimiter>, kind: ScopeKind) -> Self {
        Self {
            limiter,
            rate: None,
            extractor: Arc::new(PeerAddr),
            on_storage_failure: FailurePolicy::default(),
            kind,
        }
    }

    fn key(&self, req: &Request) -> LimitKey {
        let identity = self.extractor.identify(req);
        match self.kind {
            ScopeKind::Global => LimitKey::global(&identity),
            ScopeKind::Route => LimitKey::route(full_path(req), &identity),
        }
    }

    /// Returns the rejection response when the request must not proceed.
    async fn check(&self, key: LimitKey) -> Option<Response> {
        let rate = self.rate.as_deref().unwrap_or(self.limiter.default_rate());

        match self.limiter.check_limit(&key, rate).await {
            Ok(_) => None,
            Err(err @ FloodgateError::RateLimitExceeded { .. }) => Some(err.into_response()),
            Err(err) if err.is_storage_failure() => match self.on_storage_failure {
                FailurePolicy::Open => {
                    warn!(key = %key, error = %err, "Counter store failed, allowing request");
                    None
                }
                FailurePolicy::Closed => {
                    warn!(key = %key, error = %err, "Counter store failed, rejecting request");
                    Some(err.into_response())
                }
            },
            Err(err) => {
                error!(key = %key, rate = %rate, error = %err, "Rate limit check failed");
                Some(err.into_response())
            }
        }
    }
}

/// The request path as the client sent it. Nested routers strip their
/// prefix from `req.uri()`, so prefer the untouched `OriginalUri`.
fn full_path(req: &Request) -> &str {
    req.extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path())
        .unwrap_or_else(|| req.uri().path())
}

/// Builder methods shared by both layers.
macro_rules! enforcement_builders {
    () => {
        /// Enforce `rate` instead of the limiter's default.
        pub fn rate(mut self, rate: impl Into<String>) -> Self {
            self.enforcement.rate = Some(rate.into());
            self
        }

        pub fn extractor(mut self, extractor: impl IdentityExtractor + 'static) -> Self {
            self.enforcement.extractor = Arc::new(extractor);
            self
        }

        pub fn on_storage_failure(mut self, policy: FailurePolicy) -> Self {
            self.enforcement.on_storage_failure = policy;
            self
        }
    };
}

/// Whole-traffic rate limiting, keyed `global:<identity>`.
///
/// Apply with `Router::layer` so it runs before routing and before any
/// [`RouteRateLimitLayer`]. A rejected request never reaches a handler.
#[derive(Clone)]
pub struct GlobalRateLimitLayer {
    enforcement: Enforcement,
}

impl GlobalRateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            enforcement: Enforcement::new(limiter, ScopeKind::Global),
        }
    }

    enforcement_builders!();
}

impl<S> Layer<S> for GlobalRateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            enforcement: self.enforcement.clone(),
        }
    }
}

/// Per-route rate limiting, keyed `route:<path>:<identity>`.
///
/// Apply with `MethodRouter::route_layer` on the handlers that opt in.
#[derive(Clone)]
pub struct RouteRateLimitLayer {
    enforcement: Enforcement,
}

impl RouteRateLimitLayer {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self {
            enforcement: Enforcement::new(limiter, ScopeKind::Route),
        }
    }

    enforcement_builders!();
}

impl<S> Layer<S> for RouteRateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            enforcement: self.enforcement.clone(),
        }
    }
}

/// Tower service produced by both rate limit layers.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    enforcement: Enforcement,
}

impl<S> Service<Request> for RateLimitService<S>
where
    S: Service<Request> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Keep the service that was driven to readiness and leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let enforcement = self.enforcement.clone();
        // Request bodies are not Sync, so the key is built before the future borrows anything.
        let key = enforcement.key(&req);

        Box::pin(async move {
            if let Some(rejection) = enforcement.check(key).await {
                return Ok(rejection);
            }
            let response = inner.call(req).await?;
            Ok(response.into_response())
        })
    }
}
