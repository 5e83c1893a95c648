//! HTTP server wiring the enforcement layers into an axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::RateLimitingConfig;
use crate::error::Result;
use crate::http::{ForwardedFor, GlobalRateLimitLayer, PeerAddr, RouteRateLimitLayer};
use crate::ratelimit::RateLimiter;

/// Build the application router.
///
/// Every configured route answers `GET` with a small JSON body behind its
/// own [`RouteRateLimitLayer`]; `/` has no route limit. The whole router is
/// wrapped in a [`GlobalRateLimitLayer`].
pub fn build_router(config: &RateLimitingConfig, limiter: Arc<RateLimiter>) -> Router {
    let mut router = Router::new().route("/", get(index));

    for route in &config.routes {
        let mut layer = RouteRateLimitLayer::new(limiter.clone())
            .on_storage_failure(config.on_storage_failure);
        if let Some(rate) = &route.rate {
            layer = layer.rate(rate.clone());
        }
        if config.trust_proxy {
            layer = layer.extractor(ForwardedFor);
        }

        info!(
            path = %route.path,
            rate = %route.rate.as_deref().unwrap_or(limiter.default_rate()),
            "Registering rate limited route"
        );
        router = router.route(&route.path, get(index).route_layer(layer));
    }

    let global = GlobalRateLimitLayer::new(limiter)
        .rate(config.effective_global_rate())
        .on_storage_failure(config.on_storage_failure);
    let global = if config.trust_proxy {
        global.extractor(ForwardedFor)
    } else {
        global.extractor(PeerAddr)
    };

    router.layer(global)
}

async fn index() -> impl IntoResponse {
    Json(json!({ "msg": "ok" }))
}

/// HTTP server for the rate limited application.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    router: Router,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, router: Router) -> Self {
        Self { addr, router }
    }

    /// Start the server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "Starting HTTP server with graceful shutdown");

        axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .await
        .inspect_err(|e| error!(error = %e, "HTTP server failed"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteLimitConfig;
    use crate::ratelimit::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config() -> RateLimitingConfig {
        RateLimitingConfig {
            default_rate: "3/min".to_string(),
            global_rate: Some("10/min".to_string()),
            routes: vec![
                RouteLimitConfig {
                    path: "/login".to_string(),
                    rate: Some("1/min".to_string()),
                },
                RouteLimitConfig {
                    path: "/search".to_string(),
                    rate: None,
                },
            ],
            ..Default::default()
        }
    }

    async fn status_of(app: &Router, path: &str) -> StatusCode {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        app.clone().oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_router_applies_route_rates() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(MemoryStore::new()), "3/min").unwrap());
        let app = build_router(&config(), limiter);

        assert_eq!(status_of(&app, "/login").await, StatusCode::OK);
        assert_eq!(status_of(&app, "/login").await, StatusCode::TOO_MANY_REQUESTS);

        // No explicit rate: the limiter default of 3/min applies.
        for _ in 0..3 {
            assert_eq!(status_of(&app, "/search").await, StatusCode::OK);
        }
        assert_eq!(status_of(&app, "/search").await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_router_applies_global_rate() {
        let limiter = Arc::new(RateLimiter::new(Arc::new(MemoryStore::new()), "3/min").unwrap());
        let app = build_router(&config(), limiter);

        for _ in 0..10 {
            assert_eq!(status_of(&app, "/").await, StatusCode::OK);
        }
        assert_eq!(status_of(&app, "/").await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_server_creation() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let _server = HttpServer::new(addr, Router::new());
    }
}
