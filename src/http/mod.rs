//! Enforcement adapters for axum applications.
//!
//! Two independent enforcement points share one [`RateLimiter`](crate::ratelimit::RateLimiter):
//! a global layer that counts every request under `global:<identity>`, and a
//! per-route layer that counts requests to opted-in handlers under
//! `route:<path>:<identity>`. A request passing both consumes one unit from
//! each counter.

mod identity;
mod layer;
mod response;

pub use identity::{ForwardedFor, IdentityExtractor, PeerAddr, UNKNOWN_IDENTITY};
pub use layer::{GlobalRateLimitLayer, RateLimitService, RouteRateLimitLayer};
pub use response::{ErrorBody, FailurePolicy};
