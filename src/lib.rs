//! Floodgate - Fixed-Window Request Rate Limiting
//!
//! This crate decides, per caller and scope, whether a request may proceed or
//! exceeds a configured rate such as `"100/min"`. Counters live in a pluggable
//! store (in-process or Redis), and two axum layers enforce a global limit and
//! opt-in per-route limits on independent counters.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod server;
