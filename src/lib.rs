//! Floodgate - Per-Client Request Rate Limiting Middleware
//!
//! This crate implements fixed-window request rate limiting applied at the
//! edge of a web origin. Clients are identified by a trusted forwarded-address
//! header and counted against a per-window budget held in an interchangeable
//! counter store. Storage failures admit the request, so the origin never
//! becomes unreachable because the limiter's state did.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
pub mod store;
