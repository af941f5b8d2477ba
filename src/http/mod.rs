//! HTTP surface: admission middleware and the serving loop.

mod middleware;
mod server;

pub use middleware::{rate_limit_middleware, Gate};
pub use server::{router, HttpServer};
