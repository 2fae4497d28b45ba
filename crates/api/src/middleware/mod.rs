//! Cross-cutting request middleware: auth gate, rate limiting, request
//! logging (§4.9). Order at the router: logging wraps everything, then
//! rate limiting, then auth, innermost.

mod auth;
mod rate_limit;
mod request_log;

pub use auth::auth_middleware;
pub use rate_limit::rate_limit_middleware;
pub use request_log::request_logging_middleware;
