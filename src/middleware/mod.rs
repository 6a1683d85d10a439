//! Middleware and extractors shared by the route handlers.
//!
//! - `auth`: bearer-token authentication and role gates
//! - `extract`: JSON/query extractors that reject with the application's error body

pub mod auth;
pub mod extract;

pub use auth::{guard, Gate, Identity};
pub use extract::{AppJson, AppQuery};
