//! # BookWorm Backend Library
//!
//! REST backend for a book catalog with reader reviews, per-user reading
//! shelves and an admin dashboard.
//!
//! ## Architecture
//!
//! - **Axum**: HTTP server, routing and per-route access gates
//! - **SQLx**: SQLite storage for users, genres, books, reviews and shelves
//! - **Tokio**: async runtime
//! - **jsonwebtoken / bcrypt**: bearer tokens and password hashes
//!
//! ## Core Components
//!
//! - [`config`]: layered configuration (defaults, file, environment)
//! - [`credentials`]: password hashing and token signing
//! - [`db`]: schema initialization
//! - [`error`]: error type and its JSON response mapping
//! - [`metrics`]: process counters
//! - [`middleware`]: authentication and admin gates, JSON extractors
//! - [`routes`]: HTTP handlers
//! - [`state`]: shared application state
//! - [`types`]: request and response shapes

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

#[cfg(test)]
mod tests;
