//! API and component tests.
//!
//! - **support**: shared test app over a temporary SQLite file
//! - **users_api_tests**: signup, login, current user, user administration
//! - **access_tests**: authentication and admin gates, access switches
//! - **genres_api_tests**, **books_api_tests**, **reviews_api_tests**,
//!   **shelves_api_tests**, **stats_api_tests**: catalog and reader features
//! - **health_api_tests**: liveness, readiness, version, counters
//! - **config_tests**, **error_tests**, **db_tests**: configuration, error
//!   mapping and schema behavior

pub mod support;

pub mod access_tests;
pub mod reviews_api_tests;
pub mod stats_api_tests;
