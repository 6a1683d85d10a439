//! HTTP route handlers for the BookWorm API.
//!
//! - `users`: signup, login, current user, user administration
//! - `genres`: genre catalog
//! - `books`: book catalog with pagination and filters
//! - `reviews`: review submission and moderation
//! - `shelves`: per-user reading shelves
//! - `stats`: aggregate views
//! - `health`: liveness, readiness, version and counters

pub mod books;
pub mod genres;
pub mod health;
pub mod reviews;
pub mod shelves;
pub mod stats;
pub mod users;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::middleware::{guard, Gate};
use crate::state::AppState;

const AUTHENTICATED: &[Gate] = &[Gate::Authenticated];
const ADMIN: &[Gate] = &[Gate::Authenticated, Gate::Admin];

/// Builds the API router. Routes are grouped by the gates they require.
pub fn router(state: AppState) -> Router {
    let access = &state.config.access;

    let public = Router::new()
        .route("/", get(health::root))
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        .route("/version", get(health::version))
        .route("/user/signup", post(users::signup))
        .route("/user/login", post(users::login));

    let mut authenticated = Router::new()
        .route("/user/me", get(users::me))
        .route("/books", get(books::list_books))
        .route("/books/{id}", get(books::get_book))
        .route("/books/review/{id}", patch(reviews::submit_review))
        .route("/shelf/{shelf}", post(shelves::add_to_shelf))
        .route("/shelf/{shelf}/{book_id}", delete(shelves::remove_from_shelf))
        .route("/want-to-read", get(shelves::list_want_to_read))
        .route("/currently-reading", get(shelves::list_currently_reading))
        .route("/read", get(shelves::list_read))
        .route("/shelf-book-count", get(stats::shelf_book_count));

    let mut admin = Router::new()
        .route("/users", get(users::list_users))
        .route("/user/role/{id}", patch(users::change_role))
        .route("/genres", post(genres::create_genre))
        .route("/genres/{id}", patch(genres::update_genre).delete(genres::delete_genre))
        .route("/books", post(books::create_book))
        .route("/books/{id}", patch(books::update_book).delete(books::delete_book))
        .route("/genre-stats", get(stats::genre_stats))
        .route("/user-register-stats", get(stats::user_register_stats))
        .route("/metrics", get(health::metrics));

    if access.open_genre_listing {
        authenticated = authenticated.route("/genres", get(genres::list_genres));
    } else {
        admin = admin.route("/genres", get(genres::list_genres));
    }

    let moderation = Router::new()
        .route("/books/reviews", get(reviews::list_pending_reviews))
        .route("/reviews/approve", patch(reviews::approve_review));
    if access.admin_moderation {
        admin = admin.merge(moderation);
    } else {
        authenticated = authenticated.merge(moderation);
    }

    Router::new()
        .merge(public)
        .merge(guard(authenticated, &state, AUTHENTICATED))
        .merge(guard(admin, &state, ADMIN))
        .with_state(state)
}
