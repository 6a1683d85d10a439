//! Access control gates.
//!
//! A route declares an ordered list of [`Gate`]s. `Authenticated` verifies the
//! bearer token and stores the decoded [`Identity`] in the request extensions;
//! `Admin` reads that identity and requires the admin role, so it must come
//! after `Authenticated` in the list.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    Router,
};

use crate::credentials::Claims;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::types::Role;

/// The caller as decoded from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self { id: claims.id, email: claims.email, role: claims.role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Authenticated,
    Admin,
}

impl Gate {
    /// Checks this gate against the identity attached so far.
    pub fn check(self, identity: Option<&Identity>) -> AppResult<()> {
        let identity = identity.ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;
        match self {
            Gate::Authenticated => Ok(()),
            Gate::Admin if identity.role == Role::Admin => Ok(()),
            Gate::Admin => Err(AppError::Forbidden("Forbidden".to_string())),
        }
    }
}

/// Applies `gates` to every route in `router`, running them in the given order.
pub fn guard(router: Router<AppState>, state: &AppState, gates: &[Gate]) -> Router<AppState> {
    // The last route_layer added runs first, so layer in reverse.
    gates.iter().rev().fold(router, |router, gate| match gate {
        Gate::Authenticated => router.route_layer(from_fn_with_state(state.clone(), authenticate)),
        Gate::Admin => router.route_layer(from_fn(require_admin)),
    })
}

/// Extracts the token from `Authorization: Bearer <token>`.
///
/// `None` means the header is absent; a present header with another scheme
/// or no token yields `Some("")` so it fails verification as an invalid token.
fn bearer_token(req: &Request) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?;
    let value = value.to_str().unwrap_or("");
    Some(value.strip_prefix("Bearer ").map(str::trim).unwrap_or(""))
}

/// Gate A: requires a valid bearer token.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> AppResult<Response> {
    let token = bearer_token(&req).ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))?;
    let claims = state.credentials.verify_token(token).map_err(|e| {
        tracing::debug!("rejected bearer token: {}", e);
        AppError::from(e)
    })?;
    req.extensions_mut().insert(Identity::from(claims));
    Ok(next.run(req).await)
}

/// Gate B: requires the identity attached by [`authenticate`] to be an admin.
pub async fn require_admin(req: Request, next: Next) -> AppResult<Response> {
    let identity = req.extensions().get::<Identity>();
    Gate::Admin.check(identity).inspect_err(|e| {
        if let (AppError::Forbidden(_), Some(identity)) = (e, identity) {
            tracing::info!(user = %identity.email, path = %req.uri().path(), "admin route refused");
        }
    })?;
    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_string()))
    }
}
