use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{
    error::{validation::required, AppError, AppResult, OptionExt},
    middleware::{AppJson, Identity},
    state::AppState,
    types::{AuthResponse, LoginRequest, MeResponse, PublicUser, RoleChangeRequest, SignupRequest, UpdateResult},
};

const USER_COLUMNS: &str = "id, name, email, photo_url, role, created_at";

pub(crate) fn user_from_row(r: &SqliteRow) -> AppResult<PublicUser> {
    let role: String = r.try_get("role")?;
    Ok(PublicUser {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        email: r.try_get("email")?,
        photo_url: r.try_get("photo_url")?,
        role: role.parse().map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?,
        created_at: r.try_get("created_at")?,
    })
}

pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|_| AppError::BadRequest("User data is required".into()))?;
    let name = required(req.name.as_deref(), "name")?;
    let email = required(req.email.as_deref(), "email")?;
    let password = req
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("password is required".into()))?;

    let existing = sqlx::query("SELECT 1 FROM users WHERE email = ?1")
        .bind(email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(AppError::BadRequest("User already exist".into()));
    }

    let hashed = state.credentials.hash(password).await?;
    let id = Uuid::new_v4().to_string();
    let photo_url = req.photo_url.filter(|p| !p.trim().is_empty());

    let inserted = sqlx::query(
        r#"INSERT INTO users (id, name, email, password, photo_url, role)
           VALUES (?1, ?2, ?3, ?4, ?5, 'user')"#,
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(hashed)
    .bind(&photo_url)
    .execute(&state.db)
    .await;
    match inserted {
        Ok(_) => {}
        // Lost a race with a concurrent signup for the same email
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(AppError::BadRequest("User already exist".into()));
        }
        Err(e) => return Err(e.into()),
    }

    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(&id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_not_found("User")?;
    let user = user_from_row(&row)?;
    let token = state.credentials.issue_token(&user.id, &user.email, user.role)?;

    state.metrics.inc_signups();
    tracing::info!(user_id = %user.id, email = %user.email, "user signed up");

    let body = AuthResponse { message: "Signup successful".into(), token, user };
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let (email, password) = match (req.email.as_deref(), req.password.as_deref()) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => return Err(AppError::Unauthorized("User data is required".into())),
    };

    let row = sqlx::query(&format!("SELECT {USER_COLUMNS}, password FROM users WHERE email = ?1"))
        .bind(email)
        .fetch_optional(&state.db)
        .await?;

    // Unknown email and wrong password must be indistinguishable to the caller
    let invalid = || AppError::Unauthorized("Invalid user credentials".into());
    let Some(row) = row else {
        state.metrics.inc_logins_failed();
        tracing::info!(%email, "login failed");
        return Err(invalid());
    };
    let hashed: String = row.try_get("password")?;
    if !state.credentials.verify(password, &hashed).await {
        state.metrics.inc_logins_failed();
        tracing::info!(%email, "login failed");
        return Err(invalid());
    }

    let user = user_from_row(&row)?;
    let token = state.credentials.issue_token(&user.id, &user.email, user.role)?;
    state.metrics.inc_logins_succeeded();

    Ok(Json(AuthResponse { message: "Login successful".into(), token, user }))
}

pub async fn me(State(state): State<AppState>, identity: Identity) -> AppResult<Json<MeResponse>> {
    let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(&identity.id)
        .fetch_optional(&state.db)
        .await?;
    let user = row.as_ref().map(user_from_row).transpose()?;
    Ok(Json(MeResponse { user }))
}

pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<PublicUser>>> {
    let rows = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"))
        .fetch_all(&state.db)
        .await?;
    let users = rows.iter().map(user_from_row).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(users))
}

pub async fn change_role(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    AppJson(req): AppJson<RoleChangeRequest>,
) -> AppResult<Json<UpdateResult>> {
    let res = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
        .bind(req.role.as_str())
        .bind(&id)
        .execute(&state.db)
        .await?;
    if res.rows_affected() > 0 {
        tracing::info!(target_user = %id, role = %req.role, by = %identity.email, "user role changed");
    }
    Ok(Json(UpdateResult::from_rows(res.rows_affected())))
}

/// Looks up a display name, used when a review omits one.
pub(crate) async fn display_name(state: &AppState, identity: &Identity) -> AppResult<String> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM users WHERE id = ?1")
        .bind(&identity.id)
        .fetch_optional(&state.db)
        .await?;
    Ok(name.unwrap_or_else(|| identity.email.clone()))
}
