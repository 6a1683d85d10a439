use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::{
    error::{validation::required, AppError, AppResult},
    middleware::AppJson,
    state::AppState,
    types::{CreateGenreRequest, DeleteResult, Genre, InsertResult, UpdateGenreRequest, UpdateResult},
};

fn genre_from_row(r: &SqliteRow) -> AppResult<Genre> {
    Ok(Genre {
        id: r.try_get("id")?,
        name: r.try_get("name")?,
        description: r.try_get("description")?,
        created_at: r.try_get("created_at")?,
    })
}

pub async fn create_genre(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateGenreRequest>,
) -> AppResult<Json<InsertResult>> {
    let name = required(Some(req.name.as_str()), "name")?;
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO genres (id, name, description) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(name)
        .bind(&req.description)
        .execute(&state.db)
        .await?;
    tracing::debug!(genre_id = %id, %name, "genre created");
    Ok(Json(InsertResult { inserted_id: id }))
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    let rows = sqlx::query("SELECT id, name, description, created_at FROM genres ORDER BY rowid")
        .fetch_all(&state.db)
        .await?;
    let genres = rows.iter().map(genre_from_row).collect::<AppResult<Vec<_>>>()?;
    Ok(Json(genres))
}

pub async fn update_genre(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateGenreRequest>,
) -> AppResult<Json<UpdateResult>> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
    }
    let res = sqlx::query(
        r#"UPDATE genres SET name = COALESCE(?1, name), description = COALESCE(?2, description)
           WHERE id = ?3"#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(&req.description)
    .bind(&id)
    .execute(&state.db)
    .await?;
    Ok(Json(UpdateResult::from_rows(res.rows_affected())))
}

pub async fn delete_genre(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<DeleteResult>> {
    let res = sqlx::query("DELETE FROM genres WHERE id = ?1").bind(&id).execute(&state.db).await?;
    Ok(Json(DeleteResult { deleted_count: res.rows_affected() }))
}
