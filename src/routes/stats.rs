use axum::{extract::State, Json};
use sqlx::Row;

use crate::{
    error::AppResult,
    middleware::{AppQuery, Identity},
    state::AppState,
    types::{EmailQuery, GenreStat, RegistrationStat, Shelf, ShelfCount},
};

/// Raw entry counts per shelf, always all three shelves in display order.
pub async fn shelf_book_count(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(q): AppQuery<EmailQuery>,
) -> AppResult<Json<Vec<ShelfCount>>> {
    let email = q
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&identity.email)
        .to_string();

    let mut counts = Vec::with_capacity(Shelf::COUNT_ORDER.len());
    for shelf in Shelf::COUNT_ORDER {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shelf_entries WHERE shelf = ?1 AND email = ?2")
            .bind(shelf.slug())
            .bind(&email)
            .fetch_one(&state.db)
            .await?;
        counts.push(ShelfCount { name: shelf.label().to_string(), count });
    }
    Ok(Json(counts))
}

pub async fn genre_stats(State(state): State<AppState>) -> AppResult<Json<Vec<GenreStat>>> {
    let rows = sqlx::query(
        r#"SELECT genre, COUNT(*) AS cnt
           FROM book_genres
           GROUP BY genre
           ORDER BY cnt DESC, genre ASC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let stats = rows
        .iter()
        .map(|r| Ok(GenreStat { genre: r.try_get("genre")?, count: r.try_get("cnt")? }))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(stats))
}

/// Signups per server-local calendar day, oldest first.
pub async fn user_register_stats(State(state): State<AppState>) -> AppResult<Json<Vec<RegistrationStat>>> {
    let rows = sqlx::query(
        r#"SELECT date(created_at, 'localtime') AS day, COUNT(*) AS cnt
           FROM users
           GROUP BY day
           ORDER BY day ASC"#,
    )
    .fetch_all(&state.db)
    .await?;

    let stats = rows
        .iter()
        .map(|r| Ok(RegistrationStat { date: r.try_get("day")?, count: r.try_get("cnt")? }))
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(stats))
}
