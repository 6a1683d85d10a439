use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    error::{validation::required, AppError, AppResult},
    middleware::{AppJson, AppQuery, Identity},
    routes::books::{book_from_row, hydrate_books, BOOK_COLUMNS},
    state::AppState,
    types::{AddShelfRequest, DeleteResult, EmailQuery, Shelf, ShelfAddOutcome, ShelfItem},
};

fn parse_shelf(segment: &str) -> AppResult<Shelf> {
    segment.parse().map_err(|_| AppError::NotFound(format!("Unknown shelf: {}", segment)))
}

/// Resolves the email a shelf operation applies to, defaulting to the caller.
fn target_email(requested: Option<&str>, identity: &Identity) -> String {
    requested
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&identity.email)
        .to_string()
}

pub async fn add_to_shelf(
    State(state): State<AppState>,
    identity: Identity,
    Path(shelf): Path<String>,
    AppJson(req): AppJson<AddShelfRequest>,
) -> AppResult<Json<ShelfAddOutcome>> {
    let shelf = parse_shelf(&shelf)?;
    let book_id = required(Some(req.book_id.as_str()), "bookId")?;
    let email = target_email(req.email.as_deref(), &identity);

    let existing = sqlx::query("SELECT 1 FROM shelf_entries WHERE shelf = ?1 AND email = ?2 AND book_id = ?3")
        .bind(shelf.slug())
        .bind(&email)
        .bind(book_id)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Ok(Json(ShelfAddOutcome::already_present()));
    }

    // The unique index settles concurrent adds that both passed the check above
    let id = Uuid::new_v4().to_string();
    let res = sqlx::query(
        r#"INSERT INTO shelf_entries (id, shelf, email, book_id, added_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(shelf, email, book_id) DO NOTHING"#,
    )
    .bind(&id)
    .bind(shelf.slug())
    .bind(&email)
    .bind(book_id)
    .bind(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    .execute(&state.db)
    .await?;

    if res.rows_affected() == 0 {
        tracing::debug!(shelf = shelf.slug(), %email, %book_id, "concurrent shelf add ignored");
        return Ok(Json(ShelfAddOutcome::already_present()));
    }

    state.metrics.inc_shelf_additions();
    tracing::info!(shelf = shelf.slug(), %email, %book_id, "book shelved");
    Ok(Json(ShelfAddOutcome::added(id)))
}

pub async fn remove_from_shelf(
    State(state): State<AppState>,
    identity: Identity,
    Path((shelf, book_id)): Path<(String, String)>,
) -> AppResult<Json<DeleteResult>> {
    let shelf = parse_shelf(&shelf)?;
    let res = sqlx::query("DELETE FROM shelf_entries WHERE shelf = ?1 AND email = ?2 AND book_id = ?3")
        .bind(shelf.slug())
        .bind(&identity.email)
        .bind(&book_id)
        .execute(&state.db)
        .await?;
    Ok(Json(DeleteResult { deleted_count: res.rows_affected() }))
}

/// Entries of one shelf joined to their books, newest first.
///
/// The inner join drops entries whose book has since been deleted.
async fn list_shelf(
    state: &AppState,
    identity: &Identity,
    shelf: Shelf,
    query: EmailQuery,
) -> AppResult<Vec<ShelfItem>> {
    let email = target_email(query.email.as_deref(), identity);
    let rows = sqlx::query(&format!(
        r#"SELECT e.id AS entry_id, e.email AS entry_email, e.added_at AS entry_added_at, {BOOK_COLUMNS}
           FROM shelf_entries e
           JOIN books b ON b.id = e.book_id
           WHERE e.shelf = ?1 AND e.email = ?2
           ORDER BY e.added_at DESC, e.rowid DESC"#
    ))
    .bind(shelf.slug())
    .bind(&email)
    .fetch_all(&state.db)
    .await?;

    let mut entries = Vec::with_capacity(rows.len());
    let mut books = Vec::with_capacity(rows.len());
    for r in &rows {
        let entry_id: String = r.try_get("entry_id")?;
        let entry_email: String = r.try_get("entry_email")?;
        let added_at: String = r.try_get("entry_added_at")?;
        entries.push((entry_id, entry_email, added_at));
        books.push(book_from_row(r)?);
    }
    hydrate_books(&state.db, &mut books).await?;

    Ok(entries
        .into_iter()
        .zip(books)
        .map(|((id, email, added_at), book)| ShelfItem { id, email, book_id: book.id.clone(), added_at, book })
        .collect())
}

pub async fn list_want_to_read(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(q): AppQuery<EmailQuery>,
) -> AppResult<Json<Vec<ShelfItem>>> {
    Ok(Json(list_shelf(&state, &identity, Shelf::WantToRead, q).await?))
}

pub async fn list_currently_reading(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(q): AppQuery<EmailQuery>,
) -> AppResult<Json<Vec<ShelfItem>>> {
    Ok(Json(list_shelf(&state, &identity, Shelf::CurrentlyReading, q).await?))
}

pub async fn list_read(
    State(state): State<AppState>,
    identity: Identity,
    AppQuery(q): AppQuery<EmailQuery>,
) -> AppResult<Json<Vec<ShelfItem>>> {
    Ok(Json(list_shelf(&state, &identity, Shelf::Read, q).await?))
}
