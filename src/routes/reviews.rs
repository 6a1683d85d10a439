//! Review submission and moderation.
//!
//! A review is created `pending` and can only move to `approved`. It has no
//! id of its own; moderation addresses it by `(bookId, email, date)`.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use sqlx::Row;

use crate::{
    error::{validation::validate_rating, AppResult},
    middleware::{AppJson, Identity},
    routes::users::display_name,
    state::AppState,
    types::{ApproveReviewRequest, PendingReview, ReviewStatus, SubmitReviewRequest, UpdateResult},
};

/// Appends a pending review to a book. Repeat reviews by the same user are kept.
pub async fn submit_review(
    State(state): State<AppState>,
    identity: Identity,
    Path(book_id): Path<String>,
    AppJson(req): AppJson<SubmitReviewRequest>,
) -> AppResult<Json<UpdateResult>> {
    validate_rating(req.rating, "rating")?;
    let name = match req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => name.to_string(),
        None => display_name(&state, &identity).await?,
    };
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(&identity.email)
        .to_string();
    let date = req
        .date
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

    let res = sqlx::query(
        r#"INSERT INTO reviews (book_id, rating, comment, name, email, date, status)
           SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
           WHERE EXISTS (SELECT 1 FROM books WHERE id = ?1)"#,
    )
    .bind(&book_id)
    .bind(req.rating)
    .bind(&req.comment)
    .bind(&name)
    .bind(&email)
    .bind(&date)
    .bind(ReviewStatus::Pending.as_str())
    .execute(&state.db)
    .await?;

    if res.rows_affected() > 0 {
        state.metrics.inc_reviews_submitted();
        tracing::info!(%book_id, %email, %date, "review submitted");
    }
    Ok(Json(UpdateResult::from_rows(res.rows_affected())))
}

/// All pending reviews across books, flattened.
pub async fn list_pending_reviews(State(state): State<AppState>) -> AppResult<Json<Vec<PendingReview>>> {
    let rows = sqlx::query(
        r#"SELECT r.book_id, r.rating, r.comment, r.name, r.email, r.date
           FROM reviews r
           JOIN books b ON b.id = r.book_id
           WHERE r.status = ?1
           ORDER BY b.rowid, r.id"#,
    )
    .bind(ReviewStatus::Pending.as_str())
    .fetch_all(&state.db)
    .await?;

    let items = rows
        .iter()
        .map(|r| {
            Ok(PendingReview {
                book_id: r.try_get("book_id")?,
                rating: r.try_get("rating")?,
                comment: r.try_get("comment")?,
                name: r.try_get("name")?,
                email: r.try_get("email")?,
                date: r.try_get("date")?,
                status: ReviewStatus::Pending,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(items))
}

/// Approves the review matching `(bookId, email, date)` exactly.
///
/// A miss is not an error: the caller sees `matchedCount: 0`. When several
/// pending reviews share the triple, the earliest is approved.
pub async fn approve_review(
    State(state): State<AppState>,
    identity: Identity,
    AppJson(req): AppJson<ApproveReviewRequest>,
) -> AppResult<Json<UpdateResult>> {
    // Write first so the count runs under the write lock and agrees with it
    let mut tx = state.db.begin().await?;
    let res = sqlx::query(
        r#"UPDATE reviews SET status = ?4
           WHERE id = (
               SELECT id FROM reviews
               WHERE book_id = ?1 AND email = ?2 AND date = ?3 AND status = ?5
               ORDER BY id LIMIT 1
           )"#,
    )
    .bind(&req.book_id)
    .bind(&req.email)
    .bind(&req.date)
    .bind(ReviewStatus::Approved.as_str())
    .bind(ReviewStatus::Pending.as_str())
    .execute(&mut *tx)
    .await?;
    let matched: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM reviews WHERE book_id = ?1 AND email = ?2 AND date = ?3",
    )
    .bind(&req.book_id)
    .bind(&req.email)
    .bind(&req.date)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    let modified = res.rows_affected();
    if modified > 0 {
        state.metrics.add_reviews_approved(modified);
        tracing::info!(book_id = %req.book_id, email = %req.email, by = %identity.email, "review approved");
    } else {
        tracing::debug!(book_id = %req.book_id, email = %req.email, date = %req.date, "approve matched no pending review");
    }

    Ok(Json(UpdateResult { matched_count: u64::from(matched > 0), modified_count: modified }))
}
