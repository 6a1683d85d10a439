use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Json,
};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    error::{
        validation::{required, validate_rating},
        AppResult,
    },
    middleware::{AppJson, AppQuery},
    state::AppState,
    types::{
        Book, BookListQuery, BookPage, CreateBookRequest, DeleteResult, InsertResult, Review, UpdateBookRequest,
        UpdateResult,
    },
};

/// Book columns, selected from an alias `b`.
pub(crate) const BOOK_COLUMNS: &str =
    "b.id, b.title, b.author, b.description, b.cover_image, b.total_pages, b.rating, b.created_at";

const LIKE_ESCAPE: char = '!';

fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// Maps the scalar book columns; genres and reviews are filled in by [`hydrate_books`].
pub(crate) fn book_from_row(r: &SqliteRow) -> AppResult<Book> {
    Ok(Book {
        id: r.try_get("id")?,
        title: r.try_get("title")?,
        author: r.try_get("author")?,
        description: r.try_get("description")?,
        cover_image: r.try_get("cover_image")?,
        total_pages: r.try_get("total_pages")?,
        genres: Vec::new(),
        rating: r.try_get("rating")?,
        reviews: Vec::new(),
        created_at: r.try_get("created_at")?,
    })
}

fn review_from_row(r: &SqliteRow) -> AppResult<Review> {
    let status: String = r.try_get("status")?;
    Ok(Review {
        rating: r.try_get("rating")?,
        comment: r.try_get("comment")?,
        name: r.try_get("name")?,
        email: r.try_get("email")?,
        date: r.try_get("date")?,
        status: status.parse().map_err(|e: String| anyhow::anyhow!(e))?,
    })
}

/// Attaches genre sets and reviews (in insertion order) to already loaded books.
pub(crate) async fn hydrate_books(db: &SqlitePool, books: &mut [Book]) -> AppResult<()> {
    if books.is_empty() {
        return Ok(());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT book_id, genre FROM book_genres WHERE book_id IN (");
    let mut sep = qb.separated(", ");
    for book in books.iter() {
        sep.push_bind(book.id.clone());
    }
    qb.push(") ORDER BY rowid");
    let mut genres: HashMap<String, Vec<String>> = HashMap::new();
    for r in qb.build().fetch_all(db).await? {
        genres.entry(r.try_get("book_id")?).or_default().push(r.try_get("genre")?);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT book_id, rating, comment, name, email, date, status FROM reviews WHERE book_id IN (",
    );
    let mut sep = qb.separated(", ");
    for book in books.iter() {
        sep.push_bind(book.id.clone());
    }
    qb.push(") ORDER BY id");
    let mut reviews: HashMap<String, Vec<Review>> = HashMap::new();
    for r in qb.build().fetch_all(db).await? {
        reviews.entry(r.try_get("book_id")?).or_default().push(review_from_row(&r)?);
    }

    for book in books.iter_mut() {
        book.genres = genres.remove(&book.id).unwrap_or_default();
        book.reviews = reviews.remove(&book.id).unwrap_or_default();
    }
    Ok(())
}

/// Trims, drops empty names and duplicates, keeping first-seen order.
fn normalize_genres(genres: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(genres.len());
    for g in genres {
        let g = g.trim();
        if !g.is_empty() && !out.iter().any(|seen| seen == g) {
            out.push(g.to_string());
        }
    }
    out
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, search: Option<&str>, genre: Option<&str>) {
    qb.push(" WHERE 1 = 1");
    if let Some(search) = search {
        qb.push(" AND b.title LIKE ")
            .push_bind(format!("%{}%", escape_like_pattern(search)))
            .push(" ESCAPE '!'");
    }
    if let Some(genre) = genre {
        qb.push(" AND EXISTS (SELECT 1 FROM book_genres g WHERE g.book_id = b.id AND g.genre = ")
            .push_bind(genre.to_string())
            .push(")");
    }
}

pub async fn list_books(
    State(state): State<AppState>,
    AppQuery(q): AppQuery<BookListQuery>,
) -> AppResult<Json<BookPage>> {
    let catalog = &state.config.catalog;
    let page = q.page.unwrap_or(1).max(1);
    let limit = q.limit.unwrap_or(catalog.default_page_size).clamp(1, catalog.max_page_size);
    let search = q.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let genre = q.genre.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let order = match q.sort.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("asc") => " ORDER BY b.rating ASC, b.rowid",
        Some("desc") => " ORDER BY b.rating DESC, b.rowid",
        _ => " ORDER BY b.rowid",
    };

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) AS cnt FROM books b");
    push_filters(&mut qb, search, genre);
    let total: i64 = qb.build().fetch_one(&state.db).await?.try_get("cnt")?;

    let offset = (i64::from(page) - 1) * i64::from(limit);
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {BOOK_COLUMNS} FROM books b"));
    push_filters(&mut qb, search, genre);
    qb.push(order).push(" LIMIT ").push_bind(i64::from(limit)).push(" OFFSET ").push_bind(offset);
    let rows = qb.build().fetch_all(&state.db).await?;

    let mut result = rows.iter().map(book_from_row).collect::<AppResult<Vec<_>>>()?;
    hydrate_books(&state.db, &mut result).await?;

    let limit_i = i64::from(limit);
    Ok(Json(BookPage { result, total, page, limit, total_page: (total + limit_i - 1) / limit_i }))
}

pub async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Option<Book>>> {
    let row = sqlx::query(&format!("SELECT {BOOK_COLUMNS} FROM books b WHERE b.id = ?1"))
        .bind(&id)
        .fetch_optional(&state.db)
        .await?;
    let Some(row) = row else {
        return Ok(Json(None));
    };
    let mut books = vec![book_from_row(&row)?];
    hydrate_books(&state.db, &mut books).await?;
    Ok(Json(books.pop()))
}

pub async fn create_book(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateBookRequest>,
) -> AppResult<Json<InsertResult>> {
    let title = required(Some(req.title.as_str()), "title")?;
    let rating = req.rating.unwrap_or(0.0);
    validate_rating(rating, "rating")?;
    let genres = normalize_genres(&req.genres);
    let id = Uuid::new_v4().to_string();

    let mut tx = state.db.begin().await?;
    sqlx::query(
        r#"INSERT INTO books (id, title, author, description, cover_image, total_pages, rating)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
    )
    .bind(&id)
    .bind(title)
    .bind(&req.author)
    .bind(&req.description)
    .bind(&req.cover_image)
    .bind(req.total_pages)
    .bind(rating)
    .execute(&mut *tx)
    .await?;
    for genre in &genres {
        sqlx::query("INSERT OR IGNORE INTO book_genres (book_id, genre) VALUES (?1, ?2)")
            .bind(&id)
            .bind(genre)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::debug!(book_id = %id, %title, "book created");
    Ok(Json(InsertResult { inserted_id: id }))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateBookRequest>,
) -> AppResult<Json<UpdateResult>> {
    if let Some(title) = &req.title {
        required(Some(title.as_str()), "title")?;
    }
    if let Some(rating) = req.rating {
        validate_rating(rating, "rating")?;
    }

    let mut tx = state.db.begin().await?;
    let res = sqlx::query(
        r#"UPDATE books SET
               title = COALESCE(?1, title),
               author = COALESCE(?2, author),
               description = COALESCE(?3, description),
               cover_image = COALESCE(?4, cover_image),
               total_pages = COALESCE(?5, total_pages),
               rating = COALESCE(?6, rating)
           WHERE id = ?7"#,
    )
    .bind(req.title.as_deref().map(str::trim))
    .bind(&req.author)
    .bind(&req.description)
    .bind(&req.cover_image)
    .bind(req.total_pages)
    .bind(req.rating)
    .bind(&id)
    .execute(&mut *tx)
    .await?;

    if res.rows_affected() > 0 {
        if let Some(genres) = &req.genres {
            sqlx::query("DELETE FROM book_genres WHERE book_id = ?1").bind(&id).execute(&mut *tx).await?;
            for genre in normalize_genres(genres) {
                sqlx::query("INSERT OR IGNORE INTO book_genres (book_id, genre) VALUES (?1, ?2)")
                    .bind(&id)
                    .bind(genre)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }
    tx.commit().await?;

    Ok(Json(UpdateResult::from_rows(res.rows_affected())))
}

pub async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<DeleteResult>> {
    // Reviews and genre links go with the book; shelf entries stay and drop out of listings
    let res = sqlx::query("DELETE FROM books WHERE id = ?1").bind(&id).execute(&state.db).await?;
    if res.rows_affected() > 0 {
        tracing::debug!(book_id = %id, "book deleted");
    }
    Ok(Json(DeleteResult { deleted_count: res.rows_affected() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_pattern() {
        assert_eq!(escape_like_pattern("50%_off!"), "50!%!_off!!");
        assert_eq!(escape_like_pattern("dune"), "dune");
    }

    #[test]
    fn test_normalize_genres() {
        let input = vec![" Fantasy".to_string(), "".to_string(), "Fantasy".to_string(), "Sci-Fi".to_string()];
        assert_eq!(normalize_genres(&input), vec!["Fantasy".to_string(), "Sci-Fi".to_string()]);
    }
}
