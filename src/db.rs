use sqlx::SqlitePool;

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Pragmas for better durability/performance
    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("Failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA synchronous=NORMAL;").execute(pool).await {
        tracing::warn!("Failed to set synchronous mode: {}", e);
    }
    // Reviews and genre links cascade with their book
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("Failed to set busy_timeout: {}", e);
    }

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            photo_url TEXT NULL,
            role TEXT NOT NULL DEFAULT 'user',
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS genres (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NULL,
            description TEXT NULL,
            cover_image TEXT NULL,
            total_pages INTEGER NULL,
            rating REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    // A book's genre set: one row per (book, genre name)
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS book_genres (
            book_id TEXT NOT NULL,
            genre TEXT NOT NULL,
            PRIMARY KEY (book_id, genre),
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // Reviews belong to exactly one book; `id` only records insertion order
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id TEXT NOT NULL,
            rating REAL NOT NULL,
            comment TEXT NOT NULL,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'approved')),
            FOREIGN KEY(book_id) REFERENCES books(id) ON DELETE CASCADE
        )"#,
    )
    .execute(pool)
    .await?;

    // No foreign key on book_id: entries outlive deleted books and are
    // filtered out by the join when listed.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS shelf_entries (
            id TEXT PRIMARY KEY,
            shelf TEXT NOT NULL CHECK (shelf IN ('want-to-read', 'currently-reading', 'read')),
            email TEXT NOT NULL,
            book_id TEXT NOT NULL,
            added_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_users_created", "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at)"),
        ("idx_book_genres_genre", "CREATE INDEX IF NOT EXISTS idx_book_genres_genre ON book_genres(genre)"),
        ("idx_books_rating", "CREATE INDEX IF NOT EXISTS idx_books_rating ON books(rating)"),
        ("idx_reviews_book", "CREATE INDEX IF NOT EXISTS idx_reviews_book ON reviews(book_id)"),
        ("idx_reviews_status", "CREATE INDEX IF NOT EXISTS idx_reviews_status ON reviews(status)"),
        (
            "idx_reviews_identity",
            "CREATE INDEX IF NOT EXISTS idx_reviews_identity ON reviews(book_id, email, date)",
        ),
        (
            "idx_shelf_unique",
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_shelf_unique ON shelf_entries(shelf, email, book_id)",
        ),
    ];

    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            match &e {
                sqlx::Error::Database(db_err) => {
                    let msg = db_err.message().to_lowercase();
                    if msg.contains("already exists") || msg.contains("duplicate") {
                        tracing::debug!("Index {} already exists, skipping", name);
                    } else if name == "idx_shelf_unique" {
                        // Shelf add relies on this index to reject concurrent duplicates
                        return Err(anyhow::anyhow!("Failed to create index {}: {}", name, e));
                    } else {
                        tracing::warn!("Failed to create index {}: {}", name, e);
                    }
                }
                _ => {
                    tracing::warn!("Failed to create index {}: {}", name, e);
                }
            }
        }
    }

    Ok(())
}
