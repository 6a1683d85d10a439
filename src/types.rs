use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------- Users ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A user as returned to clients. The password hash never leaves the store layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "photoURL", alias = "photoUrl")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: Option<PublicUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeRequest {
    pub role: Role,
}

// ---------------- Genres ----------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Only the named fields can be changed; anything else in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGenreRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

// ---------------- Books & reviews ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            other => Err(format!("unknown review status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub rating: f64,
    pub comment: String,
    pub name: String,
    pub email: String,
    pub date: String,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_pages: Option<i64>,
    pub genres: Vec<String>,
    pub rating: f64,
    pub reviews: Vec<Review>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_pages: Option<i64>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub total_pages: Option<i64>,
    pub rating: Option<f64>,
    /// Replaces the whole genre set when present.
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub genre: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPage {
    pub result: Vec<Book>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_page: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitReviewRequest {
    pub rating: f64,
    pub comment: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReview {
    pub book_id: String,
    pub rating: f64,
    pub comment: String,
    pub name: String,
    pub email: String,
    pub date: String,
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveReviewRequest {
    pub book_id: String,
    pub email: String,
    pub date: String,
}

// ---------------- Shelves ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Shelf {
    WantToRead,
    CurrentlyReading,
    Read,
}

impl Shelf {
    /// Order used by the shelf-count view.
    pub const COUNT_ORDER: [Shelf; 3] = [Shelf::CurrentlyReading, Shelf::WantToRead, Shelf::Read];

    pub fn slug(&self) -> &'static str {
        match self {
            Shelf::WantToRead => "want-to-read",
            Shelf::CurrentlyReading => "currently-reading",
            Shelf::Read => "read",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Shelf::WantToRead => "Want To Read",
            Shelf::CurrentlyReading => "Currently Reading",
            Shelf::Read => "Read",
        }
    }
}

impl FromStr for Shelf {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "want-to-read" => Ok(Shelf::WantToRead),
            "currently-reading" => Ok(Shelf::CurrentlyReading),
            "read" => Ok(Shelf::Read),
            other => Err(format!("unknown shelf: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddShelfRequest {
    pub book_id: String,
    pub email: Option<String>,
}

/// Result of adding to a shelf. `added == false` carries the reason instead of an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfAddOutcome {
    pub added: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ShelfAddOutcome {
    pub fn added(id: String) -> Self {
        Self { added: true, id: Some(id), reason: None }
    }

    pub fn already_present() -> Self {
        Self { added: false, id: None, reason: Some("Book already in shelf".to_string()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelfItem {
    pub id: String,
    pub email: String,
    pub book_id: String,
    pub added_at: String,
    pub book: Book,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailQuery {
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfCount {
    pub name: String,
    pub count: i64,
}

// ---------------- Statistics ----------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreStat {
    pub genre: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationStat {
    pub date: String,
    pub count: i64,
}

// ---------------- Write results ----------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub inserted_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

impl UpdateResult {
    /// SQLite reports every matched row as changed.
    pub fn from_rows(rows: u64) -> Self {
        Self { matched_count: rows, modified_count: rows }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub deleted_count: u64,
}
