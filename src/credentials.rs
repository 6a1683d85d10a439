//! Password hashing and signed session tokens.
//!
//! Passwords are stored as salted bcrypt hashes. Sessions are stateless HS256
//! JWTs carrying the user id, email and role; nothing is persisted server-side,
//! so a token stays valid until it expires.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;
use crate::types::Role;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token signing failed: {0}")]
    Signing(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Token payload. `id` is the user's id as issued at signup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct Credentials {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
    cost: u32,
}

impl Credentials {
    pub fn new(cfg: &AuthConfig) -> Self {
        let secret = cfg.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            ttl: Duration::hours(cfg.token_ttl_hours as i64),
            cost: cfg.bcrypt_cost,
        }
    }

    /// Hashes on the blocking pool; bcrypt is deliberately slow.
    pub async fn hash(&self, password: &str) -> Result<String, CredentialError> {
        let password = password.to_owned();
        let cost = self.cost;
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
        Ok(hashed)
    }

    /// `false` for a wrong password and for a stored value that is not a bcrypt hash.
    pub async fn verify(&self, password: &str, hashed: &str) -> bool {
        let password = password.to_owned();
        let hashed = hashed.to_owned();
        match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                tracing::warn!("stored password hash could not be checked: {}", e);
                false
            }
            Err(e) => {
                tracing::error!("password verification task failed: {}", e);
                false
            }
        }
    }

    pub fn issue_token(&self, id: &str, email: &str, role: Role) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            id: id.to_string(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(CredentialError::Signing)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, CredentialError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(CredentialError::InvalidToken)
    }
}
