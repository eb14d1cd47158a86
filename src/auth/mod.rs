//! Operator accounts and bearer tokens.
//!
//! Passwords are stored as bcrypt hashes. Sessions are stateless HS256 JWTs
//! carrying the user's email as `sub`.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::storage::Pool;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Not authenticated")]
    MissingToken,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    #[error("password hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Issues and validates access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    expire_minutes: i64,
}

impl TokenIssuer {
    pub fn new(secret: impl Into<String>, expire_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            expire_minutes,
        }
    }

    pub fn expire_minutes(&self) -> i64 {
        self.expire_minutes
    }

    pub fn issue(&self, email: &str) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: email.to_string(),
            iat: now,
            exp: now + self.expire_minutes * 60,
            jti: Uuid::new_v4().to_string(),
        };
        self.encode(&claims)
    }

    pub(crate) fn encode(&self, claims: &Claims) -> Result<String, AuthError> {
        Ok(encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
}

/// SQLite-backed user accounts.
#[derive(Clone)]
pub struct UserStore {
    pool: Pool,
}

impl UserStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.pool.get()?;
        let user = conn
            .query_row(
                "SELECT id, email, password_hash FROM users WHERE email = ?1",
                params![email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password_hash: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    pub fn create(&self, email: &str, password: &str, cost: u32) -> Result<User> {
        let password_hash = hash_password(password, cost)?;
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
            params![email, password_hash],
        )
        .with_context(|| format!("failed to create user {email}"))?;
        Ok(User {
            id: conn.last_insert_rowid(),
            email: email.to_string(),
            password_hash,
        })
    }

    /// Create the bootstrap admin account if it does not exist yet.
    pub fn ensure_user(&self, email: &str, password: &str, cost: u32) -> Result<User> {
        if let Some(user) = self.find_by_email(email)? {
            info!(%email, "admin user already exists");
            return Ok(user);
        }
        let user = self.create(email, password, cost)?;
        info!(%email, "default admin user created");
        Ok(user)
    }

    /// Check credentials. `Ok(None)` means unknown user or wrong password.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        Ok(self
            .find_by_email(email)?
            .filter(|user| verify_password(password, &user.password_hash)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::open_pool;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_token_roundtrip() {
        let issuer = TokenIssuer::new("test-secret", 30);
        let token = issuer.issue("ops@example.com").unwrap();
        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.sub, "ops@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_token_with_wrong_secret_is_rejected() {
        let token = TokenIssuer::new("a", 30).issue("ops@example.com").unwrap();
        assert!(matches!(
            TokenIssuer::new("b", 30).validate(&token),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            TokenIssuer::new("a", 30).validate("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new("secret", 30);
        let now = Utc::now().timestamp();
        let token = issuer
            .encode(&Claims {
                sub: "ops@example.com".into(),
                iat: now - 7200,
                exp: now - 3600,
                jti: Uuid::new_v4().to_string(),
            })
            .unwrap();
        assert!(matches!(issuer.validate(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn test_user_bootstrap_and_authenticate() {
        let dir = tempfile::tempdir().unwrap();
        let pool = open_pool(dir.path().join("users.db").to_str().unwrap()).unwrap();
        let users = UserStore::new(pool);

        let admin = users.ensure_user("admin@example.com", "hunter2", TEST_COST).unwrap();
        let again = users.ensure_user("admin@example.com", "other", TEST_COST).unwrap();
        assert_eq!(admin.id, again.id);

        assert!(users.authenticate("admin@example.com", "hunter2").unwrap().is_some());
        assert!(users.authenticate("admin@example.com", "other").unwrap().is_none());
        assert!(users.authenticate("nobody@example.com", "hunter2").unwrap().is_none());
    }
}
