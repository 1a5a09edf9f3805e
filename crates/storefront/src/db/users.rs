//! User and bearer-token repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use aurelia_core::{Email, UserId};

use super::RepositoryError;
use crate::models::user::User;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> Result<User, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(User {
            id: UserId::new(self.id),
            email,
            created_at: self.created_at,
        })
    }
}

/// Repository for user and token database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user with email and password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, email: &Email, password_hash: &str) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, created_at
            ",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_user()
    }

    /// Get a user and their password hash by email.
    ///
    /// Returns `None` if no such user exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<(i64, String, DateTime<Utc>, String)> = sqlx::query_as(
            r"
            SELECT id, email, created_at, password_hash
            FROM users
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some((id, email, created_at, password_hash)) = row else {
            return Ok(None);
        };

        let user = UserRow {
            id,
            email,
            created_at,
        }
        .into_user()?;

        Ok(Some((user, password_hash)))
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, created_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id.as_i64())
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Store a bearer token digest for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_token(
        &self,
        user_id: UserId,
        token_digest: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO api_token (user_id, token_digest)
            VALUES ($1, $2)
            ",
        )
        .bind(user_id.as_i64())
        .bind(token_digest)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Resolve a bearer token digest to its user.
    ///
    /// Revoked tokens resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user_by_token(
        &self,
        token_digest: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT u.id, u.email, u.created_at
            FROM api_token t
            JOIN users u ON u.id = t.user_id
            WHERE t.token_digest = $1 AND t.revoked_at IS NULL
            ",
        )
        .bind(token_digest)
        .fetch_optional(self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Revoke a bearer token.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live token was revoked.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn revoke_token(&self, token_digest: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE api_token
            SET revoked_at = NOW()
            WHERE token_digest = $1 AND revoked_at IS NULL
            ",
        )
        .bind(token_digest)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
