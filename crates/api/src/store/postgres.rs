//! Postgres-backed identity store
//!
//! Expects an `identities` table:
//!
//! ```sql
//! CREATE TABLE identities (
//!     id            BIGSERIAL PRIMARY KEY,
//!     username      TEXT NOT NULL UNIQUE,
//!     password_hash TEXT NOT NULL,
//!     first_name    TEXT NOT NULL,
//!     last_name     TEXT NOT NULL,
//!     is_active     BOOLEAN NOT NULL DEFAULT TRUE,
//!     kind          TEXT NOT NULL,
//!     created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! ```

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;

use super::{Identity, IdentityKind, IdentityStore, NewIdentity, StoreError, StoreResult};

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: i64,
    username: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    is_active: bool,
    kind: String,
    created_at: OffsetDateTime,
}

impl TryFrom<IdentityRow> for Identity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        let kind = IdentityKind::parse(&row.kind)
            .ok_or_else(|| StoreError::Database(format!("unknown identity kind '{}'", row.kind)))?;
        Ok(Identity {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            is_active: row.is_active,
            kind,
            created_at: row.created_at,
        })
    }
}

/// Log database error details and convert to a store error
fn db_err(step: &'static str, e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        tracing::error!(
            step,
            code = ?db.code(),
            message = db.message(),
            constraint = ?db.constraint(),
            "Database query failed"
        );
    } else {
        tracing::error!(step, error = ?e, "Non-database SQLx error");
    }
    StoreError::Database(e.to_string())
}

#[derive(Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, username, password_hash, first_name, last_name, is_active, kind, created_at FROM identities";

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE username = $1"))
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("find_by_username", e))?;
        row.map(Identity::try_from).transpose()
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Identity>> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_err("find_by_id", e))?;
        row.map(Identity::try_from).transpose()
    }

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        let exists: Option<(bool,)> =
            sqlx::query_as("SELECT TRUE FROM identities WHERE username = $1")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_err("exists_by_username", e))?;
        Ok(exists.is_some())
    }

    async fn insert(&self, identity: NewIdentity) -> StoreResult<Identity> {
        let result: Result<IdentityRow, sqlx::Error> = sqlx::query_as(
            r#"
            INSERT INTO identities (username, password_hash, first_name, last_name, is_active, kind)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, username, password_hash, first_name, last_name, is_active, kind, created_at
            "#,
        )
        .bind(&identity.username)
        .bind(&identity.password_hash)
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.is_active)
        .bind(identity.kind.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Identity::try_from(row),
            Err(e)
                if e
                    .as_database_error()
                    .is_some_and(|db| db.is_unique_violation()) =>
            {
                Err(StoreError::DuplicateUsername(identity.username))
            }
            Err(e) => Err(db_err("insert", e)),
        }
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        let rows = sqlx::query("UPDATE identities SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("update_password", e))?
            .rows_affected();
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_active(&self, id: i64, is_active: bool) -> StoreResult<()> {
        let rows = sqlx::query("UPDATE identities SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("set_active", e))?
            .rows_affected();
        if rows == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
