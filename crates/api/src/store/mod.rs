//! Identity store
//!
//! The authentication core talks to persistence only through [`IdentityStore`].
//! Username uniqueness is enforced here, by the store, not by the callers that
//! generate candidate usernames.

mod memory;
mod postgres;

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Which kind of gym member an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityKind {
    Trainee,
    Trainer,
}

impl IdentityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityKind::Trainee => "trainee",
            IdentityKind::Trainer => "trainer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "trainee" => Some(IdentityKind::Trainee),
            "trainer" => Some(IdentityKind::Trainer),
            _ => None,
        }
    }
}

/// A registered identity with credentials.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub kind: IdentityKind,
    pub created_at: OffsetDateTime,
}

/// Fields needed to persist a new identity; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub kind: IdentityKind,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),
    #[error("identity not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>>;

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Identity>>;

    async fn exists_by_username(&self, username: &str) -> StoreResult<bool> {
        Ok(self.find_by_username(username).await?.is_some())
    }

    /// Persist a new identity. Must fail with [`StoreError::DuplicateUsername`]
    /// rather than overwrite when the username is taken.
    async fn insert(&self, identity: NewIdentity) -> StoreResult<Identity>;

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()>;

    async fn set_active(&self, id: i64, is_active: bool) -> StoreResult<()>;
}
