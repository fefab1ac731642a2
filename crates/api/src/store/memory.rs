//! In-process identity store, used when no database is configured and in tests

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{Identity, IdentityStore, NewIdentity, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    next_id: i64,
    by_id: HashMap<i64, Identity>,
    ids_by_username: HashMap<String, i64>,
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    inner: RwLock<Inner>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<Identity>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ids_by_username
            .get(username)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Identity>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn insert(&self, identity: NewIdentity) -> StoreResult<Identity> {
        let mut inner = self.inner.write().await;
        if inner.ids_by_username.contains_key(&identity.username) {
            return Err(StoreError::DuplicateUsername(identity.username));
        }

        inner.next_id += 1;
        let stored = Identity {
            id: inner.next_id,
            username: identity.username,
            password_hash: identity.password_hash,
            first_name: identity.first_name,
            last_name: identity.last_name,
            is_active: identity.is_active,
            kind: identity.kind,
            created_at: OffsetDateTime::now_utc(),
        };
        inner
            .ids_by_username
            .insert(stored.username.clone(), stored.id);
        inner.by_id.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let identity = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        identity.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn set_active(&self, id: i64, is_active: bool) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let identity = inner.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        identity.is_active = is_active;
        Ok(())
    }
}
