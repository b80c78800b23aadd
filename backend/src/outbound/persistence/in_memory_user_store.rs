//! Process-local `UserStore` used when no database is configured.
//!
//! Mirrors the database contract: usernames are unique and every record gets
//! a fresh internal id on insert.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::{StoredUser, UserStore, UserStoreError};
use crate::domain::{UserRecord, Username};

/// In-memory user store keyed by username.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Username, StoredUser>>,
}

impl InMemoryUserStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock_users().len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock_users().is_empty()
    }

    fn lock_users(&self) -> MutexGuard<'_, HashMap<Username, StoredUser>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(
        &self,
        username: &Username,
    ) -> Result<Option<StoredUser>, UserStoreError> {
        Ok(self.lock_users().get(username).cloned())
    }

    async fn insert(&self, record: &UserRecord) -> Result<Uuid, UserStoreError> {
        let mut users = self.lock_users();
        if users.contains_key(record.username()) {
            return Err(UserStoreError::duplicate(record.username().as_str()));
        }
        let id = Uuid::new_v4();
        users.insert(
            record.username().clone(),
            StoredUser {
                id,
                record: record.clone(),
            },
        );
        Ok(id)
    }

    async fn update_by_id(&self, id: &Uuid, record: &UserRecord) -> Result<(), UserStoreError> {
        let mut users = self.lock_users();
        let stored = users
            .values_mut()
            .find(|stored| stored.id == *id)
            .ok_or_else(|| UserStoreError::query(format!("user row {id} vanished before update")))?;
        stored.record = record.clone();
        Ok(())
    }

    async fn delete_by_username(&self, username: &Username) -> Result<u64, UserStoreError> {
        Ok(u64::from(self.lock_users().remove(username).is_some()))
    }
}
