//! Profile store collaborator trait and the in-memory backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::profile::CitizenProfile;

/// Backend-agnostic profile persistence.
///
/// `delete` must be total: a subsequent `load` for the same id reports
/// absent, with no residual copy observable through any read path.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Load a profile by user id.
    async fn load(&self, id: &str) -> Result<Option<CitizenProfile>, StoreError>;

    /// Insert or replace a profile.
    async fn save(&self, profile: &CitizenProfile) -> Result<(), StoreError>;

    /// Remove a profile entirely.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory profile store for the CLI binary and tests.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, CitizenProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn load(&self, id: &str) -> Result<Option<CitizenProfile>, StoreError> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn save(&self, profile: &CitizenProfile) -> Result<(), StoreError> {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.profiles.write().await.remove(id);
        Ok(())
    }
}
