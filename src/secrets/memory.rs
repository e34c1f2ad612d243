use std::{
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::store::{SecretData, SecretStore, SecretStoreError};

/// In-process secret store. Writes are create-if-absent under a single lock.
#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<(String, String), SecretData>>,
    reads: AtomicUsize,
    creates: AtomicUsize,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a secret, replacing any existing value.
    pub fn insert(&self, namespace: &str, name: &str, data: SecretData) {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((namespace.to_string(), name.to_string()), data);
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.secrets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(namespace.to_string(), name.to_string()))
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of secrets actually created through `create_if_absent`.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData, SecretStoreError> {
        if cancel.is_cancelled() {
            return Err(SecretStoreError::Cancelled);
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .lock()
            .map_err(|err| SecretStoreError::Store(format!("store state poisoned: {err}")))?
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SecretStoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn create_if_absent(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, SecretStoreError> {
        if cancel.is_cancelled() {
            return Err(SecretStoreError::Cancelled);
        }
        let mut secrets = self
            .secrets
            .lock()
            .map_err(|err| SecretStoreError::Store(format!("store state poisoned: {err}")))?;
        let stored = secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_insert_with(|| {
                self.creates.fetch_add(1, Ordering::SeqCst);
                data
            });
        Ok(stored.clone())
    }
}
