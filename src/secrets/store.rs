use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Secret data key holding a PEM private key (`kubernetes.io/tls` convention).
pub const TLS_PRIVATE_KEY: &str = "tls.key";

pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Errors produced by secret storage backends.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },
    /// The backend could not be reached (connect, TLS, timeout). Usually
    /// transient; a later pass may succeed unchanged.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
    /// The backend answered and refused the request, e.g. a Kubernetes
    /// `Forbidden` or `Invalid` status. Retrying without a config or RBAC
    /// change will not help.
    #[error("secret store error: {0}")]
    Store(String),
    #[error("secret store request cancelled")]
    Cancelled,
}

impl SecretStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, SecretStoreError::NotFound { .. })
    }
}

/// Named, namespaced secret storage with create-if-absent writes.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData, SecretStoreError>;

    /// Stores `data` unless a secret with that name already exists, and
    /// returns whatever the store holds afterwards.
    async fn create_if_absent(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, SecretStoreError>;
}
