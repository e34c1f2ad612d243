use std::sync::Arc;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::error::KeyProvisionError;
use crate::{
    acme::{ACCOUNT_KEY_BITS, AccountKey},
    secrets::{SecretData, SecretStore, TLS_PRIVATE_KEY},
};

/// Loads an issuer's account key, creating and storing one on first use.
#[derive(Clone)]
pub struct AccountKeyProvisioner {
    store: Arc<dyn SecretStore>,
}

impl AccountKeyProvisioner {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Returns the key stored in `namespace/name`, generating a new RSA key
    /// only when the secret does not exist. Existing secrets are never
    /// overwritten.
    pub async fn ensure_account_key(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<AccountKey, KeyProvisionError> {
        match self.store.get(cancel, namespace, name).await {
            Ok(data) => decode_key(namespace, name, &data),
            Err(err) if err.is_not_found() => self.create(cancel, namespace, name).await,
            Err(err) => Err(err.into()),
        }
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<AccountKey, KeyProvisionError> {
        debug!("[account-key] generating account private key '{namespace}/{name}'");
        let key = tokio::task::spawn_blocking(|| AccountKey::generate_rsa(ACCOUNT_KEY_BITS))
            .await
            .map_err(|err| KeyProvisionError::Task(err.to_string()))?
            .map_err(KeyProvisionError::Generate)?;
        let pem = key.to_pkcs1_pem().map_err(KeyProvisionError::Generate)?;
        let data = SecretData::from([(TLS_PRIVATE_KEY.to_string(), pem.to_vec())]);

        // A concurrent writer may have won; use whatever the store kept.
        let stored = self
            .store
            .create_if_absent(cancel, namespace, name, data)
            .await?;
        let stored_key = decode_key(namespace, name, &stored)?;
        if stored_key.public_key_eq(&key) {
            info!("[account-key] stored new account private key '{namespace}/{name}'");
        } else {
            info!("[account-key] account private key '{namespace}/{name}' was created concurrently; using stored key");
        }
        Ok(stored_key)
    }
}

fn decode_key(
    namespace: &str,
    name: &str,
    data: &SecretData,
) -> Result<AccountKey, KeyProvisionError> {
    let pem = data
        .get(TLS_PRIVATE_KEY)
        .ok_or_else(|| KeyProvisionError::MissingKeyData {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
    AccountKey::from_pem(pem).map_err(|source| KeyProvisionError::InvalidKey {
        namespace: namespace.to_string(),
        name: name.to_string(),
        source,
    })
}
