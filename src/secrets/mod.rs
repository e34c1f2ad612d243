mod kube_store;
mod memory;
mod store;

pub use kube_store::KubeSecretStore;
pub use memory::MemorySecretStore;
pub use store::{SecretData, SecretStore, SecretStoreError, TLS_PRIVATE_KEY};
