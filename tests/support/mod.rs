#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use acme_account_setup::{
    acme::{
        AccountKey, AcmeClient, AcmeClientError, AcmeClientFactory, NewRegistration, Problem,
        Registration,
    },
    issuer::{AcmeIssuerConfig, ClusterIssuer, ClusterIssuerSpec, Issuer, IssuerSpec, IssuerStatus},
    secrets::{SecretData, SecretStore, SecretStoreError},
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub const DIRECTORY_URL: &str = "https://ca.example/directory";
pub const KEY_SECRET: &str = "letsencrypt-account-key";

pub fn acme_config(email: &str) -> AcmeIssuerConfig {
    AcmeIssuerConfig {
        server: DIRECTORY_URL.into(),
        email: email.into(),
        private_key: KEY_SECRET.into(),
    }
}

pub fn issuer(namespace: &str, email: &str, status: Option<IssuerStatus>) -> Issuer {
    let mut issuer = Issuer::new(
        "letsencrypt",
        IssuerSpec {
            acme: Some(acme_config(email)),
        },
    );
    issuer.metadata.namespace = Some(namespace.into());
    issuer.status = status;
    issuer
}

pub fn cluster_issuer(email: &str) -> ClusterIssuer {
    ClusterIssuer::new(
        "letsencrypt-global",
        ClusterIssuerSpec {
            acme: Some(acme_config(email)),
        },
    )
}

/// ACME server double that knows a set of account URIs and hands out
/// `next_uri` on registration.
pub struct FakeAuthority {
    known: Mutex<HashSet<String>>,
    next_uri: String,
    register_failure: Option<String>,
    lookups: Mutex<Vec<String>>,
    registrations: Mutex<Vec<(NewRegistration, bool)>>,
    clients: Mutex<Vec<String>>,
}

impl FakeAuthority {
    pub fn new(next_uri: &str) -> Arc<Self> {
        Arc::new(Self {
            known: Mutex::new(HashSet::new()),
            next_uri: next_uri.into(),
            register_failure: None,
            lookups: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            clients: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting_registration(detail: &str) -> Arc<Self> {
        Arc::new(Self {
            known: Mutex::new(HashSet::new()),
            next_uri: String::new(),
            register_failure: Some(detail.into()),
            lookups: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            clients: Mutex::new(Vec::new()),
        })
    }

    pub fn with_account(self: Arc<Self>, uri: &str) -> Arc<Self> {
        self.known.lock().unwrap().insert(uri.into());
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> Vec<(NewRegistration, bool)> {
        self.registrations.lock().unwrap().clone()
    }

    /// Directory URLs clients were built for.
    pub fn clients(&self) -> Vec<String> {
        self.clients.lock().unwrap().clone()
    }
}

pub struct FakeAuthorityFactory(pub Arc<FakeAuthority>);

impl AcmeClientFactory for FakeAuthorityFactory {
    fn client(
        &self,
        _key: AccountKey,
        directory_url: &str,
    ) -> Result<Box<dyn AcmeClient>, AcmeClientError> {
        self.0.clients.lock().unwrap().push(directory_url.into());
        Ok(Box::new(FakeClient(self.0.clone())))
    }
}

struct FakeClient(Arc<FakeAuthority>);

#[async_trait]
impl AcmeClient for FakeClient {
    async fn get_registration(
        &self,
        cancel: &CancellationToken,
        uri: &str,
    ) -> Result<Registration, AcmeClientError> {
        if cancel.is_cancelled() {
            return Err(AcmeClientError::Cancelled);
        }
        self.0.lookups.lock().unwrap().push(uri.into());
        if uri.is_empty() {
            return Err(AcmeClientError::MissingAccountUri);
        }
        if self.0.known.lock().unwrap().contains(uri) {
            return Ok(Registration {
                uri: uri.into(),
                status: "valid".into(),
                contacts: vec![],
            });
        }
        Err(AcmeClientError::Problem(Problem {
            problem_type: "urn:ietf:params:acme:error:accountDoesNotExist".into(),
            detail: "no such account".into(),
            status: Some(400),
        }))
    }

    async fn register(
        &self,
        cancel: &CancellationToken,
        registration: &NewRegistration,
        accept_tos: bool,
    ) -> Result<Registration, AcmeClientError> {
        if cancel.is_cancelled() {
            return Err(AcmeClientError::Cancelled);
        }
        self.0
            .registrations
            .lock()
            .unwrap()
            .push((registration.clone(), accept_tos));
        if let Some(detail) = &self.0.register_failure {
            return Err(AcmeClientError::Problem(Problem {
                problem_type: "urn:ietf:params:acme:error:serverInternal".into(),
                detail: detail.clone(),
                status: Some(500),
            }));
        }
        self.0.known.lock().unwrap().insert(self.0.next_uri.clone());
        Ok(Registration {
            uri: self.0.next_uri.clone(),
            status: "valid".into(),
            contacts: registration.contacts.clone(),
        })
    }
}

/// Secret store whose reads always fail with a non-not-found error.
pub struct UnavailableSecretStore;

#[async_trait]
impl SecretStore for UnavailableSecretStore {
    async fn get(
        &self,
        _cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
    ) -> Result<SecretData, SecretStoreError> {
        Err(SecretStoreError::Unavailable(
            "dial tcp 10.0.0.1:443: connection refused".into(),
        ))
    }

    async fn create_if_absent(
        &self,
        _cancel: &CancellationToken,
        _namespace: &str,
        _name: &str,
        _data: SecretData,
    ) -> Result<SecretData, SecretStoreError> {
        Err(SecretStoreError::Store("unexpected create".into()))
    }
}
