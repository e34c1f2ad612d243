use thiserror::Error;

use super::reasons::{ERROR_ACCOUNT_REGISTRATION_FAILED, MESSAGE_ACCOUNT_REGISTRATION_FAILED};
use crate::{
    acme::{AcmeClientError, KeyError},
    domain::ContactError,
    issuer::{ConditionStatus, IssuerConditionType, IssuerStatus},
    secrets::SecretStoreError,
};

#[derive(Debug, Error)]
pub enum KeyProvisionError {
    #[error(transparent)]
    Store(#[from] SecretStoreError),
    #[error("secret {namespace}/{name} has no tls.key entry")]
    MissingKeyData { namespace: String, name: String },
    #[error("secret {namespace}/{name} holds an invalid account key: {source}")]
    InvalidKey {
        namespace: String,
        name: String,
        source: KeyError,
    },
    #[error(transparent)]
    Generate(KeyError),
    #[error("account key generation task failed: {0}")]
    Task(String),
}

/// Why a setup pass ended in a `Ready=False` status.
#[derive(Debug, Error)]
pub enum SetupFailure {
    #[error("issuer configuration invalid: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    KeyProvision(#[from] KeyProvisionError),
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error(transparent)]
    Authority(#[from] AcmeClientError),
}

/// A failed setup pass: the reason code, its cause, and the status the
/// caller should persist.
#[derive(Debug, Error)]
#[error("{}{}", MESSAGE_ACCOUNT_REGISTRATION_FAILED, .failure)]
pub struct SetupError {
    reason: &'static str,
    #[source]
    failure: SetupFailure,
    status: Box<IssuerStatus>,
}

impl SetupError {
    pub(crate) fn new(prior: IssuerStatus, failure: SetupFailure) -> Self {
        let message = format!("{MESSAGE_ACCOUNT_REGISTRATION_FAILED}{failure}");
        let status = prior.with_condition(
            IssuerConditionType::Ready,
            ConditionStatus::False,
            ERROR_ACCOUNT_REGISTRATION_FAILED,
            &message,
        );
        Self {
            reason: ERROR_ACCOUNT_REGISTRATION_FAILED,
            failure,
            status: Box::new(status),
        }
    }

    pub fn reason(&self) -> &'static str {
        self.reason
    }

    pub fn failure(&self) -> &SetupFailure {
        &self.failure
    }

    pub fn status(&self) -> &IssuerStatus {
        &self.status
    }

    pub fn into_status(self) -> IssuerStatus {
        *self.status
    }

    /// True when the pass stopped because the caller's token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.failure,
            SetupFailure::Authority(AcmeClientError::Cancelled)
                | SetupFailure::KeyProvision(KeyProvisionError::Store(
                    SecretStoreError::Cancelled
                ))
        )
    }
}
