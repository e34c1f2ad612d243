use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::key::{AccountKey, KeyError};

const ACCOUNT_DOES_NOT_EXIST: &str = "urn:ietf:params:acme:error:accountDoesNotExist";
const BAD_NONCE: &str = "urn:ietf:params:acme:error:badNonce";

/// Request body for `newAccount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRegistration {
    pub contacts: Vec<String>,
}

/// Account resource as reported by the ACME server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub uri: String,
    pub status: String,
    pub contacts: Vec<String>,
}

/// RFC 7807 problem document returned by the ACME server.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Problem {
    #[serde(rename = "type", default)]
    pub problem_type: String,
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub status: Option<u16>,
}

impl Problem {
    pub fn is_account_does_not_exist(&self) -> bool {
        self.problem_type == ACCOUNT_DOES_NOT_EXIST
    }

    pub fn is_bad_nonce(&self) -> bool {
        self.problem_type == BAD_NONCE
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self
            .status
            .map(|code| format!(" {code}"))
            .unwrap_or_default();
        match (self.problem_type.is_empty(), self.detail.is_empty()) {
            (false, false) => write!(f, "acme:{status} {}: {}", self.problem_type, self.detail),
            (false, true) => write!(f, "acme:{status} {}", self.problem_type),
            (true, _) => write!(f, "acme:{status} {}", self.detail),
        }
    }
}

#[derive(Debug, Error)]
pub enum AcmeClientError {
    #[error("no ACME account URI on record")]
    MissingAccountUri,
    #[error("{0}")]
    Problem(Problem),
    #[error("acme request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected ACME server response: {0}")]
    InvalidResponse(String),
    #[error("ACME account status is {0:?}")]
    AccountNotValid(String),
    #[error("account key error: {0}")]
    Key(#[from] KeyError),
    #[error("acme request cancelled")]
    Cancelled,
}

impl AcmeClientError {
    /// True when the server (or the local state) says there is no account,
    /// as opposed to the lookup itself failing.
    pub fn is_account_missing(&self) -> bool {
        match self {
            AcmeClientError::MissingAccountUri => true,
            AcmeClientError::Problem(problem) => problem.is_account_does_not_exist(),
            _ => false,
        }
    }
}

/// Account operations against one ACME directory, bound to one key.
#[async_trait]
pub trait AcmeClient: Send + Sync {
    /// Looks up an existing account by its URI.
    async fn get_registration(
        &self,
        cancel: &CancellationToken,
        uri: &str,
    ) -> Result<Registration, AcmeClientError>;

    async fn register(
        &self,
        cancel: &CancellationToken,
        registration: &NewRegistration,
        accept_tos: bool,
    ) -> Result<Registration, AcmeClientError>;
}

/// Builds clients from an account key and directory URL.
pub trait AcmeClientFactory: Send + Sync {
    fn client(
        &self,
        key: AccountKey,
        directory_url: &str,
    ) -> Result<Box<dyn AcmeClient>, AcmeClientError>;
}
