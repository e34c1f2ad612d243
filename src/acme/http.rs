//! RFC 8555 account endpoints over HTTPS.
//!
//! Only the pieces account setup needs are implemented: directory discovery,
//! nonce management, `newAccount`, and POST-as-GET on an account URL.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use log::debug;
use reqwest::{
    Client, Response,
    header::{CONTENT_TYPE, HeaderMap, LOCATION},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use super::{
    client::{AcmeClient, AcmeClientError, AcmeClientFactory, NewRegistration, Problem, Registration},
    jws::{self, KeyId},
    key::AccountKey,
};
use crate::{cancel::run_cancellable, config::ControllerConfig};

const REPLAY_NONCE: &str = "replay-nonce";
const JOSE_JSON: &str = "application/jose+json";
const STATUS_VALID: &str = "valid";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Directory {
    new_nonce: String,
    new_account: String,
}

#[derive(Debug, Default, Deserialize)]
struct AccountResource {
    #[serde(default)]
    status: String,
    #[serde(default)]
    contact: Vec<String>,
}

/// Produces [`HttpAcmeClient`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpAcmeClientFactory {
    http: Client,
}

impl HttpAcmeClientFactory {
    pub fn new(config: &ControllerConfig) -> Result<Self, AcmeClientError> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self { http })
    }

    /// Uses a caller-configured HTTP client, e.g. one trusting a test CA.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

impl AcmeClientFactory for HttpAcmeClientFactory {
    fn client(
        &self,
        key: AccountKey,
        directory_url: &str,
    ) -> Result<Box<dyn AcmeClient>, AcmeClientError> {
        Ok(Box::new(HttpAcmeClient::new(
            self.http.clone(),
            key,
            directory_url,
        )))
    }
}

pub struct HttpAcmeClient {
    http: Client,
    key: AccountKey,
    directory_url: String,
    directory: OnceCell<Directory>,
    nonce: Mutex<Option<String>>,
}

impl HttpAcmeClient {
    pub fn new(http: Client, key: AccountKey, directory_url: impl Into<String>) -> Self {
        Self {
            http,
            key,
            directory_url: directory_url.into(),
            directory: OnceCell::new(),
            nonce: Mutex::new(None),
        }
    }

    async fn directory(&self) -> Result<&Directory, AcmeClientError> {
        self.directory
            .get_or_try_init(|| async {
                debug!("[acme-http] fetching directory {}", self.directory_url);
                let response = self.http.get(&self.directory_url).send().await?;
                if !response.status().is_success() {
                    return Err(AcmeClientError::Problem(read_problem(response).await));
                }
                response.json::<Directory>().await.map_err(|err| {
                    AcmeClientError::InvalidResponse(format!("invalid directory document: {err}"))
                })
            })
            .await
    }

    async fn nonce(&self) -> Result<String, AcmeClientError> {
        if let Some(nonce) = self.take_cached_nonce() {
            return Ok(nonce);
        }
        let new_nonce_url = self.directory().await?.new_nonce.clone();
        let response = self.http.head(&new_nonce_url).send().await?;
        extract_nonce(response.headers()).ok_or_else(|| {
            AcmeClientError::InvalidResponse("newNonce response had no Replay-Nonce".into())
        })
    }

    fn take_cached_nonce(&self) -> Option<String> {
        self.nonce
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn remember_nonce(&self, headers: &HeaderMap) {
        if let Some(nonce) = extract_nonce(headers) {
            *self.nonce.lock().unwrap_or_else(PoisonError::into_inner) = Some(nonce);
        }
    }

    /// Signed POST; a `badNonce` rejection is retried once with a fresh nonce.
    async fn post(
        &self,
        url: &str,
        key_id: KeyId<'_>,
        payload: Option<&Value>,
    ) -> Result<Response, AcmeClientError> {
        let mut retried = false;
        loop {
            let nonce = self.nonce().await?;
            let body = jws::sign(&self.key, key_id, &nonce, url, payload)?;
            let response = self
                .http
                .post(url)
                .header(CONTENT_TYPE, JOSE_JSON)
                .body(body.to_string())
                .send()
                .await?;
            self.remember_nonce(response.headers());

            if response.status().is_success() {
                return Ok(response);
            }

            let problem = read_problem(response).await;
            if problem.is_bad_nonce() && !retried {
                debug!("[acme-http] badNonce from {url}, retrying with a fresh nonce");
                retried = true;
                continue;
            }
            return Err(AcmeClientError::Problem(problem));
        }
    }

    async fn lookup(&self, uri: &str) -> Result<Registration, AcmeClientError> {
        debug!("[acme-http] POST-as-GET account {uri}");
        let response = self.post(uri, KeyId::Kid(uri), None).await?;
        let account = read_account(response).await?;
        into_registration(uri.to_string(), account)
    }

    async fn new_account(
        &self,
        registration: &NewRegistration,
        accept_tos: bool,
    ) -> Result<Registration, AcmeClientError> {
        let new_account_url = self.directory().await?.new_account.clone();
        let payload = json!({
            "termsOfServiceAgreed": accept_tos,
            "contact": registration.contacts,
        });
        debug!("[acme-http] newAccount at {new_account_url}");
        let response = self
            .post(&new_account_url, KeyId::Jwk, Some(&payload))
            .await?;
        let uri = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                AcmeClientError::InvalidResponse("newAccount response had no Location".into())
            })?;
        let account = read_account(response).await?;
        into_registration(uri, account)
    }
}

#[async_trait]
impl AcmeClient for HttpAcmeClient {
    async fn get_registration(
        &self,
        cancel: &CancellationToken,
        uri: &str,
    ) -> Result<Registration, AcmeClientError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(AcmeClientError::MissingAccountUri);
        }
        run_cancellable(cancel, self.lookup(uri), || AcmeClientError::Cancelled).await
    }

    async fn register(
        &self,
        cancel: &CancellationToken,
        registration: &NewRegistration,
        accept_tos: bool,
    ) -> Result<Registration, AcmeClientError> {
        run_cancellable(
            cancel,
            self.new_account(registration, accept_tos),
            || AcmeClientError::Cancelled,
        )
        .await
    }
}

fn extract_nonce(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REPLAY_NONCE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn read_problem(response: Response) -> Problem {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    match serde_json::from_slice::<Problem>(&body) {
        Ok(problem) if !problem.problem_type.is_empty() || !problem.detail.is_empty() => Problem {
            status: problem.status.or(Some(status.as_u16())),
            ..problem
        },
        _ => Problem {
            problem_type: String::new(),
            detail: format!(
                "unexpected HTTP status {}: {}",
                status,
                String::from_utf8_lossy(&body).trim()
            ),
            status: Some(status.as_u16()),
        },
    }
}

async fn read_account(response: Response) -> Result<AccountResource, AcmeClientError> {
    let body = response.bytes().await?;
    if body.is_empty() {
        return Ok(AccountResource::default());
    }
    serde_json::from_slice(&body).map_err(|err| {
        AcmeClientError::InvalidResponse(format!("invalid account document: {err}"))
    })
}

fn into_registration(
    uri: String,
    account: AccountResource,
) -> Result<Registration, AcmeClientError> {
    if account.status != STATUS_VALID {
        return Err(AcmeClientError::AccountNotValid(account.status));
    }
    Ok(Registration {
        uri,
        status: account.status,
        contacts: account.contact,
    })
}
