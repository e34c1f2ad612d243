use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::{
    account_key::AccountKeyProvisioner,
    error::{SetupError, SetupFailure},
    reasons::{
        ERROR_ACCOUNT_VERIFICATION_FAILED, MESSAGE_ACCOUNT_REGISTERED,
        MESSAGE_ACCOUNT_VERIFICATION_FAILED, MESSAGE_ACCOUNT_VERIFIED, SUCCESS_ACCOUNT_REGISTERED,
        SUCCESS_ACCOUNT_VERIFIED,
    },
};
use crate::{
    acme::{AcmeClientError, AcmeClientFactory, NewRegistration},
    config::ControllerConfig,
    domain::mailto_contact,
    events::{EventSeverity, EventSink},
    issuer::{AcmeIssuerConfig, ConditionStatus, GenericIssuer, IssuerConditionType, IssuerStatus},
    secrets::SecretStore,
};

/// Ensures an issuer's ACME account key exists and that the account is
/// registered with the ACME server.
pub struct AccountSetup {
    provisioner: AccountKeyProvisioner,
    acme: Arc<dyn AcmeClientFactory>,
    events: Arc<dyn EventSink>,
    cluster_resource_namespace: String,
}

impl AccountSetup {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        acme: Arc<dyn AcmeClientFactory>,
        events: Arc<dyn EventSink>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            provisioner: AccountKeyProvisioner::new(secrets),
            acme,
            events,
            cluster_resource_namespace: config.cluster_resource_namespace.clone(),
        }
    }

    /// Runs one setup pass and returns the issuer's next status.
    ///
    /// The issuer itself is never modified. On failure the returned error
    /// carries the `Ready=False` status to persist.
    pub async fn setup<I: GenericIssuer>(
        &self,
        cancel: &CancellationToken,
        issuer: &I,
    ) -> Result<IssuerStatus, SetupError> {
        let name = issuer.issuer_name();
        let status = issuer.issuer_status().cloned().unwrap_or_default();

        let acme = match validate_config(issuer.acme_config()) {
            Ok(acme) => acme,
            Err(failure) => return Err(SetupError::new(status, failure)),
        };
        let namespace = issuer.resource_namespace(&self.cluster_resource_namespace);

        debug!(
            "[account-setup] {name}: getting acme account private key '{namespace}/{}'",
            acme.private_key
        );
        let key = match self
            .provisioner
            .ensure_account_key(cancel, &namespace, &acme.private_key)
            .await
        {
            Ok(key) => key,
            Err(err) => return Err(SetupError::new(status, err.into())),
        };

        let client = match self.acme.client(key, &acme.server) {
            Ok(client) => client,
            Err(err) => return Err(SetupError::new(status, err.into())),
        };

        let recorded_uri = status.acme_uri().to_string();
        debug!("[account-setup] {name}: verifying existing registration with ACME server");
        match client.get_registration(cancel, &recorded_uri).await {
            Ok(_) => {
                debug!("[account-setup] {name}: verified existing registration with ACME server");
                return Ok(status.with_condition(
                    IssuerConditionType::Ready,
                    ConditionStatus::True,
                    SUCCESS_ACCOUNT_VERIFIED,
                    MESSAGE_ACCOUNT_VERIFIED,
                ));
            }
            Err(AcmeClientError::Cancelled) => {
                return Err(SetupError::new(status, AcmeClientError::Cancelled.into()));
            }
            Err(err) => {
                let message = format!("{MESSAGE_ACCOUNT_VERIFICATION_FAILED}{err}");
                if err.is_account_missing() {
                    debug!("[account-setup] {name}: {message}");
                } else {
                    warn!("[account-setup] {name}: {message}; falling back to registration");
                }
                self.events
                    .emit(
                        cancel,
                        &issuer.event_ref(),
                        EventSeverity::Warning,
                        ERROR_ACCOUNT_VERIFICATION_FAILED,
                        &message,
                    )
                    .await;
            }
        }

        let contact = match mailto_contact(&acme.email) {
            Ok(contact) => contact,
            Err(err) => return Err(SetupError::new(status, err.into())),
        };
        let registration = NewRegistration {
            contacts: vec![contact],
        };

        debug!("[account-setup] {name}: registering ACME account");
        match client.register(cancel, &registration, true).await {
            Ok(account) => {
                info!(
                    "[account-setup] {name}: registered ACME account {}",
                    account.uri
                );
                Ok(status
                    .with_condition(
                        IssuerConditionType::Ready,
                        ConditionStatus::True,
                        SUCCESS_ACCOUNT_REGISTERED,
                        MESSAGE_ACCOUNT_REGISTERED,
                    )
                    .with_acme_uri(account.uri))
            }
            Err(err) => Err(SetupError::new(status, err.into())),
        }
    }
}

fn validate_config(config: Option<&AcmeIssuerConfig>) -> Result<&AcmeIssuerConfig, SetupFailure> {
    let config = config
        .ok_or_else(|| SetupFailure::InvalidConfig("acme config may not be empty".into()))?;
    if config.server.trim().is_empty() {
        return Err(SetupFailure::InvalidConfig(
            "acme server URL may not be empty".into(),
        ));
    }
    if config.private_key.trim().is_empty() {
        return Err(SetupFailure::InvalidConfig(
            "acme private key secret name may not be empty".into(),
        ));
    }
    Ok(config)
}
