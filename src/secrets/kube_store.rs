use async_trait::async_trait;
use k8s_openapi::{ByteString, api::core::v1::Secret};
use kube::{
    Api, Client,
    api::{ObjectMeta, PostParams},
};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::store::{SecretData, SecretStore, SecretStoreError};
use crate::cancel::run_cancellable;

/// Secret storage backed by Kubernetes `Secret` objects.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn read(&self, namespace: &str, name: &str) -> Result<SecretData, SecretStoreError> {
        let secret = self
            .api(namespace)
            .get(name)
            .await
            .map_err(|err| map_error(namespace, name, err))?;
        Ok(secret_data(secret))
    }

    async fn create(
        &self,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, SecretStoreError> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            data: Some(
                data.into_iter()
                    .map(|(key, value)| (key, ByteString(value)))
                    .collect(),
            ),
            ..Secret::default()
        };

        match self
            .api(namespace)
            .create(&PostParams::default(), &secret)
            .await
        {
            Ok(created) => {
                info!("[secrets] created secret {namespace}/{name}");
                Ok(secret_data(created))
            }
            Err(kube::Error::Api(resp)) if resp.code == 409 => {
                debug!("[secrets] secret {namespace}/{name} already exists, reading it back");
                self.read(namespace, name).await
            }
            Err(err) => Err(map_error(namespace, name, err)),
        }
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
    ) -> Result<SecretData, SecretStoreError> {
        run_cancellable(cancel, self.read(namespace, name), || {
            SecretStoreError::Cancelled
        })
        .await
    }

    async fn create_if_absent(
        &self,
        cancel: &CancellationToken,
        namespace: &str,
        name: &str,
        data: SecretData,
    ) -> Result<SecretData, SecretStoreError> {
        run_cancellable(cancel, self.create(namespace, name, data), || {
            SecretStoreError::Cancelled
        })
        .await
    }
}

fn secret_data(secret: Secret) -> SecretData {
    secret
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|(key, value)| (key, value.0))
        .collect()
}

fn map_error(namespace: &str, name: &str, err: kube::Error) -> SecretStoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => SecretStoreError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(resp) => SecretStoreError::Store(format!(
            "{} ({}): {}",
            resp.reason, resp.code, resp.message
        )),
        other => SecretStoreError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use kube::core::ErrorResponse;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const SECRETS_PATH: &str = "/api/v1/namespaces/default/secrets";
    const KEY_SECRET_PATH: &str = "/api/v1/namespaces/default/secrets/acme-key";

    fn store_for(server: &MockServer) -> KubeSecretStore {
        let config = kube::Config::new(server.uri().parse().unwrap());
        KubeSecretStore::new(Client::try_from(config).unwrap())
    }

    fn status_body(code: u16, reason: &str) -> serde_json::Value {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "metadata": {},
            "status": "Failure",
            "message": format!("secrets \"acme-key\" {reason}"),
            "reason": reason,
            "code": code,
        })
    }

    fn secret_body(pem: &[u8]) -> serde_json::Value {
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": { "name": "acme-key", "namespace": "default" },
            "data": { "tls.key": STANDARD.encode(pem) },
        })
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{reason} happened"),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn maps_404_to_not_found() {
        let err = map_error("default", "acme-key", api_error(404, "NotFound"));
        assert!(err.is_not_found());
    }

    #[test]
    fn maps_other_api_errors_to_store_errors() {
        let err = map_error("default", "acme-key", api_error(403, "Forbidden"));
        assert!(matches!(err, SecretStoreError::Store(_)));
        assert!(err.to_string().contains("Forbidden (403)"));
    }

    #[test]
    fn flattens_secret_bytes() {
        let secret = Secret {
            data: Some(
                [("tls.key".to_string(), ByteString(b"pem".to_vec()))]
                    .into_iter()
                    .collect(),
            ),
            ..Secret::default()
        };
        let data = secret_data(secret);
        assert_eq!(data.get("tls.key").map(Vec::as_slice), Some(&b"pem"[..]));
    }

    #[tokio::test]
    async fn conflict_on_create_returns_the_existing_secret() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SECRETS_PATH))
            .respond_with(ResponseTemplate::new(409).set_body_json(status_body(409, "AlreadyExists")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(KEY_SECRET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(secret_body(b"winner")))
            .expect(1)
            .mount(&server)
            .await;

        let stored = store_for(&server)
            .create_if_absent(
                &CancellationToken::new(),
                "default",
                "acme-key",
                SecretData::from([("tls.key".to_string(), b"loser".to_vec())]),
            )
            .await
            .unwrap();

        assert_eq!(stored.get("tls.key").map(Vec::as_slice), Some(&b"winner"[..]));
    }

    #[tokio::test]
    async fn missing_secret_reads_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEY_SECRET_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(status_body(404, "NotFound")))
            .mount(&server)
            .await;

        let err = store_for(&server)
            .get(&CancellationToken::new(), "default", "acme-key")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "secret default/acme-key not found");
    }
}
