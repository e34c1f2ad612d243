use k8s_openapi::api::core::v1::ObjectReference;
use kube::{CustomResource, Resource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::status::IssuerStatus;

/// ACME settings shared by namespaced and cluster-scoped issuers.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AcmeIssuerConfig {
    /// ACME directory URL, e.g. `https://acme-v02.api.letsencrypt.org/directory`.
    pub server: String,
    /// Contact address registered with the account.
    #[serde(default)]
    pub email: String,
    /// Name of the secret holding the account private key.
    pub private_key: String,
}

#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "certmanager.k8s.io",
    version = "v1alpha1",
    kind = "Issuer",
    namespaced,
    status = "IssuerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acme: Option<AcmeIssuerConfig>,
}

#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "certmanager.k8s.io",
    version = "v1alpha1",
    kind = "ClusterIssuer",
    status = "IssuerStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acme: Option<AcmeIssuerConfig>,
}

/// Read-only view over either issuer kind.
pub trait GenericIssuer: Send + Sync {
    fn issuer_name(&self) -> String;

    /// Namespace in which the issuer's secrets live.
    fn resource_namespace(&self, cluster_resource_namespace: &str) -> String;

    fn acme_config(&self) -> Option<&AcmeIssuerConfig>;

    fn issuer_status(&self) -> Option<&IssuerStatus>;

    fn event_ref(&self) -> ObjectReference;
}

impl GenericIssuer for Issuer {
    fn issuer_name(&self) -> String {
        self.name_any()
    }

    fn resource_namespace(&self, _cluster_resource_namespace: &str) -> String {
        self.namespace().unwrap_or_else(|| "default".to_string())
    }

    fn acme_config(&self) -> Option<&AcmeIssuerConfig> {
        self.spec.acme.as_ref()
    }

    fn issuer_status(&self) -> Option<&IssuerStatus> {
        self.status.as_ref()
    }

    fn event_ref(&self) -> ObjectReference {
        self.object_ref(&())
    }
}

impl GenericIssuer for ClusterIssuer {
    fn issuer_name(&self) -> String {
        self.name_any()
    }

    fn resource_namespace(&self, cluster_resource_namespace: &str) -> String {
        cluster_resource_namespace.to_string()
    }

    fn acme_config(&self) -> Option<&AcmeIssuerConfig> {
        self.spec.acme.as_ref()
    }

    fn issuer_status(&self) -> Option<&IssuerStatus> {
        self.status.as_ref()
    }

    fn event_ref(&self) -> ObjectReference {
        self.object_ref(&())
    }
}
