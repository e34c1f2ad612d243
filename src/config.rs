//! Controller configuration read from the process environment.

use std::time::Duration;

use log::warn;

const DEFAULT_CLUSTER_RESOURCE_NAMESPACE: &str = "kube-system";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_EVENT_REPORTER: &str = "acme-account-setup";

/// Where issuer events are published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EventTarget {
    /// core/v1 events on the issuer object.
    #[default]
    Kubernetes,
    /// Log lines only, for runs outside a cluster.
    Log,
}

#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Namespace holding account key secrets for cluster-scoped issuers.
    pub cluster_resource_namespace: String,
    /// Per-request timeout applied by the ACME HTTP transport.
    pub http_timeout: Duration,
    pub user_agent: String,
    /// Controller name recorded on published events.
    pub event_reporter: String,
    pub event_target: EventTarget,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cluster_resource_namespace: DEFAULT_CLUSTER_RESOURCE_NAMESPACE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            event_reporter: DEFAULT_EVENT_REPORTER.to_string(),
            event_target: EventTarget::default(),
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            cluster_resource_namespace: non_empty(lookup("ACME_SETUP_CLUSTER_RESOURCE_NAMESPACE"))
                .unwrap_or(defaults.cluster_resource_namespace),
            http_timeout: resolve_timeout(lookup("ACME_SETUP_HTTP_TIMEOUT_SECS")),
            user_agent: non_empty(lookup("ACME_SETUP_USER_AGENT")).unwrap_or(defaults.user_agent),
            event_reporter: non_empty(lookup("ACME_SETUP_EVENT_REPORTER"))
                .unwrap_or(defaults.event_reporter),
            event_target: resolve_event_target(lookup("ACME_SETUP_EVENTS")),
        }
    }
}

fn default_user_agent() -> String {
    format!("acme-account-setup/{}", env!("CARGO_PKG_VERSION"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn resolve_timeout(raw: Option<String>) -> Duration {
    let Some(raw) = raw else {
        return Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn!("[config] invalid ACME_SETUP_HTTP_TIMEOUT_SECS {raw:?}; using default");
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
        }
    }
}

fn resolve_event_target(raw: Option<String>) -> EventTarget {
    let Some(raw) = non_empty(raw) else {
        return EventTarget::default();
    };
    match raw.to_ascii_lowercase().as_str() {
        "kubernetes" | "kube" => EventTarget::Kubernetes,
        "log" => EventTarget::Log,
        _ => {
            warn!("[config] unknown ACME_SETUP_EVENTS {raw:?}; publishing to Kubernetes");
            EventTarget::Kubernetes
        }
    }
}
