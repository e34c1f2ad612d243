use std::{process::ExitCode, sync::Arc};

use acme_account_setup::{
    AccountSetup, ControllerConfig,
    acme::HttpAcmeClientFactory,
    config::EventTarget,
    events::{EventSink, KubeEventSink, LogEventSink},
    issuer::{ClusterIssuer, GenericIssuer, Issuer, IssuerStatus},
    secrets::KubeSecretStore,
};
use anyhow::{Context, Result, anyhow};
use kube::{
    Api, Client, Resource,
    api::{Patch, PatchParams},
};
use log::{error, info};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: acme-account-setup issuer <namespace> <name> | clusterissuer <name>";

enum Target {
    Issuer { namespace: String, name: String },
    ClusterIssuer { name: String },
}

fn parse_args(args: &[String]) -> Result<Target> {
    match args {
        [kind, namespace, name] if kind == "issuer" => Ok(Target::Issuer {
            namespace: namespace.clone(),
            name: name.clone(),
        }),
        [kind, name] if kind == "clusterissuer" => Ok(Target::ClusterIssuer { name: name.clone() }),
        _ => Err(anyhow!(USAGE)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("[main] {err:#}");
            ExitCode::from(2)
        }
    }
}

/// Returns whether the issuer ended up ready.
async fn run(args: &[String]) -> Result<bool> {
    let target = parse_args(args)?;
    let config = ControllerConfig::from_env();
    let client = Client::try_default()
        .await
        .context("failed to build Kubernetes client")?;

    let events: Arc<dyn EventSink> = match config.event_target {
        EventTarget::Kubernetes => Arc::new(KubeEventSink::new(
            client.clone(),
            config.event_reporter.clone(),
        )),
        EventTarget::Log => Arc::new(LogEventSink),
    };
    let setup = AccountSetup::new(
        Arc::new(KubeSecretStore::new(client.clone())),
        Arc::new(HttpAcmeClientFactory::new(&config).context("failed to build ACME HTTP client")?),
        events,
        &config,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    match target {
        Target::Issuer { namespace, name } => {
            let api: Api<Issuer> = Api::namespaced(client, &namespace);
            reconcile_once(&setup, &cancel, &api, &name).await
        }
        Target::ClusterIssuer { name } => {
            let api: Api<ClusterIssuer> = Api::all(client);
            reconcile_once(&setup, &cancel, &api, &name).await
        }
    }
}

async fn reconcile_once<K>(
    setup: &AccountSetup,
    cancel: &CancellationToken,
    api: &Api<K>,
    name: &str,
) -> Result<bool>
where
    K: GenericIssuer + Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    let issuer = api
        .get(name)
        .await
        .with_context(|| format!("failed to fetch issuer {name}"))?;

    let (status, ready) = match setup.setup(cancel, &issuer).await {
        Ok(status) => (status, true),
        Err(err) => {
            error!("[main] {name}: {err}");
            (err.into_status(), false)
        }
    };

    if issuer.issuer_status() != Some(&status) {
        write_status(api, name, &status).await?;
    }
    if ready {
        info!("[main] {name}: account ready");
    }
    Ok(ready)
}

async fn write_status<K>(api: &Api<K>, name: &str, status: &IssuerStatus) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + std::fmt::Debug,
{
    let patch = json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("failed to write status for issuer {name}"))?;
    Ok(())
}
