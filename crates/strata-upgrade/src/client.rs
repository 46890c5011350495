//! Cluster access for upgrade steps
//!
//! Steps talk to Kubernetes only through [`ClusterClient`], obtained from
//! [`ClientTools`]. Both are traits so tests can substitute mocks.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Pod, Secret};
use kube::api::{Api, DeleteParams, DynamicObject, ListParams};
use kube::Client;
use tokio::sync::OnceCell;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use strata_common::kube_utils::{self, ApplyOutcome};
use strata_common::Error;

/// Kubernetes operations needed by upgrade steps
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create the resource, or update it in place if it already exists
    async fn create_or_update(&self, resource: &DynamicObject) -> Result<ApplyOutcome, Error>;

    /// Fetch a Job by namespace and name
    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, Error>;

    /// Delete a Job by namespace and name
    ///
    /// An absent Job is reported as an error for which
    /// [`Error::is_not_found`] holds; the caller decides whether that matters.
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), Error>;

    /// Delete every Pod in `namespace` matching `label_selector`
    async fn delete_pods(&self, namespace: &str, label_selector: &str) -> Result<(), Error>;

    /// Read one key of a Secret, `None` if the Secret or key is absent
    async fn get_secret_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, Error>;
}

/// Source of cluster clients
///
/// Client construction can fail (bad kubeconfig, unreachable API server),
/// which steps treat as fatal.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClientTools: Send + Sync {
    /// Get a client for the target cluster
    async fn cluster_client(&self) -> Result<Arc<dyn ClusterClient>, Error>;
}

/// Real Kubernetes client implementation
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Create a new KubeClusterClient wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_or_update(&self, resource: &DynamicObject) -> Result<ApplyOutcome, Error> {
        kube_utils::create_or_update(&self.client, resource).await
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Job, Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<(), Error> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        debug!(job = %name, namespace = %namespace, "job deleted");
        Ok(())
    }

    async fn delete_pods(&self, namespace: &str, label_selector: &str) -> Result<(), Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.delete_collection(
            &DeleteParams::default(),
            &ListParams::default().labels(label_selector),
        )
        .await?;
        debug!(selector = %label_selector, namespace = %namespace, "pods deleted");
        Ok(())
    }

    async fn get_secret_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<Option<String>, Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let Some(secret) = api.get_opt(name).await? else {
            return Ok(None);
        };
        secret
            .data
            .and_then(|mut data| data.remove(key))
            .map(|bytes| {
                String::from_utf8(bytes.0).map_err(|e| {
                    Error::serialization_for_kind(
                        "Secret",
                        format!("{}/{} key {} is not UTF-8: {}", namespace, name, key, e),
                    )
                })
            })
            .transpose()
    }
}

/// Client tools backed by a kubeconfig (or in-cluster config when `None`)
///
/// The kube client is created on first use and reused afterwards.
pub struct KubeClientTools {
    kubeconfig: Option<PathBuf>,
    client: OnceCell<Client>,
}

impl KubeClientTools {
    /// Create client tools for an optional kubeconfig path
    pub fn new(kubeconfig: Option<PathBuf>) -> Self {
        Self {
            kubeconfig,
            client: OnceCell::new(),
        }
    }

    /// Get the underlying kube client, creating it if needed
    pub async fn kube_client(&self) -> Result<Client, Error> {
        self.client
            .get_or_try_init(|| kube_utils::create_client(self.kubeconfig.as_deref()))
            .await
            .cloned()
    }
}

#[async_trait]
impl ClientTools for KubeClientTools {
    async fn cluster_client(&self) -> Result<Arc<dyn ClusterClient>, Error> {
        let client = self.kube_client().await?;
        Ok(Arc::new(KubeClusterClient::new(client)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreadable_kubeconfig_fails_client_construction() {
        let dir = tempfile::tempdir().unwrap();
        let tools = KubeClientTools::new(Some(dir.path().join("missing-kubeconfig")));

        let err = match tools.cluster_client().await {
            Ok(_) => panic!("expected client construction to fail"),
            Err(e) => e,
        };
        assert_eq!(err.context(), Some("create_client"));
    }

    #[tokio::test]
    async fn malformed_kubeconfig_fails_client_construction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kubeconfig");
        std::fs::write(&path, "clusters: [not, a, kubeconfig").unwrap();
        let tools = KubeClientTools::new(Some(path));

        assert!(tools.kube_client().await.is_err());
    }
}
