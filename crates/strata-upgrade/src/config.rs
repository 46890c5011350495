//! Upgrade-scoped configuration
//!
//! Templates are rendered against an [`UpgradeConfig`]: the defaults from
//! the template config file, overlaid with values taken from the target
//! Platform and its database credentials Secret.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use kube::ResourceExt;
use serde_json::{json, Map, Value};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use strata_common::crd::Platform;
use strata_common::yaml::parse_document;
use strata_common::Error;

use crate::client::ClusterClient;

/// Key of the database password inside the credentials Secret
pub const PASSWORD_SECRET_KEY: &str = "password";

/// Resolved template properties; always a JSON object
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpgradeConfig {
    properties: Map<String, Value>,
}

impl UpgradeConfig {
    /// Wrap a JSON object of properties
    pub fn new(properties: Value) -> Result<Self, Error> {
        match properties {
            Value::Object(properties) => Ok(Self { properties }),
            Value::Null => Ok(Self::default()),
            other => Err(Error::validation(format!(
                "upgrade properties must be a mapping, got {}",
                other
            ))),
        }
    }

    /// Properties as a JSON value, ready to use as a template context
    pub fn to_value(&self) -> Value {
        Value::Object(self.properties.clone())
    }

    /// Look up a dotted path such as `database.image`
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.properties.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Deep-merge `overlay` into these properties; overlay values win
    pub fn merge(&mut self, overlay: Value) {
        if let Value::Object(overlay) = overlay {
            merge_maps(&mut self.properties, overlay);
        }
    }
}

fn merge_maps(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_maps(existing, incoming)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Resolves the properties used to render upgrade templates
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Resolve properties for upgrading `platform`
    async fn properties(
        &self,
        client: Arc<dyn ClusterClient>,
        platform: &Platform,
    ) -> Result<UpgradeConfig, Error>;
}

/// Configuration provider reading defaults from a YAML template config file
pub struct TemplateConfigProvider {
    path: PathBuf,
}

impl TemplateConfigProvider {
    /// Create a provider for the template config file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load_defaults(&self) -> Result<UpgradeConfig, Error> {
        let source = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::validation(format!("failed to read template config {}: {}", source, e))
        })?;
        UpgradeConfig::new(parse_document(&source, &raw)?)
    }
}

/// Properties derived from the Platform resource itself
fn platform_properties(platform: &Platform) -> Result<Value, Error> {
    let namespace = platform
        .namespace()
        .ok_or_else(|| Error::validation(format!("platform {} has no namespace", platform.name_any())))?;

    let mut database = Map::new();
    let db = &platform.spec.database;
    for (key, value) in [
        ("image", &db.image),
        ("name", &db.name),
        ("user", &db.user),
        ("url", &db.url),
    ] {
        if let Some(value) = value {
            database.insert(key.to_string(), Value::String(value.clone()));
        }
    }

    Ok(json!({
        "name": platform.name_any(),
        "namespace": namespace,
        "version": platform.spec.version,
        "database": database,
    }))
}

#[async_trait]
impl ConfigurationProvider for TemplateConfigProvider {
    async fn properties(
        &self,
        client: Arc<dyn ClusterClient>,
        platform: &Platform,
    ) -> Result<UpgradeConfig, Error> {
        let mut config = self.load_defaults().await?;
        let overlay = platform_properties(platform)?;
        let namespace = overlay["namespace"].as_str().unwrap_or_default().to_string();
        config.merge(overlay);

        let secret = platform.credentials_secret_name();
        match client
            .get_secret_value(&namespace, &secret, PASSWORD_SECRET_KEY)
            .await?
        {
            Some(password) => config.merge(json!({ "database": { "password": password } })),
            None => debug!(secret = %secret, "database credentials secret not found, keeping defaults"),
        }

        Ok(config)
    }
}
