//! Platform Custom Resource Definition
//!
//! A Platform is the deployed application whose backing database is
//! upgraded. It owns every resource created by an upgrade step.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a Platform
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum PlatformPhase {
    /// Platform is being installed
    #[default]
    Installing,
    /// Platform is installed and serving
    Installed,
    /// An upgrade is running
    Upgrading,
    /// The last upgrade failed and was rolled back
    UpgradeFailed,
}

impl std::fmt::Display for PlatformPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installing => write!(f, "Installing"),
            Self::Installed => write!(f, "Installed"),
            Self::Upgrading => write!(f, "Upgrading"),
            Self::UpgradeFailed => write!(f, "UpgradeFailed"),
        }
    }
}

/// Database settings of a Platform
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSpec {
    /// Image used for database tooling such as the migration job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Database name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Database user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Connection URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Secret holding the database password under the `password` key.
    /// Defaults to `<platform>-db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_secret: Option<String>,
}

/// Status of a Platform
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    /// Current phase
    #[serde(default)]
    pub phase: PlatformPhase,

    /// Version currently installed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Version an in-flight upgrade is moving to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<String>,

    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Specification for a Platform
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "strata.dev",
    version = "v1alpha1",
    kind = "Platform",
    plural = "platforms",
    namespaced,
    status = "PlatformStatus",
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Desired platform version
    pub version: String,

    /// Database settings
    #[serde(default)]
    pub database: DatabaseSpec,
}

impl Platform {
    /// Name of the Secret holding the database password
    pub fn credentials_secret_name(&self) -> String {
        self.spec
            .database
            .credentials_secret
            .clone()
            .unwrap_or_else(|| format!("{}-db", self.metadata.name.as_deref().unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    fn sample_platform() -> Platform {
        Platform::new(
            "demo",
            PlatformSpec {
                version: "1.9.0".to_string(),
                database: DatabaseSpec::default(),
            },
        )
    }

    #[test]
    fn credentials_secret_defaults_to_platform_name() {
        let platform = sample_platform();
        assert_eq!(platform.credentials_secret_name(), "demo-db");
    }

    #[test]
    fn credentials_secret_override_wins() {
        let mut platform = sample_platform();
        platform.spec.database.credentials_secret = Some("pg-credentials".to_string());
        assert_eq!(platform.credentials_secret_name(), "pg-credentials");
    }

    #[test]
    fn crd_is_namespaced_under_strata_group() {
        let crd = Platform::crd();
        assert_eq!(crd.spec.group, crate::STRATA_API_GROUP);
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.names.kind, "Platform");
    }

    #[test]
    fn spec_reads_camel_case_fields() {
        let json = serde_json::json!({
            "version": "1.9.0",
            "database": { "image": "postgres:15", "credentialsSecret": "pg" }
        });
        let spec: PlatformSpec = serde_json::from_value(json).unwrap();
        assert_eq!(spec.database.image.as_deref(), Some("postgres:15"));
        assert_eq!(spec.database.credentials_secret.as_deref(), Some("pg"));
    }
}
