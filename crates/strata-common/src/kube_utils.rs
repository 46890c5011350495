//! Shared Kubernetes utilities using kube-rs
//!
//! Manifests rendered at runtime arrive as `DynamicObject`s, so the
//! helpers here resolve the `ApiResource` from each object's own
//! `apiVersion`/`kind` rather than from compile-time types.

use std::path::Path;
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::{Api, DynamicObject, Patch, PatchParams, PostParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::ApiResource;
use kube::{Client, Config, Resource, ResourceExt};
use tracing::debug;

use crate::crd::Platform;
use crate::{Error, MANAGED_BY_LABEL_KEY, MANAGED_BY_LABEL_VALUE};

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::internal_with_context(
                    "create_client",
                    format!("failed to read kubeconfig {}: {}", path.display(), e),
                )
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };
    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Parse an apiVersion into (group, version); the core group is empty
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Irregular plurals of kinds that appear in upgrade manifests
const KIND_PLURALS: &[(&str, &str)] = &[
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("podsecuritypolicy", "podsecuritypolicies"),
];

/// Pluralize a Kubernetes resource kind
///
/// Uses a lookup table for irregular kinds, falling back to simple
/// English pluralization rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Build an ApiResource from an apiVersion and kind
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Resolve the ApiResource for a dynamic object from its own type metadata
pub fn api_resource_for(obj: &DynamicObject) -> Result<ApiResource, Error> {
    let types = obj.types.as_ref().ok_or_else(|| {
        Error::validation(format!(
            "resource {} has no apiVersion/kind",
            obj.metadata.name.as_deref().unwrap_or("<unnamed>")
        ))
    })?;
    Ok(build_api_resource(&types.api_version, &types.kind))
}

/// Kind of a dynamic object, or `"Unknown"` when it has no type metadata
pub fn kind_of(obj: &DynamicObject) -> &str {
    obj.types.as_ref().map(|t| t.kind.as_str()).unwrap_or("Unknown")
}

/// Outcome of a create-or-update call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The resource did not exist and was created
    Created,
    /// The resource existed and was changed
    Updated,
    /// The resource existed and already matched
    Unchanged,
}

impl ApplyOutcome {
    /// Whether the call created the resource
    pub fn created(self) -> bool {
        self == ApplyOutcome::Created
    }

    /// Whether the call modified an existing resource
    pub fn updated(self) -> bool {
        self == ApplyOutcome::Updated
    }
}

/// Create a resource, or merge it onto the live object if it already exists.
///
/// Never create-only: re-applying the same manifest is safe and yields
/// `Unchanged` when the server did not bump the resourceVersion.
pub async fn create_or_update(client: &Client, obj: &DynamicObject) -> Result<ApplyOutcome, Error> {
    let ar = api_resource_for(obj)?;
    let name = obj
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| Error::validation(format!("{} has no metadata.name", ar.kind)))?;

    let api: Api<DynamicObject> = match obj.metadata.namespace.as_deref() {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &ar),
        None => Api::all_with(client.clone(), &ar),
    };

    let Some(existing) = api.get_opt(name).await? else {
        debug!(kind = %ar.kind, name = %name, "creating resource");
        api.create(&PostParams::default(), obj).await?;
        return Ok(ApplyOutcome::Created);
    };

    debug!(kind = %ar.kind, name = %name, "updating existing resource");
    let patched = api
        .patch(name, &PatchParams::default(), &Patch::Merge(obj))
        .await?;

    if patched.metadata.resource_version == existing.metadata.resource_version {
        Ok(ApplyOutcome::Unchanged)
    } else {
        Ok(ApplyOutcome::Updated)
    }
}

/// Build a controller owner reference pointing at a Platform
pub fn platform_owner_reference(platform: &Platform) -> Result<OwnerReference, Error> {
    let name = platform.name_any();
    let uid = platform.metadata.uid.clone().ok_or_else(|| {
        Error::validation(format!("platform {} has no uid; fetch it from the API server first", name))
    })?;
    Ok(OwnerReference {
        api_version: Platform::api_version(&()).to_string(),
        kind: Platform::kind(&()).to_string(),
        name,
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Stamp a rendered resource with the target namespace, the managed-by
/// label and a Platform owner reference.
///
/// Any owner reference to the same Platform uid is replaced rather than duplicated.
pub fn set_namespace_and_owner(
    obj: &mut DynamicObject,
    platform: &Platform,
    namespace: &str,
) -> Result<(), Error> {
    let owner = platform_owner_reference(platform)?;
    obj.metadata.namespace = Some(namespace.to_string());
    obj.labels_mut().insert(
        MANAGED_BY_LABEL_KEY.to_string(),
        MANAGED_BY_LABEL_VALUE.to_string(),
    );
    let refs = obj.metadata.owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DatabaseSpec, PlatformSpec};
    use kube::core::TypeMeta;

    fn sample_platform() -> Platform {
        let mut platform = Platform::new(
            "demo",
            PlatformSpec {
                version: "1.9.0".to_string(),
                database: DatabaseSpec::default(),
            },
        );
        platform.metadata.namespace = Some("apps".to_string());
        platform.metadata.uid = Some("uid-1234".to_string());
        platform
    }

    fn job_object() -> DynamicObject {
        let mut obj = DynamicObject::new("upgrade-db-migration", &build_api_resource("batch/v1", "Job"));
        obj.types = Some(TypeMeta {
            api_version: "batch/v1".to_string(),
            kind: "Job".to_string(),
        });
        obj
    }

    #[test]
    fn test_pluralize_kind() {
        assert_eq!(pluralize_kind("Job"), "jobs");
        assert_eq!(pluralize_kind("Pod"), "pods");
        assert_eq!(pluralize_kind("ConfigMap"), "configmaps");
        assert_eq!(pluralize_kind("Ingress"), "ingresses");
        assert_eq!(pluralize_kind("NetworkPolicy"), "networkpolicies");
        assert_eq!(pluralize_kind("Endpoints"), "endpoints");
        assert_eq!(pluralize_kind("Gateway"), "gateways");
    }

    #[test]
    fn test_parse_api_version() {
        assert_eq!(
            parse_api_version("batch/v1"),
            ("batch".to_string(), "v1".to_string())
        );
        assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
    }

    #[test]
    fn test_api_resource_for_job() {
        let ar = api_resource_for(&job_object()).unwrap();
        assert_eq!(ar.group, "batch");
        assert_eq!(ar.version, "v1");
        assert_eq!(ar.plural, "jobs");
    }

    #[test]
    fn test_api_resource_requires_type_meta() {
        let mut obj = job_object();
        obj.types = None;
        assert!(matches!(api_resource_for(&obj), Err(Error::Validation { .. })));
        assert_eq!(kind_of(&obj), "Unknown");
    }

    #[test]
    fn test_set_namespace_and_owner() {
        let platform = sample_platform();
        let mut obj = job_object();
        obj.metadata.namespace = Some("upgrade".to_string());

        set_namespace_and_owner(&mut obj, &platform, "apps").unwrap();

        assert_eq!(obj.metadata.namespace.as_deref(), Some("apps"));
        assert_eq!(
            obj.labels().get(MANAGED_BY_LABEL_KEY).map(String::as_str),
            Some("strata")
        );
        let refs = obj.metadata.owner_references.as_ref().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, "Platform");
        assert_eq!(refs[0].api_version, "strata.dev/v1alpha1");
        assert_eq!(refs[0].name, "demo");
        assert_eq!(refs[0].uid, "uid-1234");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn test_set_owner_twice_keeps_single_reference() {
        let platform = sample_platform();
        let mut obj = job_object();
        set_namespace_and_owner(&mut obj, &platform, "apps").unwrap();
        set_namespace_and_owner(&mut obj, &platform, "apps").unwrap();
        assert_eq!(obj.metadata.owner_references.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_owner_requires_uid() {
        let mut platform = sample_platform();
        platform.metadata.uid = None;
        let mut obj = job_object();
        assert!(set_namespace_and_owner(&mut obj, &platform, "apps").is_err());
    }

    #[test]
    fn test_apply_outcome_flags() {
        assert!(ApplyOutcome::Created.created());
        assert!(!ApplyOutcome::Created.updated());
        assert!(ApplyOutcome::Updated.updated());
        assert!(!ApplyOutcome::Unchanged.created());
        assert!(!ApplyOutcome::Unchanged.updated());
    }
}
