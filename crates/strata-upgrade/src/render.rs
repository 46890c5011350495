//! Rendering of upgrade manifests
//!
//! The renderer turns a template directory plus an [`UpgradeConfig`] into
//! the resources to apply. Resource order follows file name order, then
//! document order within a file.

use std::path::{Path, PathBuf};

use kube::api::DynamicObject;
use serde_json::Value;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use strata_common::template::TemplateEngine;
use strata_common::yaml::parse_manifests;
use strata_common::Error;

use crate::config::UpgradeConfig;

/// File extensions treated as manifest templates
const TEMPLATE_EXTENSIONS: &[&str] = &["yml", "yaml", "tmpl"];

/// Produces the resources of an upgrade from templates and configuration
#[cfg_attr(test, automock)]
pub trait ManifestRenderer: Send + Sync {
    /// Render every template under `template_dir`
    fn render(
        &self,
        template_dir: &str,
        config: &UpgradeConfig,
    ) -> Result<Vec<DynamicObject>, Error>;
}

/// Renders templates from a directory tree on disk
pub struct TemplateDirRenderer {
    root: PathBuf,
    engine: TemplateEngine,
}

impl TemplateDirRenderer {
    /// Create a renderer resolving template directories relative to `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            engine: TemplateEngine::new(),
        }
    }

    fn template_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            Error::validation(format!(
                "failed to read template directory {}: {}",
                dir.display(),
                e
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| Error::validation(format!("{}: {}", dir.display(), e)))?
                .path();
            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext));
            if path.is_file() && is_template {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Convert one rendered YAML document into a dynamic object
fn to_dynamic_object(file: &str, doc: Value) -> Result<DynamicObject, Error> {
    let obj: DynamicObject = serde_json::from_value(doc)
        .map_err(|e| Error::serialization(format!("{}: {}", file, e)))?;
    if obj.types.is_none() {
        return Err(Error::validation(format!(
            "{}: resource has no apiVersion/kind",
            file
        )));
    }
    if obj.metadata.name.is_none() {
        return Err(Error::validation(format!(
            "{}: resource has no metadata.name",
            file
        )));
    }
    Ok(obj)
}

impl ManifestRenderer for TemplateDirRenderer {
    fn render(
        &self,
        template_dir: &str,
        config: &UpgradeConfig,
    ) -> Result<Vec<DynamicObject>, Error> {
        let dir = self.root.join(template_dir);
        let ctx = config.to_value();
        let mut resources = Vec::new();

        for path in Self::template_files(&dir)? {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source = std::fs::read_to_string(&path)
                .map_err(|e| Error::validation(format!("failed to read {}: {}", file, e)))?;

            let rendered = self.engine.render(&file, &source, &ctx)?;
            for doc in parse_manifests(&file, &rendered)? {
                resources.push(to_dynamic_object(&file, doc)?);
            }
            debug!(template = %file, total = resources.len(), "rendered template");
        }

        Ok(resources)
    }
}
