//! Common types for strata: CRDs, errors, and utilities

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod telemetry;
pub mod template;
pub mod yaml;

pub use error::Error;

/// API group for strata custom resources
pub const STRATA_API_GROUP: &str = "strata.dev";

/// Label key marking resources managed by strata
pub const MANAGED_BY_LABEL_KEY: &str = "app.kubernetes.io/managed-by";

/// Value of the managed-by label for strata resources
pub const MANAGED_BY_LABEL_VALUE: &str = "strata";
