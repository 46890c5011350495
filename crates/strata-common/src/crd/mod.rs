//! Custom Resource Definitions for strata

mod platform;

pub use platform::{DatabaseSpec, Platform, PlatformPhase, PlatformSpec, PlatformStatus};
