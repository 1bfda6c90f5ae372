//! Shared, version-pinned schema identifiers.
//!
//! These constants are the single source of truth for the schema/version
//! strings that appear in machine-readable output from the vfd tools.

pub const VFD_REGISTRY_SCHEMA_VERSION: &str = "vfd.registry@0.1.0";

pub const VFDC_REPORT_SCHEMA_VERSION: &str = "vfdc.report@0.1.0";
