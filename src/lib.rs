//! supportpack -- support package preparation.
//!
//! Dumps in-memory values to structured files, bundles a staging directory
//! into a `.tar.gz` for a support ticket, and removes the directory only once
//! the archive is safely on disk.

pub mod config;
pub mod package;
pub mod telemetry;

pub use config::SupportConfig;
pub use package::{
    FailurePolicy, Outcome, PackageReport, PackagingError, PackagingUtility, ResourceDescriptor,
};
