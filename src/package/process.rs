//! Pre-packaging data processing hook.
//!
//! The packaging utility does not know how to collect or transform data; the
//! caller plugs that in through [`DataProcessor`]. Out of the box nothing runs.

use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// What the caller wants processed before the package is assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        if let Some(ns) = &self.namespace {
            write!(f, "/{}", ns)?;
        }
        if let Some(name) = &self.name {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

/// Transforms or collects data into the staging directory.
pub trait DataProcessor: Send + Sync {
    fn process(&self, source_dir: &Path, resource: &ResourceDescriptor) -> Result<()>;
}

/// Does nothing. Never touches the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessor;

impl DataProcessor for NoopProcessor {
    fn process(&self, _source_dir: &Path, _resource: &ResourceDescriptor) -> Result<()> {
        Ok(())
    }
}

impl<F> DataProcessor for F
where
    F: Fn(&Path, &ResourceDescriptor) -> Result<()> + Send + Sync,
{
    fn process(&self, source_dir: &Path, resource: &ResourceDescriptor) -> Result<()> {
        self(source_dir, resource)
    }
}
