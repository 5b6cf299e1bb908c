//! Support package preparation: structured dumps, tar.gz bundling, and the
//! pre-packaging processing hook.

pub mod archive;
pub mod naming;
pub mod process;
pub mod structured;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

pub use archive::{ArchivedDir, PackageReport};
pub use process::{DataProcessor, NoopProcessor, ResourceDescriptor};

use crate::config::PackageConfig;

pub const DEFAULT_COMPONENT: &str = "PackagingUtility";
pub const DEFAULT_COMPRESSION: u32 = 6;

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("{} is not a valid directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("archive {} would be written inside {}", archive.display(), source_dir.display())]
    ArchiveInsideSource { archive: PathBuf, source_dir: PathBuf },

    #[error("failed to serialize value for {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to archive {} into {}: {source}", source_dir.display(), archive.display())]
    Archive {
        archive: PathBuf,
        source_dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive written but {} could not be removed: {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("processing {resource} failed: {source}")]
    Processing {
        resource: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PackagingError {
    /// Caller mistakes detected before anything touches the filesystem.
    /// These are returned as `Err` under every [`FailurePolicy`].
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PackagingError::NotADirectory { .. } | PackagingError::ArchiveInsideSource { .. }
        )
    }
}

/// What to do with I/O and serialization failures after they are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the failure as `Err`.
    #[default]
    Propagate,
    /// Return `Ok(Outcome::Logged(..))` so the surrounding flow keeps going.
    LogAndContinue,
}

/// Result of an operation that may have been allowed to fail under
/// [`FailurePolicy::LogAndContinue`].
#[derive(Debug)]
pub enum Outcome<T> {
    Done(T),
    Logged(PackagingError),
}

impl<T> Outcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done(_))
    }

    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(v) => Some(v),
            Outcome::Logged(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PackagingError> {
        match self {
            Outcome::Done(_) => None,
            Outcome::Logged(e) => Some(e),
        }
    }

    /// Collapse back into a plain `Result`, turning a logged failure into `Err`.
    pub fn into_result(self) -> Result<T, PackagingError> {
        match self {
            Outcome::Done(v) => Ok(v),
            Outcome::Logged(e) => Err(e),
        }
    }
}

/// Prepares support packages. Holds no state between calls.
pub struct PackagingUtility {
    component: String,
    policy: FailurePolicy,
    structured_extension: String,
    compression: u32,
    processor: Box<dyn DataProcessor>,
    dispatch: Option<tracing::Dispatch>,
}

impl fmt::Debug for PackagingUtility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackagingUtility")
            .field("component", &self.component)
            .field("policy", &self.policy)
            .field("structured_extension", &self.structured_extension)
            .field("compression", &self.compression)
            .field("dispatch", &self.dispatch.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for PackagingUtility {
    fn default() -> Self {
        Self::new(DEFAULT_COMPONENT)
    }
}

impl PackagingUtility {
    /// `component` is attached to every log record this utility emits.
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            policy: FailurePolicy::default(),
            structured_extension: naming::STRUCTURED_EXTENSION.to_string(),
            compression: DEFAULT_COMPRESSION,
            processor: Box::new(NoopProcessor),
            dispatch: None,
        }
    }

    pub fn from_config(cfg: &PackageConfig) -> Self {
        Self::new(cfg.component.clone())
            .with_policy(cfg.failure_policy)
            .with_structured_extension(cfg.structured_extension.clone())
            .with_compression(cfg.compression_level)
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_structured_extension(mut self, ext: impl Into<String>) -> Self {
        self.structured_extension = ext.into();
        self
    }

    /// Gzip level, clamped to 0..=9.
    pub fn with_compression(mut self, level: u32) -> Self {
        self.compression = level.min(9);
        self
    }

    pub fn with_processor(mut self, processor: impl DataProcessor + 'static) -> Self {
        self.processor = Box::new(processor);
        self
    }

    /// Route this utility's log records to `dispatch` instead of the global subscriber.
    pub fn with_dispatch(mut self, dispatch: tracing::Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Path a structured file for `base_name` ends up at.
    pub fn structured_path(&self, base_name: &Path) -> PathBuf {
        let suffix = format!(".{}", self.structured_extension.trim_start_matches('.'));
        naming::ensure_suffix(base_name, &suffix)
    }

    /// Serialize `value` as YAML to `{base_name}.yaml`, overwriting any existing file.
    ///
    /// Emits one info record on success or one error record on failure.
    pub fn write_structured_file<T>(
        &self,
        value: &T,
        base_name: impl AsRef<Path>,
    ) -> Result<Outcome<PathBuf>, PackagingError>
    where
        T: Serialize + ?Sized,
    {
        let path = self.structured_path(base_name.as_ref());
        self.scoped(|| match structured::write(value, &path) {
            Ok(()) => {
                info!(component = %self.component, path = %path.display(), "written structured file");
                Ok(Outcome::Done(path))
            }
            Err(err) => {
                error!(
                    component = %self.component,
                    path = %path.display(),
                    error = %err,
                    "error writing structured file"
                );
                self.settle(err)
            }
        })
    }

    /// Like [`write_structured_file`](Self::write_structured_file), creating `dir` first.
    pub fn write_structured_file_in<T>(
        &self,
        value: &T,
        dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Outcome<PathBuf>, PackagingError>
    where
        T: Serialize + ?Sized,
    {
        let dir = dir.as_ref();
        if let Err(source) = std::fs::create_dir_all(dir) {
            let err = PackagingError::Write {
                path: dir.to_path_buf(),
                source,
            };
            self.scoped(|| {
                error!(
                    component = %self.component,
                    dir = %dir.display(),
                    error = %err,
                    "error creating directory for structured file"
                )
            });
            return self.settle(err);
        }
        self.write_structured_file(value, dir.join(name))
    }

    /// Archive `source_dir` into `{output_base_name}.tar.gz`, then delete `source_dir`.
    ///
    /// The directory is removed only after the archive has been completely
    /// written. If archiving fails the directory is left intact for manual
    /// recovery. A missing or non-directory `source_dir` is always an `Err`,
    /// and so is a symlink to a directory: removing it would only drop the link.
    pub fn prepare_support_package(
        &self,
        output_base_name: impl AsRef<Path>,
        source_dir: impl AsRef<Path>,
    ) -> Result<Outcome<PackageReport>, PackagingError> {
        let source_dir = source_dir.as_ref();
        let target = naming::ensure_suffix(output_base_name.as_ref(), naming::ARCHIVE_SUFFIX);

        self.scoped(|| {
            info!(
                component = %self.component,
                source_dir = %source_dir.display(),
                archive = %target.display(),
                "preparing the support package"
            );

            if !is_real_dir(source_dir) {
                return Err(PackagingError::NotADirectory {
                    path: source_dir.to_path_buf(),
                });
            }
            archive::check_target(&target, source_dir)?;

            let staged = match archive::stage(&target, source_dir, self.compression) {
                Ok(staged) => staged,
                Err(err) => {
                    error!(
                        component = %self.component,
                        error = %err,
                        "please manually compress the directory {} and attach it to the support ticket",
                        source_dir.display()
                    );
                    return self.settle(err);
                }
            };

            match archive::commit_cleanup(staged) {
                Ok(report) => {
                    info!(
                        component = %self.component,
                        files = report.files,
                        "please attach {} to your support ticket",
                        report.archive.display()
                    );
                    Ok(Outcome::Done(report))
                }
                Err(err) => {
                    error!(
                        component = %self.component,
                        archive = %target.display(),
                        error = %err,
                        "support package written but the staging directory was not removed"
                    );
                    self.settle(err)
                }
            }
        })
    }

    /// Run the configured [`DataProcessor`] over `source_dir`.
    ///
    /// With the default [`NoopProcessor`] this only logs.
    pub fn process_data(
        &self,
        source_dir: impl AsRef<Path>,
        resource: &ResourceDescriptor,
    ) -> Result<Outcome<()>, PackagingError> {
        let source_dir = source_dir.as_ref();
        self.scoped(|| {
            info!(
                component = %self.component,
                source_dir = %source_dir.display(),
                %resource,
                "processing and saving data"
            );
            match self.processor.process(source_dir, resource) {
                Ok(()) => Ok(Outcome::Done(())),
                Err(source) => {
                    let err = PackagingError::Processing {
                        resource: resource.to_string(),
                        source,
                    };
                    error!(component = %self.component, error = %err, "data processing failed");
                    self.settle(err)
                }
            }
        })
    }

    fn settle<T>(&self, err: PackagingError) -> Result<Outcome<T>, PackagingError> {
        if err.is_precondition() {
            return Err(err);
        }
        match self.policy {
            FailurePolicy::Propagate => Err(err),
            FailurePolicy::LogAndContinue => Ok(Outcome::Logged(err)),
        }
    }

    fn scoped<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

/// Directory that is not itself a symlink. `is_dir` alone follows the link, and
/// `remove_dir_all` on a link removes only the link.
fn is_real_dir(path: &Path) -> bool {
    // "link/" would make lstat resolve the link; drop trailing separators first.
    let trimmed: PathBuf = path.components().collect();
    std::fs::symlink_metadata(&trimmed).is_ok_and(|m| m.file_type().is_dir())
}
