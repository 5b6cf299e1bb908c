//! Two-phase support package creation.
//!
//! Phase one ([`stage`]) writes the gzip tarball and yields an [`ArchivedDir`]
//! only once the archive is complete on disk. Phase two ([`commit_cleanup`])
//! consumes that token and removes the source directory. There is no other
//! way to reach the destructive step.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tar::Builder;
use tracing::{debug, warn};

use super::PackagingError;

/// Proof that `source_dir` was fully written into `archive`.
#[derive(Debug)]
#[must_use = "the source directory is only removed by commit_cleanup"]
pub struct ArchivedDir {
    archive: PathBuf,
    source_dir: PathBuf,
    files: usize,
}

impl ArchivedDir {
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

/// Summary of a finished support package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageReport {
    /// Path of the written `.tar.gz`.
    pub archive: PathBuf,
    /// Directory that was archived and then removed.
    pub source_dir: PathBuf,
    /// Number of non-directory entries stored in the archive.
    pub files: usize,
}

/// Reject archive targets that would land inside the directory being archived.
///
/// A target whose parent directory does not exist is let through; creating the
/// archive fails later with a regular I/O error.
pub fn check_target(archive: &Path, source_dir: &Path) -> Result<(), PackagingError> {
    let parent = match archive.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let (Ok(parent), Ok(source)) = (parent.canonicalize(), source_dir.canonicalize()) else {
        return Ok(());
    };
    if parent.starts_with(&source) {
        return Err(PackagingError::ArchiveInsideSource {
            archive: archive.to_path_buf(),
            source_dir: source_dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Write `source_dir` into a gzip tarball at `archive`.
///
/// The directory appears in the archive under its own base name. Symlinks are
/// stored as links. On failure any partially written archive is removed and
/// `source_dir` is left as it was.
pub fn stage(archive: &Path, source_dir: &Path, level: u32) -> Result<ArchivedDir, PackagingError> {
    let wrap = |source: io::Error| PackagingError::Archive {
        archive: archive.to_path_buf(),
        source_dir: source_dir.to_path_buf(),
        source,
    };

    let top = top_level_name(source_dir).map_err(wrap)?;
    let files = count_files(source_dir).map_err(wrap)?;

    let file = File::create(archive).map_err(wrap)?;
    if let Err(e) = write_tarball(file, &top, source_dir, level) {
        if let Err(rm) = fs::remove_file(archive) {
            warn!(archive = %archive.display(), error = %rm, "failed to remove partial archive");
        }
        return Err(wrap(e));
    }

    debug!(archive = %archive.display(), files, "archive written");
    Ok(ArchivedDir {
        archive: archive.to_path_buf(),
        source_dir: source_dir.to_path_buf(),
        files,
    })
}

/// Remove the archived source directory. Irreversible.
pub fn commit_cleanup(staged: ArchivedDir) -> Result<PackageReport, PackagingError> {
    fs::remove_dir_all(&staged.source_dir).map_err(|source| PackagingError::Cleanup {
        path: staged.source_dir.clone(),
        source,
    })?;
    Ok(PackageReport {
        archive: staged.archive,
        source_dir: staged.source_dir,
        files: staged.files,
    })
}

fn write_tarball(file: File, top: &Path, source_dir: &Path, level: u32) -> io::Result<()> {
    let gz = GzEncoder::new(BufWriter::new(file), Compression::new(level));
    let mut tar = Builder::new(gz);
    tar.follow_symlinks(false);
    tar.append_dir_all(top, source_dir)?;

    let gz = tar.into_inner()?;
    let mut out = gz.finish()?;
    out.flush()?;
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

/// Base name of the directory, resolving `.`/`..` style paths first.
fn top_level_name(dir: &Path) -> io::Result<PathBuf> {
    if let Some(name) = dir.file_name() {
        return Ok(PathBuf::from(name));
    }
    let resolved = dir.canonicalize()?;
    resolved.file_name().map(PathBuf::from).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no directory name to archive under", dir.display()),
        )
    })
}

fn count_files(dir: &Path) -> io::Result<usize> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            total += count_files(&entry.path())?;
        } else {
            total += 1;
        }
    }
    Ok(total)
}
