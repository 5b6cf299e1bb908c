//! File naming for support artifacts.
//!
//! Both writers in this crate derive concrete paths through [`ensure_suffix`],
//! so a caller may pass either a bare stem (`/tmp/case42`) or a name that
//! already carries the suffix (`/tmp/case42.tar.gz`) and get the same file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Suffix of every support package archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz";

/// Default extension of structured files (without the dot).
pub const STRUCTURED_EXTENSION: &str = "yaml";

/// Append `suffix` to `base` unless `base` already ends with it.
pub fn ensure_suffix(base: &Path, suffix: &str) -> PathBuf {
    let already = base.to_str().is_some_and(|s| s.ends_with(suffix));
    if already {
        return base.to_path_buf();
    }
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Turn a user-facing label into a file name fragment.
///
/// "OSS ArgoCD" becomes "oss-argocd".
pub fn slug(label: &str) -> String {
    label
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Archive path for a package of a given kind: `{base}-{slug(label)}.tar.gz`.
pub fn package_file_name(base: &Path, label: &str) -> PathBuf {
    let slug = slug(label);
    if slug.is_empty() {
        return ensure_suffix(base, ARCHIVE_SUFFIX);
    }
    let mut name: OsString = base.as_os_str().to_os_string();
    name.push("-");
    name.push(&slug);
    ensure_suffix(Path::new(&name), ARCHIVE_SUFFIX)
}

/// Filesystem-safe name for a timestamped staging directory,
/// e.g. `support-2025-01-02T03-04-05Z`.
pub fn staging_dir_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, at.format("%Y-%m-%dT%H-%M-%SZ"))
}
