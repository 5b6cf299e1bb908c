//! Structured (YAML) dumps of in-memory values.

use std::path::Path;

use serde::Serialize;

use super::PackagingError;

/// Render `value` as YAML. Mapping keys keep the order the value yields them in.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(value)
}

/// Serialize `value` and write it to `path`, replacing any existing file.
///
/// Serialization happens before the file is opened, so a value that cannot be
/// represented leaves an existing file untouched.
pub(crate) fn write<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), PackagingError> {
    let text = to_string(value).map_err(|source| PackagingError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(|source| PackagingError::Write {
        path: path.to_path_buf(),
        source,
    })
}
