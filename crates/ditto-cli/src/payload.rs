//! Loading request bodies from JSON files.
//!
//! # Design
//!
//! - Payloads are opaque to the CLI; the only requirement is well-formed JSON.
//! - Errors keep the offending path so the message points at the right file.

use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use crate::client::CliError;

/// Errors raised while loading a payload file.
#[derive(Debug, Error)]
pub(crate) enum PayloadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The file did not contain valid JSON.
    #[error("{} is not valid JSON: {source}", path.display())]
    Json {
        /// File holding the malformed document.
        path: PathBuf,
        /// Underlying serde error.
        source: serde_json::Error,
    },
    /// The document parsed but is not a JSON object.
    #[error("{} must contain a JSON object", path.display())]
    NotAnObject {
        /// File holding the document.
        path: PathBuf,
    },
}

impl From<PayloadError> for CliError {
    fn from(err: PayloadError) -> Self {
        Self::validation(err.to_string())
    }
}

/// Read any JSON document from `path`.
pub(crate) fn read_json_file(path: &Path) -> Result<Value, PayloadError> {
    let text = std::fs::read_to_string(path).map_err(|source| PayloadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| PayloadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a JSON object from `path`, rejecting arrays and scalars.
pub(crate) fn read_json_object(path: &Path) -> Result<Value, PayloadError> {
    let value = read_json_file(path)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(PayloadError::NotAnObject {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::temp_json;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn reads_object_payload() {
        let file = temp_json("thing.json", &json!({"attributes": {"room": "hall"}}));
        let value = read_json_object(file.path()).expect("payload");
        assert_eq!(value["attributes"]["room"], "hall");
    }

    #[test]
    fn missing_file_reports_path() {
        let path = PathBuf::from("/definitely/not/here.json");
        let err = read_json_file(&path).expect_err("missing file");
        assert!(matches!(err, PayloadError::Io { .. }));
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn malformed_json_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{not json").expect("write");
        let err = read_json_file(file.path()).expect_err("bad json");
        assert!(matches!(err, PayloadError::Json { .. }));
    }

    #[test]
    fn arrays_are_not_objects() {
        let file = temp_json("array.json", &json!([1, 2, 3]));
        let err = read_json_object(file.path()).expect_err("array");
        assert!(matches!(err, PayloadError::NotAnObject { .. }));
        let cli_err: CliError = err.into();
        assert!(matches!(cli_err, CliError::Validation(message) if message.contains("JSON object")));
    }
}
