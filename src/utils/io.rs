//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Read a required configuration file.
///
/// A missing file is a `config.missing_file` error; other failures stay IO errors.
pub fn read_config_file(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(Error::config_missing_file(path.display().to_string()))
        }
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some(format!("read {}", path.display())),
        )),
    }
}

/// Read an optional configuration file; `Ok(None)` when it does not exist.
pub fn read_optional_file(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::internal_io(
            e.to_string(),
            Some(format!("read {}", path.display())),
        )),
    }
}
