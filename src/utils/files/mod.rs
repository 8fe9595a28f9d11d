#![allow(clippy::result_large_err)]

use crate::core::error::{AppError, ErrorCode};
use std::fs;
use std::path::Path;

/// Write through a sibling `.tmp` file and rename over the target so readers
/// never observe a half-written file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::new(ErrorCode::ExportDirectory, "failed to create directory")
                .with_context("path", parent.display().to_string())
                .caused_by(err)
        })?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, data).map_err(|err| {
        AppError::new(ErrorCode::ExportWrite, "failed to write export")
            .with_context("path", tmp_path.display().to_string())
            .caused_by(err)
    })?;
    fs::rename(&tmp_path, path).map_err(|err| {
        AppError::new(ErrorCode::ExportRename, "failed to move export into place")
            .with_context("path", path.display().to_string())
            .caused_by(err)
    })?;
    Ok(())
}
