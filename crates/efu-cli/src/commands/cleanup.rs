//! Removal of the working package file

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::error::CliError;
use crate::output;

/// Remove the working package file
pub fn execute(package_file: &Path, json: bool) -> Result<()> {
    if !package_file.exists() {
        return Err(CliError::NothingToClean(package_file.to_path_buf()).into());
    }
    std::fs::remove_file(package_file).map_err(CliError::IoError)?;
    info!(path = ?package_file, "Removed package file");
    output::print_success(
        &format!("Removed {}", package_file.display()),
        serde_json::json!({"removed": package_file.display().to_string()}),
        json,
    );
    Ok(())
}
