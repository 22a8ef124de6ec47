//! Error types for the efu CLI

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Package file not found: {0} (run `efu package new` first)")]
    PackageFileMissing(PathBuf),

    #[error("Package file already exists: {0}")]
    PackageFileExists(PathBuf),

    #[error("Nothing to clean up: {0} does not exist")]
    NothingToClean(PathBuf),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
