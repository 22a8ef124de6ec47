//! Command implementations for the efu CLI

pub mod cleanup;
pub mod config;
pub mod package;

use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum PackageCommands {
    /// Start a new package in the working package file
    New {
        /// Product identifier (numeric or text)
        #[arg(long)]
        product: String,
        /// Package version
        #[arg(long)]
        version: String,
        /// Replace an existing package file
        #[arg(short, long)]
        force: bool,
    },

    /// Add an artifact to the package
    Add {
        /// Artifact file
        file: PathBuf,
        /// Installation mode
        #[arg(short, long, default_value = "raw")]
        mode: String,
        /// Install set (a or b)
        #[arg(short, long)]
        set: Option<String>,
        /// Mode option as key=value; repeatable
        #[arg(short = 'o', long = "option", value_parser = parse_key_val)]
        options: Vec<(String, String)>,
    },

    /// Change options of an object; all changes are applied together
    Edit {
        /// Object id
        id: usize,
        /// Option key
        #[arg(requires = "value")]
        key: Option<String>,
        /// New value; `null` restores the default
        value: Option<String>,
        /// Further changes as key=value; repeatable
        #[arg(short = 'o', long = "option", value_parser = parse_key_val)]
        options: Vec<(String, String)>,
    },

    /// Remove an object; later ids move down by one
    Remove {
        /// Object id
        id: usize,
    },

    /// Move an object to another position
    Move {
        /// Object id
        id: usize,
        /// Destination id
        to: usize,
    },

    /// Show the package contents
    Show {
        /// Include options left at their default
        #[arg(short, long)]
        all: bool,
    },

    /// Print or write the package metadata
    Metadata {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the package template to a file
    Export {
        /// Destination file
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set {
        key: String,
        value: String,
        /// Section (default: settings)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Print a configuration value; prints nothing when unset
    Get {
        key: String,
        /// Section (default: settings)
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Read access id, access secret and private key path from stdin
    Init,
}

/// Parse a `key=value` pair
///
/// The value stays text; the object's mode decides how to read it.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
