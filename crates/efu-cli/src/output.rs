//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use efu_core::{EfuError, Package};
use serde_json::{Value, json};

use crate::error::CliError;

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    });
    print_json(&error_json);
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    if let Some(e) = error.downcast_ref::<CliError>() {
        return match e {
            CliError::PackageFileMissing(_) => "package_file_missing",
            CliError::PackageFileExists(_) => "package_file_exists",
            CliError::NothingToClean(_) => "nothing_to_clean",
            CliError::InvalidInput(_) => "invalid_input",
            CliError::InvalidConfiguration(_) => "invalid_configuration",
            CliError::IoError(_) => "io",
            CliError::JsonError(_) => "json",
        };
    }
    match error.downcast_ref::<EfuError>() {
        Some(EfuError::UnknownMode(_)) => "unknown_mode",
        Some(EfuError::InvalidOption { .. }) => "invalid_option",
        Some(EfuError::UnknownOption(_)) => "unknown_option",
        Some(EfuError::InvalidPackageFile { .. }) => "invalid_package_file",
        Some(EfuError::InvalidPackage(_)) => "invalid_package",
        Some(EfuError::ObjectNotFound(_)) => "object_not_found",
        Some(EfuError::Io { .. }) => "io",
        Some(EfuError::SchemaViolation { .. }) => "schema_violation",
        Some(EfuError::DuplicateMode(_) | EfuError::Serialization(_)) | None => "internal",
    }
}

/// Pretty-print a JSON document on stdout
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format output as JSON: {e}"),
    }
}

/// Print a success message, or `{"success": true, ...extra}` in JSON mode
pub fn print_success(message: &str, extra: Value, json: bool) {
    if json {
        let mut output = json!({"success": true});
        if let (Value::Object(out), Value::Object(extra)) = (&mut output, extra) {
            out.extend(extra);
        }
        print_json(&output);
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

/// Print every object of a package
pub fn print_package_human(package: &Package, show_defaults: bool) {
    println!(
        "{} {}  {} {}",
        "Product:".bold(),
        package.product_id(),
        "Version:".bold(),
        package.version()
    );
    if package.is_empty() {
        println!("{}", "No objects".yellow());
        return;
    }
    for (id, object) in package.objects() {
        let set = match package.install_set(id) {
            Ok(Some(set)) => format!(" [install set {set}]"),
            _ => String::new(),
        };
        println!();
        println!("{}{}", format!("Object {id}:").bold(), set.dimmed());
        for line in object.render(show_defaults).lines() {
            println!("    {line}");
        }
    }
}
