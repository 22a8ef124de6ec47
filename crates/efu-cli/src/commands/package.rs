//! Package editing commands

use std::path::Path;

use anyhow::{Context, Result};
use efu_core::{InstallSet, Object, Package, ProductId, registry};
use serde_json::json;
use tracing::info;

use crate::commands::PackageCommands;
use crate::error::CliError;
use crate::output;

/// Execute package command against the package file at `package_file`
pub fn execute(cmd: &PackageCommands, package_file: &Path, json: bool) -> Result<()> {
    match cmd {
        PackageCommands::New {
            product,
            version,
            force,
        } => new_package(package_file, product, version, *force, json),
        PackageCommands::Add {
            file,
            mode,
            set,
            options,
        } => add_object(package_file, file, mode, set.as_deref(), options, json),
        PackageCommands::Edit {
            id,
            key,
            value,
            options,
        } => {
            let mut changes = Vec::with_capacity(options.len().saturating_add(1));
            if let (Some(key), Some(value)) = (key, value) {
                changes.push((key.clone(), value.clone()));
            }
            changes.extend(options.iter().cloned());
            edit_object(package_file, *id, &changes, json)
        }
        PackageCommands::Remove { id } => remove_object(package_file, *id, json),
        PackageCommands::Move { id, to } => move_object(package_file, *id, *to, json),
        PackageCommands::Show { all } => show_package(package_file, *all, json),
        PackageCommands::Metadata { output } => {
            export_metadata(package_file, output.as_deref(), json)
        }
        PackageCommands::Export { file } => export_template(package_file, file, json),
    }
}

/// Load the working package, distinguishing a missing file from a broken one
fn load(package_file: &Path) -> Result<Package> {
    if !package_file.exists() {
        return Err(CliError::PackageFileMissing(package_file.to_path_buf()).into());
    }
    Ok(Package::from_file(package_file)?)
}

fn parse_product(product: &str) -> ProductId {
    product
        .parse::<u64>()
        .map(ProductId::Number)
        .unwrap_or_else(|_| ProductId::from(product))
}

fn new_package(
    package_file: &Path,
    product: &str,
    version: &str,
    force: bool,
    json: bool,
) -> Result<()> {
    if package_file.exists() && !force {
        return Err(CliError::PackageFileExists(package_file.to_path_buf()).into());
    }
    let package = Package::new(parse_product(product), version)?;
    package.save(package_file)?;
    info!(path = ?package_file, "Created package");
    output::print_success(
        &format!("Created package {} {}", package.product_id(), package.version()),
        json!({"product": package.product_id(), "version": package.version()}),
        json,
    );
    Ok(())
}

fn add_object(
    package_file: &Path,
    file: &Path,
    mode: &str,
    set: Option<&str>,
    options: &[(String, String)],
    json: bool,
) -> Result<()> {
    let mut package = load(package_file)?;
    let install_set = set.map(str::parse::<InstallSet>).transpose()?;
    let mode = registry().get(mode)?;
    let object = Object::with_mode(mode, mode.parse_options(options)?, file)?;

    let id = match install_set {
        Some(set) => package.add_to_set(object, set),
        None => package.add(object),
    };
    package.save(package_file)?;
    output::print_success(
        &format!("Added {} as object {id}", file.display()),
        json!({"id": id}),
        json,
    );
    Ok(())
}

fn edit_object(
    package_file: &Path,
    id: usize,
    changes: &[(String, String)],
    json: bool,
) -> Result<()> {
    if changes.is_empty() {
        return Err(CliError::InvalidInput("nothing to change".to_string()).into());
    }
    let mut package = load(package_file)?;
    let object = package.get_mut(id)?;
    let values = object.mode().parse_options(changes)?;
    object.update(values)?;
    package.save(package_file)?;

    let keys: Vec<&str> = changes.iter().map(|(key, _)| key.as_str()).collect();
    output::print_success(
        &format!("Updated {} of object {id}", keys.join(", ")),
        json!({"id": id, "keys": keys}),
        json,
    );
    Ok(())
}

fn remove_object(package_file: &Path, id: usize, json: bool) -> Result<()> {
    let mut package = load(package_file)?;
    let removed = package.remove(id)?;
    package.save(package_file)?;
    output::print_success(
        &format!("Removed object {id} ({})", removed.source_path().display()),
        json!({"id": id}),
        json,
    );
    Ok(())
}

fn move_object(package_file: &Path, id: usize, to: usize, json: bool) -> Result<()> {
    let mut package = load(package_file)?;
    package.move_object(id, to)?;
    package.save(package_file)?;
    output::print_success(
        &format!("Moved object {id} to {to}"),
        json!({"id": id, "to": to}),
        json,
    );
    Ok(())
}

fn show_package(package_file: &Path, all: bool, json: bool) -> Result<()> {
    let package = load(package_file)?;
    if json {
        output::print_json(&package.as_dict()?);
    } else {
        output::print_package_human(&package, all);
    }
    Ok(())
}

fn export_metadata(package_file: &Path, destination: Option<&Path>, json: bool) -> Result<()> {
    let package = load(package_file)?;
    let metadata = package.metadata()?;
    match destination {
        Some(path) => {
            let mut text = serde_json::to_string_pretty(&metadata)?;
            text.push('\n');
            std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            output::print_success(
                &format!("Metadata written to {}", path.display()),
                json!({"output": path.display().to_string()}),
                json,
            );
        }
        None => output::print_json(&metadata),
    }
    Ok(())
}

fn export_template(package_file: &Path, destination: &Path, json: bool) -> Result<()> {
    let package = load(package_file)?;
    package.save(destination)?;
    output::print_success(
        &format!("Package exported to {}", destination.display()),
        json!({"output": destination.display().to_string()}),
        json,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_parse_product() {
        assert_eq!(parse_product("1234"), ProductId::Number(1234));
        assert_eq!(parse_product("0a1b"), ProductId::from("0a1b"));
    }

    #[test]
    fn test_load_missing_package_file() -> TestResult {
        let dir = tempfile::tempdir()?;
        let err = match load(&dir.path().join(".efu")) {
            Ok(_) => return Err("missing package file was loaded".into()),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::PackageFileMissing(_))
        ));
        Ok(())
    }

    #[test]
    fn test_new_add_move_remove() -> TestResult {
        let dir = tempfile::tempdir()?;
        let package_file = dir.path().join(".efu");
        let kernel = dir.path().join("kernel");
        let rootfs = dir.path().join("rootfs");
        std::fs::write(&kernel, b"kernel")?;
        std::fs::write(&rootfs, b"rootfs")?;

        new_package(&package_file, "1234", "2.0", false, true)?;
        add_object(&package_file, &kernel, "raw", None, &[], true)?;
        add_object(
            &package_file,
            &rootfs,
            "raw",
            Some("b"),
            &[("target".to_string(), "/dev/sda2".to_string())],
            true,
        )?;
        move_object(&package_file, 1, 0, true)?;

        let package = load(&package_file)?;
        assert_eq!(package.get(0)?.source_path(), rootfs.as_path());
        assert_eq!(package.install_set(0)?, Some(InstallSet::B));

        remove_object(&package_file, 0, true)?;
        let package = load(&package_file)?;
        assert_eq!(package.len(), 1);
        assert_eq!(package.get(0)?.source_path(), kernel.as_path());
        Ok(())
    }

    #[test]
    fn test_new_refuses_to_overwrite() -> TestResult {
        let dir = tempfile::tempdir()?;
        let package_file = dir.path().join(".efu");
        new_package(&package_file, "1", "1.0", false, true)?;
        let err = match new_package(&package_file, "2", "1.0", false, true) {
            Ok(()) => return Err("existing package was replaced".into()),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::PackageFileExists(_))
        ));
        new_package(&package_file, "2", "1.0", true, true)?;
        assert_eq!(load(&package_file)?.product_id(), &ProductId::Number(2));
        Ok(())
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn test_edit_switches_install_condition() -> TestResult {
        let dir = tempfile::tempdir()?;
        let package_file = dir.path().join(".efu");
        let bootloader = dir.path().join("u-boot.bin");
        std::fs::write(&bootloader, b"u-boot 2017.01")?;

        new_package(&package_file, "1234", "2.0", false, true)?;
        add_object(&package_file, &bootloader, "raw", None, &[], true)?;
        edit_object(
            &package_file,
            0,
            &pairs(&[
                ("install-condition", "pattern-at-offset"),
                ("install-condition-pattern", "2017"),
                ("install-condition-seek", "7"),
                ("install-condition-buffer-size", "4"),
            ]),
            true,
        )?;

        let package = load(&package_file)?;
        assert_eq!(
            package.get(0)?.install_condition(),
            &efu_core::InstallCondition::pattern_at_offset("2017", 7, 4)?
        );
        Ok(())
    }

    #[test]
    fn test_add_keeps_numeric_text_for_string_options() -> TestResult {
        let dir = tempfile::tempdir()?;
        let package_file = dir.path().join(".efu");
        let image = dir.path().join("image");
        std::fs::write(&image, b"image")?;

        new_package(&package_file, "1234", "2.0", false, true)?;
        add_object(
            &package_file,
            &image,
            "raw",
            None,
            &pairs(&[("target", "0"), ("chunk-size", "4096")]),
            true,
        )?;

        let package = load(&package_file)?;
        assert_eq!(package.get(0)?.get("target")?, json!("0"));
        assert_eq!(package.get(0)?.get("chunk-size")?, json!(4096));
        Ok(())
    }

    #[test]
    fn test_edit_without_changes() -> TestResult {
        let dir = tempfile::tempdir()?;
        let package_file = dir.path().join(".efu");
        new_package(&package_file, "1234", "2.0", false, true)?;
        let err = match edit_object(&package_file, 0, &[], true) {
            Ok(()) => return Err("empty edit succeeded".into()),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidInput(_))
        ));
        Ok(())
    }
}
