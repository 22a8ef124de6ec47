//! Installable objects
//!
//! An [`Object`] ties one artifact file to a mode, the option values supplied
//! for it and its install condition. Values the caller did not supply resolve
//! to the mode's defaults at read time; volatile values are derived from the
//! file every time they are asked for, so they can never drift from the
//! content they describe.
//!
//! Objects have two encodings:
//!
//! - the template ([`Object::to_template`]), the editable persistence format,
//!   which omits volatile values and round-trips through [`Object::load`];
//! - the metadata fragment ([`Object::to_metadata`]), consumed by the update
//!   client and checked against the mode's schema before it is returned.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::content::ContentInfo;
use crate::error::EfuError;
use crate::install_condition::{self, InstallCondition};
use crate::mode::{Mode, OptionValues, registry};
use crate::option::{FILENAME, MODE, ModeOption};
use crate::schema::{self, SchemaValidator};

/// Mode assumed by [`Object::load`] when a template names none
pub const DEFAULT_MODE: &str = "raw";

/// One installable artifact and how to install it
#[derive(Debug, Clone)]
pub struct Object {
    mode: &'static dyn Mode,
    source_path: PathBuf,
    options: OptionValues,
    install_condition: InstallCondition,
}

impl Object {
    /// Build an object for `source_path` using the registered mode `mode_name`
    ///
    /// `options` may carry any non-volatile option of the mode plus the
    /// `install-condition*` keys. Values supplied for volatile options are
    /// ignored. The file must exist and be readable; its content is not read.
    ///
    /// # Errors
    ///
    /// - [`EfuError::UnknownMode`] if `mode_name` is not registered
    /// - [`EfuError::InvalidOption`] for undeclared keys, values failing their
    ///   rule, missing required options or broken dependencies
    /// - [`EfuError::Io`] if the file cannot be opened
    pub fn construct(
        options: OptionValues,
        mode_name: &str,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, EfuError> {
        let mode = registry().get(mode_name)?;
        Self::with_mode(mode, options, source_path)
    }

    /// Build an object for an explicit mode, bypassing the registry
    ///
    /// # Errors
    ///
    /// Same as [`Object::construct`] apart from mode lookup.
    pub fn with_mode(
        mode: &'static dyn Mode,
        mut options: OptionValues,
        source_path: impl Into<PathBuf>,
    ) -> Result<Self, EfuError> {
        let source_path = source_path.into();
        let install_condition = InstallCondition::take_from(&mut options)?;
        check_install_condition(mode, &install_condition)?;

        let mut explicit = OptionValues::new();
        for (key, value) in options {
            let option = mode.option(&key).ok_or_else(|| {
                EfuError::invalid_option(&key, format!("not an option of mode {}", mode.name()))
            })?;
            if option.volatile {
                debug!(key = %key, "Ignoring supplied value for volatile option");
                continue;
            }
            if value.is_null() {
                continue;
            }
            option.validate(&value)?;
            explicit.insert(key, value);
        }
        check_options(mode, &explicit)?;
        check_readable(&source_path)?;

        info!(mode = mode.name(), path = ?source_path, "Constructed object");
        Ok(Self {
            mode,
            source_path,
            options: explicit,
            install_condition,
        })
    }

    /// Rebuild an object from a template produced by [`Object::to_template`]
    ///
    /// # Errors
    ///
    /// [`EfuError::InvalidOption`] if `filename` is missing, plus everything
    /// [`Object::construct`] can return.
    pub fn load(template: &Map<String, Value>) -> Result<Self, EfuError> {
        let mut options = template.clone();
        let source_path = match options.remove(FILENAME) {
            Some(Value::String(path)) if !path.is_empty() => path,
            Some(_) => return Err(EfuError::invalid_option(FILENAME, "expected a path")),
            None => return Err(EfuError::invalid_option(FILENAME, "required")),
        };
        let mode_name = match options.remove(MODE) {
            Some(Value::String(name)) => name,
            None | Some(Value::Null) => DEFAULT_MODE.to_string(),
            Some(_) => return Err(EfuError::invalid_option(MODE, "expected a mode name")),
        };
        Self::construct(options, &mode_name, source_path)
    }

    /// The object's mode
    pub fn mode(&self) -> &'static dyn Mode {
        self.mode
    }

    /// Name of the object's mode
    pub fn mode_name(&self) -> &'static str {
        self.mode.name()
    }

    /// Path of the artifact file
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// The install condition
    pub fn install_condition(&self) -> &InstallCondition {
        &self.install_condition
    }

    /// Resolved value of `key`
    ///
    /// Non-volatile options resolve to the supplied value or the default,
    /// volatile options are computed from the file, and `install-condition*`
    /// keys come from the install condition. Unset optional values are `Null`.
    ///
    /// # Errors
    ///
    /// [`EfuError::UnknownOption`] if the mode does not declare `key`, or
    /// [`EfuError::Io`] if a volatile value cannot be computed.
    pub fn get(&self, key: &str) -> Result<Value, EfuError> {
        if let Some(value) = self.install_condition.get(key) {
            return Ok(value);
        }
        let option = self
            .mode
            .option(key)
            .ok_or_else(|| EfuError::UnknownOption(key.to_string()))?;
        if option.volatile {
            return Ok(self.content()?.volatile_value(key));
        }
        Ok(self.resolved(option))
    }

    /// Change one option, validating it like construction does
    ///
    /// The object is left unchanged when an error is returned. Setting `Null`
    /// reverts the option to its default.
    ///
    /// # Errors
    ///
    /// [`EfuError::UnknownOption`] for undeclared keys, and
    /// [`EfuError::InvalidOption`] for volatile keys or rejected values.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), EfuError> {
        let mut changes = OptionValues::new();
        changes.insert(key.to_string(), value);
        self.update(changes)
    }

    /// Apply several changes at once, validating the merged result a single time
    ///
    /// Changes that only make sense together, such as switching to
    /// `pattern-at-offset` along with its pattern fields, go through here.
    /// Changing the install condition kind drops the previous pattern fields.
    /// The object is left unchanged when an error is returned.
    ///
    /// # Errors
    ///
    /// Same as [`Object::set`].
    pub fn update(&mut self, changes: OptionValues) -> Result<(), EfuError> {
        let (condition_changes, option_changes): (Vec<_>, Vec<_>) = changes
            .into_iter()
            .partition(|(key, _)| InstallCondition::is_condition_key(key));

        let mut explicit = self.options.clone();
        for (key, value) in option_changes {
            let option = self
                .mode
                .option(&key)
                .ok_or_else(|| EfuError::UnknownOption(key.clone()))?;
            if option.volatile {
                return Err(EfuError::invalid_option(key, "computed from file content"));
            }
            if value.is_null() {
                explicit.remove(&key);
            } else {
                option.validate(&value)?;
                explicit.insert(key, value);
            }
        }
        check_options(self.mode, &explicit)?;

        let condition = if condition_changes.is_empty() {
            self.install_condition.clone()
        } else {
            let mut fields = Map::new();
            self.install_condition.write_template(&mut fields);
            let new_kind = condition_changes
                .iter()
                .find(|(key, _)| key == install_condition::INSTALL_CONDITION)
                .map(|(_, value)| value.as_str().unwrap_or(InstallCondition::Always.kind()));
            // pattern fields do not survive a change of kind
            if new_kind.is_some_and(|kind| kind != self.install_condition.kind()) {
                fields.retain(|k, _| k == install_condition::INSTALL_CONDITION);
            }
            fields.extend(condition_changes);
            let condition = InstallCondition::take_from(&mut fields)?;
            check_install_condition(self.mode, &condition)?;
            condition
        };

        debug!(path = ?self.source_path, "Updated object options");
        self.options = explicit;
        self.install_condition = condition;
        Ok(())
    }

    /// Replace the install condition
    ///
    /// # Errors
    ///
    /// [`EfuError::InvalidOption`] if the mode does not support install conditions.
    pub fn set_install_condition(&mut self, condition: InstallCondition) -> Result<(), EfuError> {
        check_install_condition(self.mode, &condition)?;
        self.install_condition = condition;
        Ok(())
    }

    /// Inspect the artifact file
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if the file cannot be read.
    pub fn content(&self) -> Result<ContentInfo, EfuError> {
        ContentInfo::inspect(&self.source_path)
    }

    /// Size of the artifact in bytes
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if the file cannot be read.
    pub fn size(&self) -> Result<u64, EfuError> {
        Ok(self.content()?.size)
    }

    /// Lowercase hex SHA-256 of the artifact
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if the file cannot be read.
    pub fn sha256sum(&self) -> Result<String, EfuError> {
        Ok(self.content()?.sha256sum)
    }

    /// Editable template: identity, every non-volatile value and the install condition
    pub fn to_template(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert(
            FILENAME.to_string(),
            Value::from(self.source_path.to_string_lossy().into_owned()),
        );
        out.insert(MODE.to_string(), Value::from(self.mode.name()));
        out.extend(self.resolved_options());
        if self.mode.supports_install_condition() {
            self.install_condition.write_template(&mut out);
        }
        out
    }

    /// Metadata fragment validated against the mode's schema
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if the file cannot be read, or
    /// [`EfuError::SchemaViolation`] if the fragment does not satisfy the schema.
    pub fn to_metadata(&self) -> Result<Value, EfuError> {
        self.to_metadata_with(schema::validator()?)
    }

    /// Metadata fragment validated with a caller-provided validator
    ///
    /// # Errors
    ///
    /// Same as [`Object::to_metadata`].
    pub fn to_metadata_with(&self, validator: &dyn SchemaValidator) -> Result<Value, EfuError> {
        let content = self.content()?;
        let filename = self
            .source_path
            .file_name()
            .unwrap_or(self.source_path.as_os_str())
            .to_string_lossy()
            .into_owned();

        let mut out = Map::new();
        out.insert(MODE.to_string(), Value::from(self.mode.name()));
        out.insert(FILENAME.to_string(), Value::from(filename));
        for option in self.mode.options() {
            let value = if option.volatile {
                content.volatile_value(option.key)
            } else {
                self.resolved(option)
            };
            if !value.is_null() {
                out.insert(option.key.to_string(), value);
            }
        }
        if let Some(condition) = self.install_condition.to_metadata() {
            out.insert(install_condition::INSTALL_CONDITION.to_string(), condition);
        }

        let document = Value::Object(out);
        validator.validate(&self.mode.schema_name(), &document)?;
        Ok(document)
    }

    /// Human-readable listing of mode, options and install condition
    ///
    /// Options equal to their default are skipped unless `show_defaults` is set.
    pub fn render(&self, show_defaults: bool) -> String {
        let mut rows = vec![
            (FILENAME, self.source_path.display().to_string()),
            (MODE, self.mode.name().to_string()),
        ];
        for option in self.mode.options().iter().filter(|o| !o.volatile) {
            let value = self.resolved(option);
            if value.is_null() || (!show_defaults && option.default.matches(&value)) {
                continue;
            }
            rows.push((option.key, display_value(&value)));
        }
        if self.mode.supports_install_condition()
            && (show_defaults || self.install_condition != InstallCondition::Always)
        {
            rows.push((
                install_condition::INSTALL_CONDITION,
                self.install_condition.to_string(),
            ));
        }

        let width = rows.iter().map(|(key, _)| key.len()).max().unwrap_or(0) + 1;
        let mut out = String::new();
        for (key, value) in rows {
            let label = format!("{key}:");
            out.push_str(&format!("{label:<width$} {value}\n"));
        }
        out
    }

    fn resolved(&self, option: &ModeOption) -> Value {
        self.options
            .get(option.key)
            .cloned()
            .unwrap_or_else(|| option.default_value())
    }

    fn resolved_options(&self) -> OptionValues {
        resolve(self.mode, &self.options)
    }
}

impl std::fmt::Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.render(false).trim_end())
    }
}

/// Non-volatile values with defaults filled in, nulls dropped
fn resolve(mode: &dyn Mode, explicit: &OptionValues) -> OptionValues {
    mode.options()
        .iter()
        .filter(|o| !o.volatile)
        .filter_map(|o| {
            let value = explicit
                .get(o.key)
                .cloned()
                .unwrap_or_else(|| o.default_value());
            (!value.is_null()).then(|| (o.key.to_string(), value))
        })
        .collect()
}

fn check_options(mode: &dyn Mode, explicit: &OptionValues) -> Result<(), EfuError> {
    let resolved = resolve(mode, explicit);
    for option in mode.options().iter().filter(|o| !o.volatile) {
        let present = resolved.contains_key(option.key);
        if option.required && !present {
            return Err(EfuError::invalid_option(
                option.key,
                format!("required by mode {}", mode.name()),
            ));
        }
        if let Some((dependency, expected)) = option.requires {
            let actual = resolved.get(dependency).unwrap_or(&Value::Null);
            if present && !expected.matches(actual) {
                return Err(EfuError::invalid_option(
                    option.key,
                    format!("requires {dependency} = {}", expected.to_value()),
                ));
            }
        }
    }
    mode.validate(&resolved)
}

fn check_install_condition(
    mode: &dyn Mode,
    condition: &InstallCondition,
) -> Result<(), EfuError> {
    if *condition != InstallCondition::Always && !mode.supports_install_condition() {
        return Err(EfuError::invalid_option(
            install_condition::INSTALL_CONDITION,
            format!("mode {} does not support install conditions", mode.name()),
        ));
    }
    Ok(())
}

fn check_readable(path: &Path) -> Result<(), EfuError> {
    let file = File::open(path).map_err(|e| EfuError::io(path, e))?;
    let metadata = file.metadata().map_err(|e| EfuError::io(path, e))?;
    if !metadata.is_file() {
        return Err(EfuError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn options(value: Value) -> OptionValues {
        match value {
            Value::Object(map) => map,
            _ => OptionValues::new(),
        }
    }

    fn artifact() -> Result<tempfile::NamedTempFile, std::io::Error> {
        let mut file = tempfile::NamedTempFile::new()?;
        file.write_all(b"\x7fELF kernel image")?;
        Ok(file)
    }

    #[test]
    fn test_render_hides_defaults() -> TestResult {
        let file = artifact()?;
        let obj = Object::construct(
            options(json!({"target": "/dev/mmcblk0p2", "chunk-size": 4096})),
            "raw",
            file.path(),
        )?;
        let path = file.path().display().to_string();
        assert_eq!(
            obj.to_string(),
            format!("filename:   {path}\nmode:       raw\ntarget:     /dev/mmcblk0p2\nchunk-size: 4096")
        );
        Ok(())
    }

    #[test]
    fn test_render_with_defaults_lists_every_option() -> TestResult {
        let file = artifact()?;
        let obj = Object::construct(options(json!({})), "raw", file.path())?;
        let rendered = obj.render(true);
        for key in ["target-type", "chunk-size", "skip", "seek", "count", "truncate"] {
            assert!(rendered.contains(key), "{key} missing from {rendered}");
        }
        assert!(rendered.contains("install-condition: always"));
        assert!(!rendered.contains("sha256sum"));
        Ok(())
    }

    #[test]
    fn test_render_is_deterministic() -> TestResult {
        let file = artifact()?;
        let opts = options(json!({
            "target": "/dev/mtd2",
            "install-condition": "content-equals",
        }));
        let a = Object::construct(opts.clone(), "flash", file.path())?;
        let b = Object::construct(opts, "flash", file.path())?;
        assert_eq!(a.to_string(), b.to_string());
        assert!(a.to_string().ends_with("install-condition: content-equals"));
        Ok(())
    }

    #[test]
    fn test_set_is_atomic() -> TestResult {
        let file = artifact()?;
        let mut obj = Object::construct(
            options(json!({
                "target": "/dev/sda1",
                "filesystem": "ext4",
                "target-path": "/boot/zImage",
            })),
            "copy",
            file.path(),
        )?;
        let before = obj.to_template();

        assert!(matches!(
            obj.set("format-options", json!("-O ^has_journal")),
            Err(EfuError::InvalidOption { .. })
        ));
        assert!(matches!(
            obj.set("target-path", json!("relative/zImage")),
            Err(EfuError::InvalidOption { .. })
        ));
        assert!(matches!(
            obj.set("sha256sum", json!("00")),
            Err(EfuError::InvalidOption { .. })
        ));
        assert!(matches!(
            obj.set("no-such-option", json!(1)),
            Err(EfuError::UnknownOption(_))
        ));
        assert_eq!(obj.to_template(), before);

        obj.set("format", json!(true))?;
        obj.set("format-options", json!("-O ^has_journal"))?;
        assert_eq!(obj.get("format-options")?, json!("-O ^has_journal"));

        obj.set("install-condition", json!("content-equals"))?;
        assert_eq!(obj.install_condition(), &InstallCondition::ContentEquals);
        Ok(())
    }

    #[test]
    fn test_update_switches_to_pattern_at_offset() -> TestResult {
        let file = artifact()?;
        let mut obj = Object::construct(options(json!({})), "raw", file.path())?;

        // one key at a time cannot get there
        assert!(matches!(
            obj.set("install-condition", json!("pattern-at-offset")),
            Err(EfuError::InvalidOption { .. })
        ));
        assert!(matches!(
            obj.set("install-condition-pattern", json!("v1")),
            Err(EfuError::InvalidOption { .. })
        ));
        assert_eq!(obj.install_condition(), &InstallCondition::Always);

        obj.update(options(json!({
            "install-condition": "pattern-at-offset",
            "install-condition-pattern": "v1",
            "install-condition-seek": 0,
            "install-condition-buffer-size": 64,
            "skip": 8,
        })))?;
        assert_eq!(
            obj.install_condition(),
            &InstallCondition::pattern_at_offset("v1", 0, 64)?
        );
        assert_eq!(obj.get("skip")?, json!(8));

        // same kind keeps the other pattern fields
        obj.set("install-condition-seek", json!(512))?;
        assert_eq!(
            obj.install_condition(),
            &InstallCondition::pattern_at_offset("v1", 512, 64)?
        );

        // a new kind drops them
        obj.set("install-condition", json!("content-equals"))?;
        assert_eq!(obj.install_condition(), &InstallCondition::ContentEquals);
        assert_eq!(obj.get("install-condition-pattern")?, Value::Null);
        Ok(())
    }

    #[test]
    fn test_update_is_atomic() -> TestResult {
        let file = artifact()?;
        let mut obj = Object::construct(options(json!({"skip": 4})), "raw", file.path())?;
        let before = obj.to_template();

        let result = obj.update(options(json!({
            "skip": 16,
            "install-condition": "pattern-at-offset",
            "install-condition-pattern": "v1",
        })));
        assert!(matches!(result, Err(EfuError::InvalidOption { .. })));
        assert_eq!(obj.to_template(), before);
        Ok(())
    }

    #[test]
    fn test_set_null_reverts_to_default() -> TestResult {
        let file = artifact()?;
        let mut obj = Object::construct(options(json!({"skip": 16})), "raw", file.path())?;
        assert_eq!(obj.get("skip")?, json!(16));
        obj.set("skip", Value::Null)?;
        assert_eq!(obj.get("skip")?, json!(0));
        Ok(())
    }

    #[test]
    fn test_directory_is_not_an_artifact() -> TestResult {
        let dir = tempfile::tempdir()?;
        let result = Object::construct(options(json!({})), "raw", dir.path());
        assert!(matches!(result, Err(EfuError::Io { .. })));
        Ok(())
    }
}
