//! Installation modes and the mode registry
//!
//! A mode is a named installation strategy with its own option vocabulary.
//! Modes are unit types implementing [`Mode`], declared once as statics and
//! looked up by name through a [`ModeRegistry`]. The process-wide registry
//! returned by [`registry`] is populated on first use with the built-in modes
//! and is read-only afterwards.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::EfuError;
use crate::install_condition::InstallCondition;
use crate::modes;
use crate::option::ModeOption;

/// Resolved option values handed to mode hooks, keyed by option key
pub type OptionValues = Map<String, Value>;

/// A named installation strategy
pub trait Mode: Send + Sync + std::fmt::Debug {
    /// Registry key, also written to templates and metadata
    fn name(&self) -> &'static str;

    /// Options of this mode in display order
    fn options(&self) -> &'static [ModeOption];

    /// Whether objects of this mode may carry an install condition other than `always`
    fn supports_install_condition(&self) -> bool {
        false
    }

    /// Name of the schema the metadata fragment must satisfy
    fn schema_name(&self) -> String {
        format!("{}-object.json", self.name())
    }

    /// Cross-field checks on resolved non-volatile values
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] naming the first offending key.
    fn validate(&self, _options: &OptionValues) -> Result<(), EfuError> {
        Ok(())
    }

    /// Look up an option descriptor by key
    fn option(&self, key: &str) -> Option<&'static ModeOption> {
        self.options().iter().find(|o| o.key == key)
    }

    /// Convert command-line text for `key` using the key's declared kind
    ///
    /// Keys the mode does not declare are kept as strings and rejected later
    /// by construction or update.
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] when the text does not parse as the
    /// key's kind.
    fn parse_text(&self, key: &str, text: &str) -> Result<Value, EfuError> {
        if InstallCondition::is_condition_key(key) {
            return InstallCondition::parse_text(key, text);
        }
        match self.option(key) {
            Some(option) => option.parse_text(text),
            None => Ok(Value::from(text)),
        }
    }

    /// Convert a list of `key`/text pairs with [`Mode::parse_text`]
    ///
    /// # Errors
    ///
    /// Returns the first conversion error.
    fn parse_options(&self, pairs: &[(String, String)]) -> Result<OptionValues, EfuError> {
        pairs
            .iter()
            .map(|(key, text)| Ok((key.clone(), self.parse_text(key, text)?)))
            .collect()
    }
}

/// Name-keyed table of modes
#[derive(Debug, Default)]
pub struct ModeRegistry {
    modes: BTreeMap<&'static str, &'static dyn Mode>,
}

impl ModeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in mode
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for mode in modes::BUILTIN {
            registry.modes.insert(mode.name(), *mode);
        }
        registry
    }

    /// Add a mode
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::DuplicateMode`] if the name is already registered.
    pub fn register(&mut self, mode: &'static dyn Mode) -> Result<(), EfuError> {
        let name = mode.name();
        if self.modes.contains_key(name) {
            return Err(EfuError::DuplicateMode(name.to_string()));
        }
        debug!(mode = name, "Registered mode");
        self.modes.insert(name, mode);
        Ok(())
    }

    /// Look up a mode by name
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::UnknownMode`] if no mode has this name.
    pub fn get(&self, name: &str) -> Result<&'static dyn Mode, EfuError> {
        self.modes
            .get(name)
            .copied()
            .ok_or_else(|| EfuError::UnknownMode(name.to_string()))
    }

    /// Registered mode names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.modes.keys().copied()
    }

    /// Number of registered modes
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Whether no mode is registered
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

/// Process-wide registry of built-in modes
pub fn registry() -> &'static ModeRegistry {
    static REGISTRY: OnceLock<ModeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(ModeRegistry::builtin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::SIZE;

    #[derive(Debug)]
    struct Probe;

    impl Mode for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn options(&self) -> &'static [ModeOption] {
            &[SIZE]
        }
    }

    static PROBE: Probe = Probe;

    #[test]
    fn test_register_and_get() -> Result<(), EfuError> {
        let mut registry = ModeRegistry::new();
        assert!(registry.is_empty());
        registry.register(&PROBE)?;
        assert_eq!(registry.get("probe")?.name(), "probe");
        assert_eq!(registry.len(), 1);
        Ok(())
    }

    #[test]
    fn test_duplicate_registration_fails() -> Result<(), EfuError> {
        let mut registry = ModeRegistry::new();
        registry.register(&PROBE)?;
        assert!(matches!(
            registry.register(&PROBE),
            Err(EfuError::DuplicateMode(ref name)) if name == "probe"
        ));
        Ok(())
    }

    #[test]
    fn test_unknown_mode() {
        assert!(matches!(
            registry().get("zip"),
            Err(EfuError::UnknownMode(ref name)) if name == "zip"
        ));
    }

    #[test]
    fn test_builtin_modes() {
        let names: Vec<_> = registry().names().collect();
        assert_eq!(
            names,
            vec!["copy", "flash", "mender", "raw", "tarball", "ubifs"]
        );
    }

    #[test]
    fn test_option_keys_are_unique_per_mode() {
        for name in registry().names() {
            let Ok(mode) = registry().get(name) else {
                continue;
            };
            let mut keys: Vec<_> = mode.options().iter().map(|o| o.key).collect();
            let total = keys.len();
            keys.sort_unstable();
            keys.dedup();
            assert_eq!(keys.len(), total, "duplicate option key in mode {name}");
        }
    }

    #[test]
    fn test_parse_options_uses_declared_kinds() -> Result<(), EfuError> {
        let pairs: Vec<(String, String)> = [
            ("target", "0"),
            ("chunk-size", "4096"),
            ("truncate", "false"),
            ("install-condition-pattern", "2017"),
            ("install-condition-seek", "16"),
            ("no-such-option", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let parsed = registry().get("raw")?.parse_options(&pairs)?;
        assert_eq!(parsed.get("target"), Some(&Value::from("0")));
        assert_eq!(parsed.get("chunk-size"), Some(&Value::from(4096)));
        assert_eq!(parsed.get("truncate"), Some(&Value::Bool(false)));
        assert_eq!(
            parsed.get("install-condition-pattern"),
            Some(&Value::from("2017"))
        );
        assert_eq!(parsed.get("install-condition-seek"), Some(&Value::from(16)));
        assert_eq!(parsed.get("no-such-option"), Some(&Value::from("1")));
        Ok(())
    }

    #[test]
    fn test_schema_name() -> Result<(), EfuError> {
        assert_eq!(registry().get("raw")?.schema_name(), "raw-object.json");
        Ok(())
    }
}
