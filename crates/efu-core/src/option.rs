//! Declarative option descriptors
//!
//! A [`ModeOption`] describes one configurable field of a mode: the key it is
//! stored under in templates and metadata, its default, whether it is computed
//! from file content (volatile) and the rule values must satisfy. Descriptors
//! are `const` so modes can declare their vocabulary as static tables.

use serde_json::Value;

use crate::error::EfuError;

/// Template key naming the artifact file
pub const FILENAME: &str = "filename";
/// Template and metadata key naming the mode
pub const MODE: &str = "mode";

/// Constant value usable in static option tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal {
    /// No value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// String value
    Str(&'static str),
}

impl Literal {
    /// Convert into a JSON value
    pub fn to_value(self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(b),
            Literal::Int(i) => Value::from(i),
            Literal::Str(s) => Value::from(s),
        }
    }

    /// Check whether a JSON value equals this literal
    pub fn matches(self, value: &Value) -> bool {
        self.to_value() == *value
    }
}

/// Validation rule for option values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Non-empty string, restricted to `choices` unless that is empty
    String {
        /// Accepted values
        choices: &'static [&'static str],
    },
    /// Integer in the inclusive range `min..=max`
    Integer {
        /// Smallest accepted value
        min: i64,
        /// Largest accepted value
        max: i64,
    },
    /// `true` or `false`
    Boolean,
}

/// Descriptor of one configurable field of a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeOption {
    /// Key used in both template and metadata documents
    pub key: &'static str,
    /// Value rule
    pub kind: OptionKind,
    /// Value used when none is supplied
    pub default: Literal,
    /// Computed from content, never taken from input
    pub volatile: bool,
    /// Must be supplied when there is no default
    pub required: bool,
    /// Only valid while another option resolves to the given value
    pub requires: Option<(&'static str, Literal)>,
}

impl ModeOption {
    const fn new(key: &'static str, kind: OptionKind) -> Self {
        Self {
            key,
            kind,
            default: Literal::Null,
            volatile: false,
            required: false,
            requires: None,
        }
    }

    /// Free-form string option
    pub const fn string(key: &'static str) -> Self {
        Self::new(key, OptionKind::String { choices: &[] })
    }

    /// String option restricted to a fixed vocabulary
    pub const fn choice(key: &'static str, choices: &'static [&'static str]) -> Self {
        Self::new(key, OptionKind::String { choices })
    }

    /// Integer option
    pub const fn integer(key: &'static str, min: i64, max: i64) -> Self {
        Self::new(key, OptionKind::Integer { min, max })
    }

    /// Boolean option
    pub const fn boolean(key: &'static str) -> Self {
        Self::new(key, OptionKind::Boolean)
    }

    /// Set the default value
    pub const fn with_default(mut self, default: Literal) -> Self {
        self.default = default;
        self
    }

    /// Mark as computed from content
    pub const fn volatile(mut self) -> Self {
        self.volatile = true;
        self
    }

    /// Mark as mandatory
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Make the option depend on another option's value
    pub const fn requires(mut self, key: &'static str, value: Literal) -> Self {
        self.requires = Some((key, value));
        self
    }

    /// Default as a JSON value
    pub fn default_value(&self) -> Value {
        self.default.to_value()
    }

    /// Convert command-line text to a value of this option's kind
    ///
    /// `null` yields `Null` for every kind. String options keep the text as
    /// given, so `2017` stays a string.
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] when integer or boolean text does not parse.
    pub fn parse_text(&self, text: &str) -> Result<Value, EfuError> {
        if text == "null" {
            return Ok(Value::Null);
        }
        match self.kind {
            OptionKind::String { .. } => Ok(Value::from(text)),
            OptionKind::Integer { .. } => text
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| {
                    EfuError::invalid_option(self.key, format!("expected an integer: {e}"))
                }),
            OptionKind::Boolean => text
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|e| {
                    EfuError::invalid_option(self.key, format!("expected a boolean: {e}"))
                }),
        }
    }

    /// Check a caller-supplied value against the rule
    pub fn validate(&self, value: &Value) -> Result<(), EfuError> {
        match self.kind {
            OptionKind::String { choices } => {
                let Some(s) = value.as_str() else {
                    return Err(EfuError::invalid_option(self.key, "expected a string"));
                };
                if s.is_empty() {
                    return Err(EfuError::invalid_option(self.key, "must not be empty"));
                }
                if !choices.is_empty() && !choices.contains(&s) {
                    return Err(EfuError::invalid_option(
                        self.key,
                        format!("'{s}' is not one of: {}", choices.join(", ")),
                    ));
                }
            }
            OptionKind::Integer { min, max } => {
                let Some(i) = value.as_i64() else {
                    return Err(EfuError::invalid_option(self.key, "expected an integer"));
                };
                if i < min || i > max {
                    return Err(EfuError::invalid_option(
                        self.key,
                        format!("{i} is out of range [{min}, {max}]"),
                    ));
                }
            }
            OptionKind::Boolean => {
                if !value.is_boolean() {
                    return Err(EfuError::invalid_option(self.key, "expected a boolean"));
                }
            }
        }
        Ok(())
    }
}

/// Supported filesystems for modes that mount their target
pub const FILESYSTEMS: &[&str] = &[
    "btrfs", "ext2", "ext3", "ext4", "f2fs", "jffs2", "ubifs", "vfat", "xfs",
];

/// Content size in bytes
pub const SIZE: ModeOption = ModeOption::integer("size", 0, i64::MAX).volatile();
/// Lowercase hex SHA-256 of the content
pub const SHA256SUM: ModeOption = ModeOption::string("sha256sum").volatile();
/// Set when the content is gzip compressed
pub const COMPRESSED: ModeOption = ModeOption::boolean("compressed").volatile();
/// Decompressed length of compressed content
pub const REQUIRED_UNCOMPRESSED_SIZE: ModeOption =
    ModeOption::integer("required-uncompressed-size", 0, i64::MAX).volatile();

/// Device, volume or partition the object is written to
pub const TARGET: ModeOption = ModeOption::string("target");
/// Write block size
pub const CHUNK_SIZE: ModeOption =
    ModeOption::integer("chunk-size", 1, i64::MAX).with_default(Literal::Int(131_072));
/// Filesystem of the target
pub const FILESYSTEM: ModeOption = ModeOption::choice("filesystem", FILESYSTEMS).required();
/// Destination inside the mounted target
pub const TARGET_PATH: ModeOption = ModeOption::string("target-path").required();
/// Format the target before installing
pub const FORMAT: ModeOption = ModeOption::boolean("format").with_default(Literal::Bool(false));
/// Extra arguments for the formatter
pub const FORMAT_OPTIONS: ModeOption =
    ModeOption::string("format-options").requires("format", Literal::Bool(true));
/// Extra arguments for mount
pub const MOUNT_OPTIONS: ModeOption = ModeOption::string("mount-options");
