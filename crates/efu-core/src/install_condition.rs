//! Install condition sub-model
//!
//! The update client evaluates the install condition at install time to
//! decide whether an object is applied. This module owns its validation and
//! its two encodings: flat `install-condition*` keys in templates and a nested
//! `install-condition` object in metadata.

use serde_json::{Map, Value};

use crate::error::EfuError;

/// Template key selecting the condition kind
pub const INSTALL_CONDITION: &str = "install-condition";
/// Template key for the pattern searched in the installed target
pub const PATTERN: &str = "install-condition-pattern";
/// Template key for the byte offset the search starts at
pub const SEEK: &str = "install-condition-seek";
/// Template key for the number of bytes read for the search
pub const BUFFER_SIZE: &str = "install-condition-buffer-size";

/// Every template key owned by the install condition
pub const KEYS: [&str; 4] = [INSTALL_CONDITION, PATTERN, SEEK, BUFFER_SIZE];

const ALWAYS: &str = "always";
const CONTENT_EQUALS: &str = "content-equals";
const PATTERN_AT_OFFSET: &str = "pattern-at-offset";
const KINDS: [&str; 3] = [ALWAYS, CONTENT_EQUALS, PATTERN_AT_OFFSET];

/// Predicate deciding whether the update client applies an object
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InstallCondition {
    /// Always install
    #[default]
    Always,
    /// Install only when the target content differs from the object content
    ContentEquals,
    /// Install only when `pattern` is absent from `buffer_size` bytes read at `seek`
    PatternAtOffset {
        /// Regular expression searched in the target
        pattern: String,
        /// Byte offset into the target
        seek: u64,
        /// Number of bytes read, always greater than zero
        buffer_size: u64,
    },
}

impl InstallCondition {
    /// Build a validated pattern-at-offset condition
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] for an empty or malformed pattern or a
    /// zero buffer size.
    pub fn pattern_at_offset(
        pattern: impl Into<String>,
        seek: u64,
        buffer_size: u64,
    ) -> Result<Self, EfuError> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(EfuError::invalid_option(PATTERN, "must not be empty"));
        }
        if let Err(e) = regex::Regex::new(&pattern) {
            return Err(EfuError::invalid_option(PATTERN, e.to_string()));
        }
        if buffer_size == 0 {
            return Err(EfuError::invalid_option(BUFFER_SIZE, "must be greater than 0"));
        }
        Ok(Self::PatternAtOffset {
            pattern,
            seek,
            buffer_size,
        })
    }

    /// Name of the condition kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Always => ALWAYS,
            Self::ContentEquals => CONTENT_EQUALS,
            Self::PatternAtOffset { .. } => PATTERN_AT_OFFSET,
        }
    }

    /// Whether `key` belongs to the install condition
    pub fn is_condition_key(key: &str) -> bool {
        KEYS.contains(&key)
    }

    /// Convert command-line text for one of the condition keys
    ///
    /// Seek and buffer size parse as integers; the kind and the pattern stay
    /// strings. `null` yields `Null`.
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] when seek or buffer size text is not an integer.
    pub fn parse_text(key: &str, text: &str) -> Result<Value, EfuError> {
        if text == "null" {
            return Ok(Value::Null);
        }
        match key {
            SEEK | BUFFER_SIZE => text.parse::<u64>().map(Value::from).map_err(|e| {
                EfuError::invalid_option(key, format!("expected an integer >= 0: {e}"))
            }),
            _ => Ok(Value::from(text)),
        }
    }

    /// Take the install condition keys out of a raw option mapping
    ///
    /// Absent or `null` keys count as unset. The pattern fields are only valid
    /// together and only for `pattern-at-offset`.
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::InvalidOption`] for an unknown kind, a stray or missing
    /// pattern field, or a field failing its rule.
    pub fn take_from(options: &mut Map<String, Value>) -> Result<Self, EfuError> {
        let kind = take_non_null(options, INSTALL_CONDITION);
        let pattern = take_non_null(options, PATTERN);
        let seek = take_non_null(options, SEEK);
        let buffer_size = take_non_null(options, BUFFER_SIZE);

        let kind = match &kind {
            None => ALWAYS,
            Some(Value::String(s)) if KINDS.contains(&s.as_str()) => s.as_str(),
            Some(other) => {
                return Err(EfuError::invalid_option(
                    INSTALL_CONDITION,
                    format!("{other} is not one of: {}", KINDS.join(", ")),
                ));
            }
        };

        if kind != PATTERN_AT_OFFSET {
            let stray = [(PATTERN, &pattern), (SEEK, &seek), (BUFFER_SIZE, &buffer_size)]
                .into_iter()
                .find(|(_, value)| value.is_some());
            if let Some((key, _)) = stray {
                return Err(EfuError::invalid_option(
                    key,
                    format!("only valid with {INSTALL_CONDITION} '{PATTERN_AT_OFFSET}'"),
                ));
            }
            return Ok(if kind == CONTENT_EQUALS {
                Self::ContentEquals
            } else {
                Self::Always
            });
        }

        let pattern = match pattern {
            Some(Value::String(s)) => s,
            Some(_) => return Err(EfuError::invalid_option(PATTERN, "expected a string")),
            None => return Err(missing(PATTERN)),
        };
        let seek = match seek {
            Some(value) => value
                .as_u64()
                .ok_or_else(|| EfuError::invalid_option(SEEK, "expected an integer >= 0"))?,
            None => return Err(missing(SEEK)),
        };
        let buffer_size = match buffer_size {
            Some(value) => value.as_u64().ok_or_else(|| {
                EfuError::invalid_option(BUFFER_SIZE, "expected an integer greater than 0")
            })?,
            None => return Err(missing(BUFFER_SIZE)),
        };
        Self::pattern_at_offset(pattern, seek, buffer_size)
    }

    /// Resolved value of one of the condition's template keys
    pub fn get(&self, key: &str) -> Option<Value> {
        match (key, self) {
            (INSTALL_CONDITION, _) => Some(Value::from(self.kind())),
            (PATTERN, Self::PatternAtOffset { pattern, .. }) => Some(Value::from(pattern.as_str())),
            (SEEK, Self::PatternAtOffset { seek, .. }) => Some(Value::from(*seek)),
            (BUFFER_SIZE, Self::PatternAtOffset { buffer_size, .. }) => {
                Some(Value::from(*buffer_size))
            }
            (PATTERN | SEEK | BUFFER_SIZE, _) => Some(Value::Null),
            _ => None,
        }
    }

    /// Write the flat template keys
    pub fn write_template(&self, out: &mut Map<String, Value>) {
        for key in KEYS {
            if let Some(value) = self.get(key).filter(|v| !v.is_null()) {
                out.insert(key.to_string(), value);
            }
        }
    }

    /// Nested metadata encoding, `None` for [`InstallCondition::Always`]
    pub fn to_metadata(&self) -> Option<Value> {
        let mut out = Map::new();
        match self {
            Self::Always => return None,
            Self::ContentEquals => {}
            Self::PatternAtOffset {
                pattern,
                seek,
                buffer_size,
            } => {
                out.insert("pattern".to_string(), Value::from(pattern.as_str()));
                out.insert("seek".to_string(), Value::from(*seek));
                out.insert("buffer-size".to_string(), Value::from(*buffer_size));
            }
        }
        out.insert("kind".to_string(), Value::from(self.kind()));
        Some(Value::Object(out))
    }
}

impl std::fmt::Display for InstallCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PatternAtOffset {
                pattern,
                seek,
                buffer_size,
            } => write!(
                f,
                "{PATTERN_AT_OFFSET} (pattern {pattern:?}, seek {seek}, buffer size {buffer_size})"
            ),
            other => f.write_str(other.kind()),
        }
    }
}

fn take_non_null(options: &mut Map<String, Value>, key: &str) -> Option<Value> {
    options.remove(key).filter(|v| !v.is_null())
}

fn missing(key: &str) -> EfuError {
    EfuError::invalid_option(key, format!("required by {INSTALL_CONDITION} '{PATTERN_AT_OFFSET}'"))
}
