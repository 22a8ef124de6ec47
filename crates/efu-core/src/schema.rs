//! Schema validation of generated metadata
//!
//! Object and package metadata are checked against JSON schemas embedded in
//! the crate. The validator is a seam: the object model only needs
//! `validate(schema_name, document)`, implemented here with `jsonschema`.

use std::collections::HashMap;
use std::sync::OnceLock;

use jsonschema::Validator;
use serde_json::Value;
use tracing::error;

use crate::error::EfuError;

/// Name of the package-level schema
pub const PACKAGE_SCHEMA: &str = "metadata.json";

const SOURCES: &[(&str, &str)] = &[
    ("raw-object.json", include_str!("../schemas/raw-object.json")),
    ("copy-object.json", include_str!("../schemas/copy-object.json")),
    ("tarball-object.json", include_str!("../schemas/tarball-object.json")),
    ("flash-object.json", include_str!("../schemas/flash-object.json")),
    ("ubifs-object.json", include_str!("../schemas/ubifs-object.json")),
    ("mender-object.json", include_str!("../schemas/mender-object.json")),
    (PACKAGE_SCHEMA, include_str!("../schemas/metadata.json")),
];

/// Validates documents against named schemas
pub trait SchemaValidator {
    /// Check `document` against the schema registered as `schema_name`
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::SchemaViolation`] when the document does not conform
    /// or no schema has that name.
    fn validate(&self, schema_name: &str, document: &Value) -> Result<(), EfuError>;
}

/// Compiled embedded schemas
pub struct JsonSchemaValidator {
    validators: HashMap<&'static str, Validator>,
}

impl JsonSchemaValidator {
    /// Compile every embedded schema
    ///
    /// # Errors
    ///
    /// Returns [`EfuError::SchemaViolation`] if an embedded schema is not valid
    /// JSON or not a valid schema.
    pub fn builtin() -> Result<Self, EfuError> {
        let mut validators = HashMap::with_capacity(SOURCES.len());
        for (name, source) in SOURCES {
            let schema: Value =
                serde_json::from_str(source).map_err(|e| compile_error(name, &e))?;
            let validator = Validator::new(&schema).map_err(|e| compile_error(name, &e))?;
            validators.insert(*name, validator);
        }
        Ok(Self { validators })
    }

    /// Names of the compiled schemas
    pub fn schema_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.validators.keys().copied()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema_name: &str, document: &Value) -> Result<(), EfuError> {
        let Some(validator) = self.validators.get(schema_name) else {
            return Err(EfuError::SchemaViolation {
                schema: schema_name.to_string(),
                message: "no such schema".to_string(),
            });
        };
        validator.validate(document).map_err(|e| {
            error!(schema = schema_name, error = %e, "Generated metadata failed validation");
            EfuError::SchemaViolation {
                schema: schema_name.to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.schema_names().collect();
        names.sort_unstable();
        f.debug_struct("JsonSchemaValidator")
            .field("schemas", &names)
            .finish()
    }
}

fn compile_error(name: &str, e: &dyn std::fmt::Display) -> EfuError {
    EfuError::SchemaViolation {
        schema: name.to_string(),
        message: format!("schema does not compile: {e}"),
    }
}

/// Process-wide validator over the embedded schemas, compiled on first use
///
/// # Errors
///
/// Returns [`EfuError::SchemaViolation`] if the embedded schemas do not compile.
pub fn validator() -> Result<&'static JsonSchemaValidator, EfuError> {
    static VALIDATOR: OnceLock<Result<JsonSchemaValidator, (String, String)>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            JsonSchemaValidator::builtin().map_err(|e| match e {
                EfuError::SchemaViolation { schema, message } => (schema, message),
                other => (String::new(), other.to_string()),
            })
        })
        .as_ref()
        .map_err(|(schema, message)| EfuError::SchemaViolation {
            schema: schema.clone(),
            message: message.clone(),
        })
}
