//! Update packages
//!
//! A [`Package`] is an ordered list of objects plus the product and version
//! it targets. Objects are addressed by their position: ids start at 0 in
//! insertion order and stay dense, so removing or moving an object renumbers
//! the ones after it.
//!
//! The package description document doubles as the package template:
//!
//! ```json
//! {
//!   "product": 1234,
//!   "version": "2.0",
//!   "files": [
//!     {"filename": "rootfs.img", "mode": "raw", "target": "/dev/mmcblk0p2"},
//!     {"filename": "kernel.img", "install-set": "b"}
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::EfuError;
use crate::install_set::InstallSet;
use crate::object::Object;
use crate::schema::{self, PACKAGE_SCHEMA, SchemaValidator};

/// Key of the object list in package metadata
pub const IMAGES: &str = "images";
/// Key of the A/B grouping in package metadata
pub const INSTALL_SETS: &str = "install-sets";
/// Per-file key assigning an object to an install set
pub const INSTALL_SET: &str = "install-set";

/// Product identifier, numeric or textual as supplied
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductId {
    /// Numeric identifier
    Number(u64),
    /// Textual identifier
    Text(String),
}

impl ProductId {
    fn to_value(&self) -> Value {
        match self {
            ProductId::Number(n) => Value::from(*n),
            ProductId::Text(s) => Value::from(s.as_str()),
        }
    }

    fn is_empty(&self) -> bool {
        matches!(self, ProductId::Text(s) if s.is_empty())
    }
}

impl From<u64> for ProductId {
    fn from(n: u64) -> Self {
        ProductId::Number(n)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId::Text(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        ProductId::Text(s)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductId::Number(n) => write!(f, "{n}"),
            ProductId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    product: ProductId,
    version: String,
    #[serde(default)]
    files: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone)]
struct Entry {
    object: Object,
    install_set: Option<InstallSet>,
}

/// Ordered collection of objects targeting one product version
#[derive(Debug, Clone)]
pub struct Package {
    product_id: ProductId,
    version: String,
    entries: Vec<Entry>,
}

impl Package {
    /// Create an empty package
    ///
    /// # Errors
    ///
    /// [`EfuError::InvalidPackage`] if the product id or version is empty.
    pub fn new(product_id: impl Into<ProductId>, version: impl Into<String>) -> Result<Self, EfuError> {
        let product_id = product_id.into();
        let version = version.into();
        if product_id.is_empty() {
            return Err(EfuError::InvalidPackage("product id must not be empty".to_string()));
        }
        if version.is_empty() {
            return Err(EfuError::InvalidPackage("version must not be empty".to_string()));
        }
        Ok(Self {
            product_id,
            version,
            entries: Vec::new(),
        })
    }

    /// Load a package description document
    ///
    /// Every listed file becomes one object built with [`Object::load`].
    ///
    /// # Errors
    ///
    /// [`EfuError::InvalidPackageFile`] if the document is missing, unreadable,
    /// not JSON or lacks the package fields. Errors building an object are
    /// returned as-is.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, EfuError> {
        let path = path.as_ref();
        debug!(path = ?path, "Loading package file");
        let bytes = std::fs::read(path)
            .map_err(|e| EfuError::invalid_package_file(path, e.to_string()))?;
        let document: PackageDocument = serde_json::from_slice(&bytes)
            .map_err(|e| EfuError::invalid_package_file(path, e.to_string()))?;
        let package = Self::from_document(document).map_err(|e| match e {
            EfuError::InvalidPackage(reason) => EfuError::invalid_package_file(path, reason),
            other => other,
        })?;
        info!(path = ?path, objects = package.len(), "Loaded package file");
        Ok(package)
    }

    /// Build a package from a template produced by [`Package::to_template`]
    ///
    /// # Errors
    ///
    /// [`EfuError::InvalidPackage`] if the document lacks the package fields;
    /// errors building an object are returned as-is.
    pub fn from_template(template: &Value) -> Result<Self, EfuError> {
        let document = PackageDocument::deserialize(template)
            .map_err(|e| EfuError::InvalidPackage(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: PackageDocument) -> Result<Self, EfuError> {
        let mut package = Self::new(document.product, document.version)?;
        for mut file in document.files {
            let install_set = match file.remove(INSTALL_SET) {
                Some(Value::String(set)) => Some(set.parse::<InstallSet>()?),
                None | Some(Value::Null) => None,
                Some(other) => {
                    return Err(EfuError::invalid_option(
                        INSTALL_SET,
                        format!("{other} is not one of: a, b"),
                    ));
                }
            };
            let object = Object::load(&file)?;
            package.entries.push(Entry {
                object,
                install_set,
            });
        }
        Ok(package)
    }

    /// Product identifier
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Package version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of objects
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the package has no objects
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Objects with their ids, in id order
    pub fn objects(&self) -> impl Iterator<Item = (usize, &Object)> {
        self.entries.iter().map(|e| &e.object).enumerate()
    }

    /// Object with the given id
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if no object has this id.
    pub fn get(&self, id: usize) -> Result<&Object, EfuError> {
        self.entries
            .get(id)
            .map(|e| &e.object)
            .ok_or(EfuError::ObjectNotFound(id))
    }

    /// Mutable object with the given id
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if no object has this id.
    pub fn get_mut(&mut self, id: usize) -> Result<&mut Object, EfuError> {
        self.entries
            .get_mut(id)
            .map(|e| &mut e.object)
            .ok_or(EfuError::ObjectNotFound(id))
    }

    /// Append an object and return its id
    pub fn add(&mut self, object: Object) -> usize {
        self.push(object, None)
    }

    /// Append an object to an install set and return its id
    pub fn add_to_set(&mut self, object: Object, install_set: InstallSet) -> usize {
        self.push(object, Some(install_set))
    }

    fn push(&mut self, object: Object, install_set: Option<InstallSet>) -> usize {
        let id = self.entries.len();
        debug!(id, path = ?object.source_path(), "Adding object");
        self.entries.push(Entry {
            object,
            install_set,
        });
        id
    }

    /// Install set of an object
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if no object has this id.
    pub fn install_set(&self, id: usize) -> Result<Option<InstallSet>, EfuError> {
        self.entries
            .get(id)
            .map(|e| e.install_set)
            .ok_or(EfuError::ObjectNotFound(id))
    }

    /// Assign an object to an install set, or clear its assignment
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if no object has this id.
    pub fn set_install_set(
        &mut self,
        id: usize,
        install_set: Option<InstallSet>,
    ) -> Result<(), EfuError> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or(EfuError::ObjectNotFound(id))?;
        entry.install_set = install_set;
        Ok(())
    }

    /// Remove an object; later objects move down one id
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if no object has this id.
    pub fn remove(&mut self, id: usize) -> Result<Object, EfuError> {
        if id >= self.entries.len() {
            return Err(EfuError::ObjectNotFound(id));
        }
        let entry = self.entries.remove(id);
        info!(id, path = ?entry.object.source_path(), "Removed object");
        Ok(entry.object)
    }

    /// Move an object so that it ends up with id `to`
    ///
    /// # Errors
    ///
    /// [`EfuError::ObjectNotFound`] if either id is out of range.
    pub fn move_object(&mut self, id: usize, to: usize) -> Result<(), EfuError> {
        let len = self.entries.len();
        if id >= len {
            return Err(EfuError::ObjectNotFound(id));
        }
        if to >= len {
            return Err(EfuError::ObjectNotFound(to));
        }
        let entry = self.entries.remove(id);
        self.entries.insert(to, entry);
        debug!(from = id, to, "Moved object");
        Ok(())
    }

    /// Listing of every object's template with its id, size and digest
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if an artifact cannot be read.
    pub fn as_dict(&self) -> Result<Value, EfuError> {
        let mut objects = Vec::with_capacity(self.entries.len());
        for (id, entry) in self.entries.iter().enumerate() {
            let content = entry.object.content()?;
            let mut summary = entry.object.to_template();
            summary.insert("id".to_string(), Value::from(id));
            summary.insert("size".to_string(), Value::from(content.size));
            summary.insert("sha256sum".to_string(), Value::from(content.sha256sum));
            if let Some(set) = entry.install_set {
                summary.insert(INSTALL_SET.to_string(), Value::from(set.to_string()));
            }
            objects.push(Value::Object(summary));
        }

        let mut out = self.identity();
        out.insert("objects".to_string(), Value::Array(objects));
        Ok(Value::Object(out))
    }

    /// Package manifest consumed by the update client
    ///
    /// `images` holds one validated fragment per object in id order. When any
    /// object is assigned to an install set, `install-sets` lists the ids of
    /// set A and set B.
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if an artifact cannot be read, or
    /// [`EfuError::SchemaViolation`] if a fragment or the package document
    /// does not satisfy its schema.
    pub fn metadata(&self) -> Result<Value, EfuError> {
        self.metadata_with(schema::validator()?)
    }

    /// Package manifest validated with a caller-provided validator
    ///
    /// # Errors
    ///
    /// Same as [`Package::metadata`].
    pub fn metadata_with(&self, validator: &dyn SchemaValidator) -> Result<Value, EfuError> {
        let images = self
            .entries
            .iter()
            .map(|e| e.object.to_metadata_with(validator))
            .collect::<Result<Vec<_>, _>>()?;

        let mut out = self.identity();
        out.insert(IMAGES.to_string(), Value::Array(images));
        if self.entries.iter().any(|e| e.install_set.is_some()) {
            let sets = InstallSet::ALL
                .iter()
                .map(|set| {
                    self.entries
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.install_set == Some(*set))
                        .map(|(id, _)| Value::from(id))
                        .collect::<Vec<_>>()
                })
                .map(Value::Array)
                .collect();
            out.insert(INSTALL_SETS.to_string(), Value::Array(sets));
        }

        let document = Value::Object(out);
        validator.validate(PACKAGE_SCHEMA, &document)?;
        Ok(document)
    }

    /// Editable package template, the same shape as a package description document
    pub fn to_template(&self) -> Value {
        let files = self
            .entries
            .iter()
            .map(|entry| {
                let mut file = entry.object.to_template();
                if let Some(set) = entry.install_set {
                    file.insert(INSTALL_SET.to_string(), Value::from(set.to_string()));
                }
                Value::Object(file)
            })
            .collect();

        let mut out = self.identity();
        out.insert("files".to_string(), Value::Array(files));
        Value::Object(out)
    }

    /// Write the template to `path`
    ///
    /// The document is written to a temporary sibling first and renamed over
    /// `path`, so an interrupted save leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// [`EfuError::Io`] if writing or renaming fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EfuError> {
        let path = path.as_ref();
        let mut json = serde_json::to_string_pretty(&self.to_template())?;
        json.push('\n');

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = std::path::PathBuf::from(temp_name);
        std::fs::write(&temp_path, json).map_err(|e| EfuError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, path).map_err(|e| EfuError::io(path, e))?;

        info!(path = ?path, objects = self.len(), "Saved package");
        Ok(())
    }

    fn identity(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("product".to_string(), self.product_id.to_value());
        out.insert("version".to_string(), Value::from(self.version.as_str()));
        out
    }
}
