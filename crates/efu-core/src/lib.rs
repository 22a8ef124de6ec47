//! Object model and package manifests for embedded firmware updates
//!
//! This crate builds the description of an update package:
//! - installable objects, each an artifact file with a mode and options
//! - per-mode option vocabularies with defaults, rules and dependencies
//! - values computed from file content (size, digest, compression)
//! - install conditions deciding whether an object needs installing
//! - packages: ordered objects for one product version, with A/B install sets
//!
//! # Architecture
//!
//! - [`option`]: option descriptors and their validation rules
//! - [`mode`]: the [`Mode`](mode::Mode) trait and the mode registry
//! - [`modes`]: built-in modes
//! - [`object`]: objects, templates and metadata fragments
//! - [`install_condition`]: install condition encoding
//! - [`content`]: artifact inspection
//! - [`package`]: packages and package metadata
//! - [`schema`]: validation of generated metadata
//! - [`config`]: configuration seam for front ends
//! - [`error`]: error types
//!
//! Every metadata document is validated against an embedded JSON schema
//! before it is returned.
//!
//! # Example
//!
//! ```no_run
//! use efu_core::prelude::*;
//! use serde_json::json;
//!
//! # fn example() -> Result<(), EfuError> {
//! let mut package = Package::new(1234u64, "2.0")?;
//! let options = match json!({"target": "/dev/mmcblk0p2"}) {
//!     serde_json::Value::Object(map) => map,
//!     _ => OptionValues::new(),
//! };
//! let id = package.add(Object::construct(options, "raw", "rootfs.img")?);
//! println!("{}", package.get(id)?);
//! println!("{}", package.metadata()?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod content;
pub mod error;
pub mod install_condition;
pub mod install_set;
pub mod mode;
pub mod modes;
pub mod object;
pub mod option;
pub mod package;
pub mod prelude;
pub mod schema;

pub use config::{ConfigSource, Credentials};
pub use content::{ContentInfo, compute_data_hash};
pub use error::EfuError;
pub use install_condition::InstallCondition;
pub use install_set::InstallSet;
pub use mode::{Mode, ModeRegistry, OptionValues, registry};
pub use object::Object;
pub use package::{Package, ProductId};
