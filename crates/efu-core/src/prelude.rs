//! Convenience re-exports for common package building types

pub use crate::config::{ConfigSource, Credentials};
pub use crate::content::{ContentInfo, compute_data_hash};
pub use crate::error::EfuError;
pub use crate::install_condition::InstallCondition;
pub use crate::install_set::InstallSet;
pub use crate::mode::{Mode, ModeRegistry, OptionValues, registry};
pub use crate::object::Object;
pub use crate::option::{Literal, ModeOption, OptionKind};
pub use crate::package::{Package, ProductId};
pub use crate::schema::{JsonSchemaValidator, SchemaValidator};
