//! Built-in installation modes

mod copy;
mod flash;
mod mender;
mod raw;
mod tarball;
mod ubifs;

pub use copy::CopyMode;
pub use flash::FlashMode;
pub use mender::MenderMode;
pub use raw::RawMode;
pub use tarball::TarballMode;
pub use ubifs::UbifsMode;

use crate::error::EfuError;
use crate::mode::{Mode, OptionValues};

/// Every built-in mode, registered by [`crate::mode::ModeRegistry::builtin`]
pub static BUILTIN: &[&dyn Mode] = &[
    &RawMode,
    &CopyMode,
    &TarballMode,
    &FlashMode,
    &UbifsMode,
    &MenderMode,
];

/// Reject a path option that is set but not absolute
fn require_absolute(options: &OptionValues, key: &str) -> Result<(), EfuError> {
    match options.get(key).and_then(|v| v.as_str()) {
        Some(path) if !path.starts_with('/') => Err(EfuError::invalid_option(
            key,
            format!("'{path}' must be an absolute path"),
        )),
        _ => Ok(()),
    }
}
