//! Copy mode: place the file inside a mounted filesystem

use super::require_absolute;
use crate::error::EfuError;
use crate::mode::{Mode, OptionValues};
use crate::option::{
    CHUNK_SIZE, COMPRESSED, FILESYSTEM, FORMAT, FORMAT_OPTIONS, Literal, MOUNT_OPTIONS,
    ModeOption, REQUIRED_UNCOMPRESSED_SIZE, SHA256SUM, SIZE, TARGET, TARGET_PATH,
};

const OPTIONS: &[ModeOption] = &[
    ModeOption::choice("target-type", &["device", "ubivolume", "mtdname"])
        .with_default(Literal::Str("device")),
    TARGET.required(),
    FILESYSTEM,
    TARGET_PATH,
    FORMAT,
    FORMAT_OPTIONS,
    MOUNT_OPTIONS,
    CHUNK_SIZE,
    SIZE,
    SHA256SUM,
    COMPRESSED,
    REQUIRED_UNCOMPRESSED_SIZE,
];

/// Single file copied to `target-path` on the mounted target
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyMode;

impl Mode for CopyMode {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }

    fn supports_install_condition(&self) -> bool {
        true
    }

    fn validate(&self, options: &OptionValues) -> Result<(), EfuError> {
        require_absolute(options, TARGET_PATH.key)
    }
}
