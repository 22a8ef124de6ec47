//! Tarball mode: extract an archive into a mounted filesystem

use super::require_absolute;
use crate::error::EfuError;
use crate::mode::{Mode, OptionValues};
use crate::option::{
    FILESYSTEM, FORMAT, FORMAT_OPTIONS, Literal, MOUNT_OPTIONS, ModeOption, SHA256SUM, SIZE,
    TARGET, TARGET_PATH,
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
    SIZE,
    SHA256SUM,
];

/// Archive extracted below `target-path`
///
/// Archives carry their own compression, so no compression fields are derived
/// and no install condition applies to the extracted tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballMode;

impl Mode for TarballMode {
    fn name(&self) -> &'static str {
        "tarball"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }

    fn validate(&self, options: &OptionValues) -> Result<(), EfuError> {
        require_absolute(options, TARGET_PATH.key)
    }
}
