//! UBIFS mode: update a UBI volume

use crate::mode::Mode;
use crate::option::{
    COMPRESSED, Literal, ModeOption, REQUIRED_UNCOMPRESSED_SIZE, SHA256SUM, SIZE, TARGET,
};

const OPTIONS: &[ModeOption] = &[
    ModeOption::choice("target-type", &["ubivolume"]).with_default(Literal::Str("ubivolume")),
    TARGET.required(),
    SIZE,
    SHA256SUM,
    COMPRESSED,
    REQUIRED_UNCOMPRESSED_SIZE,
];

/// UBIFS image written to a UBI volume
#[derive(Debug, Clone, Copy, Default)]
pub struct UbifsMode;

impl Mode for UbifsMode {
    fn name(&self) -> &'static str {
        "ubifs"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }
}
