//! Raw mode: write the content byte for byte to a block device

use crate::mode::Mode;
use crate::option::{
    CHUNK_SIZE, COMPRESSED, Literal, ModeOption, REQUIRED_UNCOMPRESSED_SIZE, SHA256SUM, SIZE,
    TARGET,
};

const OPTIONS: &[ModeOption] = &[
    ModeOption::choice("target-type", &["device"]).with_default(Literal::Str("device")),
    TARGET,
    CHUNK_SIZE,
    ModeOption::integer("skip", 0, i64::MAX).with_default(Literal::Int(0)),
    ModeOption::integer("seek", 0, i64::MAX).with_default(Literal::Int(0)),
    ModeOption::integer("count", -1, i64::MAX).with_default(Literal::Int(-1)),
    ModeOption::boolean("truncate").with_default(Literal::Bool(false)),
    SIZE,
    SHA256SUM,
    COMPRESSED,
    REQUIRED_UNCOMPRESSED_SIZE,
];

/// Raw image written at an offset of the target device
///
/// `skip` bytes of the content are dropped, `count` chunks are written
/// (`-1` writes everything) starting `seek` bytes into the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawMode;

impl Mode for RawMode {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }

    fn supports_install_condition(&self) -> bool {
        true
    }
}
