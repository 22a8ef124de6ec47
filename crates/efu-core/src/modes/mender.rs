//! Mender mode: hand a mender artifact to the mender installer

use crate::mode::Mode;
use crate::option::{ModeOption, SHA256SUM, SIZE};

const OPTIONS: &[ModeOption] = &[SIZE, SHA256SUM];

/// Self-describing package archive; the installer reads its own manifest
#[derive(Debug, Clone, Copy, Default)]
pub struct MenderMode;

impl Mode for MenderMode {
    fn name(&self) -> &'static str {
        "mender"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }
}
