//! Flash mode: program an MTD partition

use crate::error::EfuError;
use crate::mode::{Mode, OptionValues};
use crate::option::{Literal, ModeOption, SHA256SUM, SIZE, TARGET};

const TARGET_TYPE: ModeOption =
    ModeOption::choice("target-type", &["device", "mtdname"]).with_default(Literal::Str("device"));

const OPTIONS: &[ModeOption] = &[TARGET_TYPE, TARGET.required(), SIZE, SHA256SUM];

/// Content flashed to an MTD device or a partition looked up by name
#[derive(Debug, Clone, Copy, Default)]
pub struct FlashMode;

impl Mode for FlashMode {
    fn name(&self) -> &'static str {
        "flash"
    }

    fn options(&self) -> &'static [ModeOption] {
        OPTIONS
    }

    fn supports_install_condition(&self) -> bool {
        true
    }

    fn validate(&self, options: &OptionValues) -> Result<(), EfuError> {
        let by_name = options
            .get(TARGET_TYPE.key)
            .is_some_and(|v| v.as_str() == Some("mtdname"));
        match options.get(TARGET.key).and_then(|v| v.as_str()) {
            Some(target) if by_name && target.contains('/') => Err(EfuError::invalid_option(
                TARGET.key,
                format!("'{target}' is a path but target-type is mtdname"),
            )),
            _ => Ok(()),
        }
    }
}
