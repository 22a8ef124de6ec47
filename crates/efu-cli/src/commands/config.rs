//! Configuration commands

use std::io::BufRead;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;

use crate::commands::ConfigCommands;
use crate::config::{ACCESS_ID, ACCESS_SECRET, AUTH_SECTION, Config, PRIVATE_KEY_PATH};
use crate::error::CliError;
use crate::output;

/// Execute config command against the configuration file at `config_file`
pub fn execute(cmd: &ConfigCommands, config_file: &Path, json: bool) -> Result<()> {
    let mut config = Config::load(config_file)?;
    match cmd {
        ConfigCommands::Set {
            key,
            value,
            section,
        } => {
            config.set(key, value, section.as_deref());
            config.save()?;
            output::print_success(
                &format!("Set {key}"),
                json!({"key": key, "value": value}),
                json,
            );
            Ok(())
        }
        ConfigCommands::Get { key, section } => {
            let value = config.get(key, section.as_deref());
            if json {
                output::print_json(&json!({"success": true, "key": key, "value": value}));
            } else if let Some(value) = value {
                println!("{value}");
            }
            Ok(())
        }
        ConfigCommands::Init => {
            let stdin = std::io::stdin();
            init(&mut config, &mut stdin.lock())?;
            config.save()?;
            output::print_success(
                &format!("Configuration written to {}", config.path().display()),
                json!({"path": config.path().display().to_string()}),
                json,
            );
            Ok(())
        }
    }
}

/// Read access id, access secret and private key path, one per line
fn init(config: &mut Config, input: &mut impl BufRead) -> Result<()> {
    let prompts = [
        ("Access Id", ACCESS_ID, Some(AUTH_SECTION)),
        ("Access Secret", ACCESS_SECRET, Some(AUTH_SECTION)),
        ("Private Key Path", PRIVATE_KEY_PATH, None),
    ];
    for (prompt, key, section) in prompts {
        eprint!("{prompt}: ");
        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .with_context(|| format!("reading {prompt}"))?;
        let value = line.trim();
        if read == 0 || value.is_empty() {
            return Err(CliError::InvalidInput(format!("{prompt} is required")).into());
        }
        config.set(key, value, section);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use efu_core::config::ConfigSource;
    use std::io::Cursor;
    use std::path::PathBuf;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_init_reads_three_lines() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut config = Config::load(dir.path().join("config"))?;
        let mut input = Cursor::new("id\nsecret\n/keys/efu.pem\n");
        init(&mut config, &mut input)?;

        let credentials = config.credentials().ok_or("credentials missing")?;
        assert_eq!(credentials.access_key, "id");
        assert_eq!(credentials.secret_key, "secret");
        assert_eq!(config.private_key_path(), Some(PathBuf::from("/keys/efu.pem")));
        Ok(())
    }

    #[test]
    fn test_init_with_short_input() -> TestResult {
        let dir = tempfile::tempdir()?;
        let mut config = Config::load(dir.path().join("config"))?;
        let mut input = Cursor::new("id\n");
        let err = match init(&mut config, &mut input) {
            Ok(()) => return Err("init accepted missing secret".into()),
            Err(e) => e,
        };
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidInput(_))
        ));
        Ok(())
    }
}
