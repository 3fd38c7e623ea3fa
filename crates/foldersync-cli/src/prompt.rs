//! Interactive prompts for values missing from the command line and config

use anyhow::Result;
use dialoguer::Input;
use foldersync_config::SyncConfig;
use foldersync_types::SyncInterval;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

/// Whether a person is at the terminal to answer prompts
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal() && console::user_attended()
}

/// Ask for every run setting the user has not supplied yet
///
/// The interval prompt offers the configured value as its default. Returns the
/// log file path if one was asked for and given.
pub fn fill_missing(
    sync: &mut SyncConfig,
    ask_interval: bool,
    ask_log_file: bool,
) -> Result<Option<PathBuf>> {
    if sync.source.is_none() {
        sync.source = Some(directory("Source folder")?);
    }
    if sync.replica.is_none() {
        sync.replica = Some(directory("Replica folder")?);
    }
    if ask_interval {
        sync.interval_secs = interval(sync.interval_secs)?;
    }

    if ask_log_file {
        let path: String = Input::new()
            .with_prompt("Log file (leave empty for console only)")
            .allow_empty(true)
            .interact_text()?;
        let path = path.trim();
        return Ok((!path.is_empty()).then(|| PathBuf::from(path)));
    }

    Ok(None)
}

fn directory(prompt: &str) -> Result<PathBuf> {
    let path: String = Input::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| validate_directory(input))
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

fn interval(default: u64) -> Result<u64> {
    let seconds: String = Input::new()
        .with_prompt("Sync interval in seconds")
        .default(default.to_string())
        .validate_with(|input: &String| parse_interval(input).map(|_| ()))
        .interact_text()?;
    Ok(parse_interval(&seconds).map_err(anyhow::Error::msg)?.as_secs())
}

/// Input must name an existing directory
pub fn validate_directory(input: &str) -> std::result::Result<(), String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("A folder path is required".to_string());
    }
    if Path::new(input).is_dir() {
        Ok(())
    } else {
        Err(format!("'{}' is not an existing folder", input))
    }
}

/// Input must be a positive whole number of seconds
pub fn parse_interval(input: &str) -> std::result::Result<SyncInterval, String> {
    let seconds: u64 = input
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a whole number of seconds", input.trim()))?;
    SyncInterval::new(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();

        assert!(validate_directory(&temp_dir.path().display().to_string()).is_ok());
        assert!(validate_directory(&file.display().to_string()).is_err());
        assert!(validate_directory("   ").is_err());
    }

    #[rstest]
    #[case("60", Some(60))]
    #[case(" 5 ", Some(5))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("1.5", None)]
    #[case("soon", None)]
    fn test_parse_interval(#[case] input: &str, #[case] expected: Option<u64>) {
        assert_eq!(parse_interval(input).ok().map(SyncInterval::as_secs), expected);
    }
}
