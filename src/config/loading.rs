//! Configuration loading from files and command-line overrides

use super::types::LoadTestConfig;
use crate::error::ConfigError;
use crate::plan::LoadPlan;
use std::path::Path;

/// Load settings from a TOML file
///
/// # Errors
/// Returns [`ConfigError::Read`] if the file cannot be read and
/// [`ConfigError::Parse`] if it is not a valid config.
pub fn load_config(path: &Path) -> Result<LoadTestConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the plan for a run
///
/// File values (if a file is given) are overridden by `overrides`, then
/// defaults are applied and the result validated.
///
/// # Errors
/// Any [`ConfigError`] from loading or validation
pub fn resolve_plan(
    file: Option<&Path>,
    overrides: LoadTestConfig,
) -> Result<LoadPlan, ConfigError> {
    let base = match file {
        Some(path) => {
            let config = load_config(path)?;
            tracing::debug!("Loaded config file {}", path.display());
            config
        }
        None => LoadTestConfig::default(),
    };
    base.merge(overrides).into_plan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "room = \"battle\"\nclients = 8").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.room.as_deref(), Some("battle"));
        assert_eq!(config.clients.map(|c| c.get()), Some(8));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(load_config(&path), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "clients = \"many\"").unwrap();
        assert!(matches!(
            load_config(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "room = \"from-file\"\ndelay_ms = 40\nworkers = 2").unwrap();

        let overrides = LoadTestConfig {
            room: Some("from-cli".into()),
            ..Default::default()
        };
        let plan = resolve_plan(Some(file.path()), overrides).unwrap();
        assert_eq!(plan.target.as_str(), "from-cli");
        assert_eq!(plan.open_delay.as_millis(), 40);
        assert_eq!(plan.worker_count.get(), 2);
    }

    #[test]
    fn test_no_file_needs_room() {
        assert!(matches!(
            resolve_plan(None, LoadTestConfig::default()),
            Err(ConfigError::MissingTarget)
        ));
    }
}
