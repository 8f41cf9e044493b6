use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default log filter when RUST_LOG is unset and no -v flag given
    pub log_level: Option<String>,

    /// JSON file holding the task snapshot
    pub tasks_file: PathBuf,

    /// Seconds between heartbeat re-syncs from the tasks file
    pub heartbeat_secs: u64,

    /// Bound of the notification event channel
    pub event_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            tasks_file: PathBuf::from("tasks.json"),
            heartbeat_secs: 300,
            event_capacity: 64,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_secs == 0 {
            bail!("heartbeat_secs must be greater than zero");
        }
        if self.event_capacity == 0 {
            bail!("event_capacity must be greater than zero");
        }
        Ok(())
    }

    /// Override the tasks file, e.g. from a --tasks flag
    pub fn with_tasks_file(mut self, path: PathBuf) -> Self {
        self.tasks_file = path;
        self
    }

    /// Override the heartbeat interval, e.g. from an --interval-secs flag
    pub fn with_heartbeat_secs(mut self, secs: u64) -> Self {
        self.heartbeat_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tasks_file, PathBuf::from("tasks.json"));
        assert_eq!(config.heartbeat_secs, 300);
        assert_eq!(config.event_capacity, 64);
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml_with_partial_fields() {
        let yaml = r#"
tasks_file: /var/lib/remindr/tasks.json
heartbeat_secs: 60
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tasks_file, PathBuf::from("/var/lib/remindr/tasks.json"));
        assert_eq!(config.heartbeat_secs, 60);
        // Other fields should have defaults
        assert_eq!(config.event_capacity, 64);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = Config {
            heartbeat_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            event_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "heartbeat_secs: 45").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.heartbeat_secs, 45);
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let path = PathBuf::from("/nonexistent/remindr.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_builders_override_fields() {
        let config = Config::default()
            .with_tasks_file(PathBuf::from("other.json"))
            .with_heartbeat_secs(10);

        assert_eq!(config.tasks_file, PathBuf::from("other.json"));
        assert_eq!(config.heartbeat_secs, 10);
    }
}
