//! Application configuration

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_with::serde_as;

use crate::errors::LocationError;
use crate::models::FieldSet;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout: Duration,
}

/// Serialization settings for records written to stdout
#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    /// Field names to include, all fields if empty
    #[serde(default)]
    pub fields: Vec<String>,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> Duration {
    Duration::from_secs(30)
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("config/default"))
    }

    /// Load configuration from an optional file, overridden by environment variables
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("LOCATIONS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("output.fields"),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl DatabaseConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), LocationError> {
        self.validate_url()?;
        self.validate_pool()?;
        Ok(())
    }

    fn validate_url(&self) -> Result<(), LocationError> {
        if self.url.trim().is_empty() {
            return Err(LocationError::ConfigurationError {
                message: "Database URL cannot be empty".to_string(),
            });
        }
        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(LocationError::ConfigurationError {
                message: "Database URL must use the postgres:// scheme".to_string(),
            });
        }
        Ok(())
    }

    fn validate_pool(&self) -> Result<(), LocationError> {
        if self.max_connections == 0 {
            return Err(LocationError::ConfigurationError {
                message: "Maximum connections must be greater than zero".to_string(),
            });
        }
        if self.acquire_timeout.is_zero() {
            return Err(LocationError::ConfigurationError {
                message: "Acquire timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

impl OutputConfig {
    /// Field filter for serialization
    ///
    /// Names are trimmed and blank entries dropped, so an empty list setting
    /// leaves output unfiltered. Unknown names are ignored.
    pub fn field_set(&self) -> FieldSet {
        FieldSet::from_names(
            self.fields
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Field;
    use std::env;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        env::set_var("LOCATIONS__DATABASE__URL", "postgres://localhost/locations");
        env::set_var("LOCATIONS__OUTPUT__FIELDS", "user,device,latitude");

        let config = AppConfig::load().unwrap();
        assert_eq!(config.database.url, "postgres://localhost/locations");
        assert_eq!(config.output.fields, vec!["user", "device", "latitude"]);

        let fields = config.output.field_set();
        assert!(fields.contains(Field::User));
        assert!(fields.contains(Field::Latitude));
        assert!(!fields.contains(Field::Longitude));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://db/locations\"\nmax_connections = 12\nacquire_timeout = 7"
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.database.max_connections, 12);
        assert_eq!(config.database.acquire_timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_database_config_validate() {
        let config = DatabaseConfig {
            url: "postgresql://localhost/locations".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        };

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_config_validate_invalid_url() {
        let config = DatabaseConfig {
            url: "".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        };
        assert!(config.validate().is_err());

        let config = DatabaseConfig {
            url: "mysql://localhost/locations".to_string(),
            ..config
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_config_validate_invalid_pool() {
        let config = DatabaseConfig {
            url: "postgres://localhost/locations".to_string(),
            max_connections: 0,
            acquire_timeout: Duration::from_secs(30),
        };
        assert!(config.validate().is_err());

        let config = DatabaseConfig {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(0),
            ..config
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_config_blank_fields_are_unfiltered() {
        let output = OutputConfig {
            fields: vec!["".to_string()],
        };
        assert!(output.field_set().is_unfiltered());

        let output = OutputConfig {
            fields: vec![" ".to_string(), "".to_string()],
        };
        assert!(output.field_set().is_unfiltered());
    }

    #[test]
    fn test_output_config_trims_field_names() {
        let output = OutputConfig {
            fields: vec!["user".to_string(), " device".to_string(), " ".to_string()],
        };
        let fields = output.field_set();

        assert!(fields.contains(Field::User));
        assert!(fields.contains(Field::Device));
        assert!(!fields.contains(Field::Latitude));
    }

    #[test]
    fn test_output_config_default_is_unfiltered() {
        let output = OutputConfig::default();
        assert!(output.field_set().is_unfiltered());
    }
}
