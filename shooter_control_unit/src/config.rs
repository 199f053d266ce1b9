//! Configuration loading for the control unit binary.
//!
//! Loads `ControlUnitConfig` from TOML, falls back to built-in defaults when
//! the file is absent, applies command-line overrides and validates the
//! result before anything is brought up.

use std::path::{Path, PathBuf};

use shooter_common::config::{ConfigError, ConfigLoader};
use shooter_common::control_unit::config::ControlUnitConfig;

/// Where the configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file.
    File(PathBuf),
    /// File not found; built-in defaults.
    Defaults(PathBuf),
}

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The configuration.
    pub cu_config: ControlUnitConfig,
    /// Origin, for the startup log.
    pub source: ConfigSource,
}

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `network.bind_addr`.
    pub bind_addr: Option<String>,
    /// `network.receive_port`.
    pub receive_port: Option<u16>,
    /// `hal.driver`.
    pub driver: Option<String>,
}

impl Overrides {
    /// Write every set override into `cfg`.
    pub fn apply(&self, cfg: &mut ControlUnitConfig) {
        if let Some(addr) = &self.bind_addr {
            cfg.network.bind_addr.clone_from(addr);
        }
        if let Some(port) = self.receive_port {
            cfg.network.receive_port = port;
        }
        if let Some(driver) = &self.driver {
            cfg.hal.driver.clone_from(driver);
        }
    }
}

/// Load, override and validate the configuration.
///
/// A missing file is not an error: the built-in defaults match the deployed
/// firmware. Any other read, parse or validation failure is.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<LoadedConfig, ConfigError> {
    let (mut cu_config, source) = match ControlUnitConfig::load(path) {
        Ok(cfg) => (cfg, ConfigSource::File(path.to_path_buf())),
        Err(ConfigError::FileNotFound) => (
            ControlUnitConfig::default(),
            ConfigSource::Defaults(path.to_path_buf()),
        ),
        Err(e) => return Err(e),
    };

    overrides.apply(&mut cu_config);
    cu_config.validate()?;

    Ok(LoadedConfig { cu_config, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let loaded = load_config(
            Path::new("/nonexistent/shooter/cu.toml"),
            &Overrides::default(),
        )
        .unwrap();
        assert!(matches!(loaded.source, ConfigSource::Defaults(_)));
        assert_eq!(loaded.cu_config.network.receive_port, 5000);
        assert_eq!(loaded.cu_config.control.pwm_limit, 0.8);
    }

    #[test]
    fn file_values_and_overrides() {
        let file = write_config(
            r#"
[network]
bind_addr = "10.0.0.2"
receive_port = 6000

[control]
actuation_delay_ms = 0
"#,
        );
        let overrides = Overrides {
            receive_port: Some(7000),
            driver: Some("simulation".into()),
            ..Default::default()
        };
        let loaded = load_config(file.path(), &overrides).unwrap();
        assert!(matches!(loaded.source, ConfigSource::File(_)));
        assert_eq!(loaded.cu_config.network.bind_addr, "10.0.0.2");
        assert_eq!(loaded.cu_config.network.receive_port, 7000);
        assert_eq!(loaded.cu_config.control.actuation_delay_ms, 0);
    }

    #[test]
    fn invalid_values_rejected() {
        let file = write_config("[control]\npwm_limit = 1.5\n");
        let err = load_config(file.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        let file = write_config("[control\npwm_limit = ");
        let err = load_config(file.path(), &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
