//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, UmbPollerError};
use crate::umb::address::DEVICE_ID_MASK;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    pub poll: PollConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Target device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    #[serde(default = "default_device_id")]
    pub id: u16,

    #[serde(default = "default_device_class")]
    pub class: u16,

    /// Send the ASCII `X` command before polling
    #[serde(default)]
    pub switch_to_binary: bool,
}

/// Polling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    pub channels: Vec<u16>,

    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

/// Reading output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_format")]
    pub format: OutputFormat,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Write daily-rotated log files here instead of stderr
    #[serde(default)]
    pub dir: Option<String>,
}

/// How readings are reported
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `tracing` info lines
    Text,
    /// One JSON object per reading on stdout
    Json,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: default_device_id(),
            class: default_device_class(),
            switch_to_binary: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 19200 }
fn default_timeout_ms() -> u64 { 500 }
fn default_reconnect_interval_ms() -> u64 { 1000 }

fn default_device_id() -> u16 { 1 }
fn default_device_class() -> u16 { 7 }

fn default_poll_interval_ms() -> u64 { 10_000 }

fn default_output_format() -> OutputFormat { OutputFormat::Text }

/// Baud rates supported by UMB devices
const SUPPORTED_BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 14400, 19200, 28800, 57600];

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use umb_poller::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 1200, 2400, 4800, 9600, 14400, 19200, 28800, 57600",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10_000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.serial.reconnect_interval_ms == 0 || self.serial.reconnect_interval_ms > 60_000 {
            return Err(invalid("reconnect_interval_ms must be between 1 and 60000"));
        }

        // The codec masks silently; reject here so a typo does not poll
        // a different device
        if self.device.id > DEVICE_ID_MASK {
            return Err(invalid("device id must be between 0 and 4095"));
        }

        if self.device.class > 15 {
            return Err(invalid("device class must be between 0 and 15"));
        }

        if self.logging.dir.as_deref() == Some("") {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        if self.poll.channels.is_empty() {
            return Err(invalid("poll channels cannot be empty"));
        }

        if self.poll.interval_ms == 0 || self.poll.interval_ms > 3_600_000 {
            return Err(invalid("poll interval_ms must be between 1 and 3600000"));
        }

        Ok(())
    }
}

fn invalid(message: &str) -> UmbPollerError {
    UmbPollerError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn default_config() -> Config {
        Config {
            serial: SerialConfig::default(),
            device: DeviceConfig::default(),
            poll: PollConfig {
                channels: vec![100, 200],
                interval_ms: default_poll_interval_ms(),
            },
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 19200);
        assert_eq!(config.device.class, 7);
        assert_eq!(config.output.format, OutputFormat::Text);
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = Config::from_toml("[poll]\nchannels = [100]\n").unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.timeout_ms, 500);
        assert_eq!(config.device.id, 1);
        assert!(!config.device.switch_to_binary);
        assert_eq!(config.poll.channels, vec![100]);
        assert_eq!(config.poll.interval_ms, 10_000);
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
            [serial]
            port = "/dev/ttyS1"
            baud_rate = 9600
            timeout_ms = 250

            [device]
            id = 3
            class = 4
            switch_to_binary = true

            [poll]
            channels = [151, 100, 200]
            interval_ms = 2000

            [output]
            format = "json"

            [logging]
            dir = "/var/log/umb"
        "#;

        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyS1");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.device.class, 4);
        assert!(config.device.switch_to_binary);
        assert_eq!(config.poll.channels, vec![151, 100, 200]);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.logging.dir.as_deref(), Some("/var/log/umb"));
    }

    #[test]
    fn test_missing_poll_section_fails() {
        assert!(matches!(
            Config::from_toml("[serial]\nport = \"/dev/ttyS0\"\n"),
            Err(UmbPollerError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_output_format_fails() {
        let toml = "[poll]\nchannels = [1]\n[output]\nformat = \"csv\"\n";
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = default_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.device.id = 0x1000;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.device.class = 16;
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.poll.channels.clear();
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.logging.dir = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = default_config();
        config.poll.interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_message() {
        let mut config = default_config();
        config.device.class = 16;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("device class must be between 0 and 15"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[device]\nid = 2\n\n[poll]\nchannels = [4630]").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.device.id, 2);
        assert_eq!(config.poll.channels, vec![4630]);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/umb-poller.toml"),
            Err(UmbPollerError::Io(_))
        ));
    }
}
