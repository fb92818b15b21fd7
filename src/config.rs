//! # Configuration Management
//!
//! This module loads the dashboard configuration from a TOML file. The path
//! comes from the `CONFIG_FILE_PATH` environment variable and defaults to
//! `config.toml` in the working directory.
//!
//! Relative paths inside the file (font, border, icons, preview, log) are
//! resolved against the directory the file lives in, so the service can be
//! started from anywhere.

use crate::palette::{ColorMode, ColorPalette};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const ENV_CONFIG_FILE_PATH: &str = "CONFIG_FILE_PATH";
/// Environment variable naming the log file when the config has none
pub const ENV_LOG_FILE_PATH: &str = "LOG_FILE_PATH";
pub const DEFAULT_CONFIG_FILE_PATH: &str = "config.toml";
pub const DEFAULT_LOG_FILE_PATH: &str = "inky_dashboard.log";

/// The dashboard grid has four quadrants
pub const MAX_SENSORS: usize = 4;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config format: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Accent color family of the panel
    pub color_palette: ColorPalette,
    #[serde(default)]
    pub color_mode: ColorMode,
    /// Seconds between two data refreshes
    #[serde(default = "default_data_timeout_seconds")]
    pub data_timeout_seconds: u64,
    /// Seconds between two display refreshes
    #[serde(default = "default_view_change_interval_seconds")]
    pub view_change_interval_seconds: u64,
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,
    #[serde(default = "default_border_image_path")]
    pub border_image_path: PathBuf,
    /// Rotate every frame by 180° (panel mounted upside down)
    #[serde(default)]
    pub flip_screen: bool,
    /// Drive the panel; when false frames go to `preview_path`
    #[serde(default = "default_enable_inky")]
    pub enable_inky: bool,
    #[serde(default = "default_preview_path")]
    pub preview_path: PathBuf,
    /// Show a detailed view for pickups this many days away or fewer
    #[serde(default = "default_waste_detailed_days")]
    pub waste_detailed_days: i64,
    /// Alert-color pickups this many days away or fewer
    #[serde(default = "default_waste_alert_days")]
    pub waste_alert_days: i64,
    pub home_assistant: HomeAssistantConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HomeAssistantConfig {
    /// Base URL, e.g. `http://homeassistant.local:8123`
    pub url: String,
    /// Long-lived access token
    pub token: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default)]
    pub sensors: Vec<SensorConfig>,
}

/// One waste-collection sensor entity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SensorConfig {
    pub name: String,
    /// Shown as the upper line of the detailed view
    pub friendly_name: String,
    pub entity_id: String,
    pub icon_path_small: String,
    pub icon_path_large: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Append log lines here in addition to stdout
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Linux wiring of the panel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareConfig {
    #[serde(default = "default_spi_path")]
    pub spi_path: PathBuf,
    #[serde(default = "default_gpio_chip")]
    pub gpio_chip: PathBuf,
    #[serde(default = "default_dc_pin")]
    pub dc_pin: u32,
    #[serde(default = "default_reset_pin")]
    pub reset_pin: u32,
    #[serde(default = "default_busy_pin")]
    pub busy_pin: u32,
    #[serde(default = "default_busy_timeout_seconds")]
    pub busy_timeout_seconds: u64,
}

fn default_data_timeout_seconds() -> u64 {
    10
}

fn default_view_change_interval_seconds() -> u64 {
    5
}

fn default_font_path() -> PathBuf {
    PathBuf::from("fonts/MinecraftRegular.otf")
}

fn default_border_image_path() -> PathBuf {
    PathBuf::from("media/general/border.png")
}

fn default_enable_inky() -> bool {
    true
}

fn default_preview_path() -> PathBuf {
    PathBuf::from("preview.png")
}

fn default_waste_detailed_days() -> i64 {
    3
}

fn default_waste_alert_days() -> i64 {
    1
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_spi_path() -> PathBuf {
    PathBuf::from("/dev/spidev0.0")
}

fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

fn default_dc_pin() -> u32 {
    22
}

fn default_reset_pin() -> u32 {
    27
}

fn default_busy_pin() -> u32 {
    17
}

fn default_busy_timeout_seconds() -> u64 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            path: None,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_path: default_spi_path(),
            gpio_chip: default_gpio_chip(),
            dc_pin: default_dc_pin(),
            reset_pin: default_reset_pin(),
            busy_pin: default_busy_pin(),
            busy_timeout_seconds: default_busy_timeout_seconds(),
        }
    }
}

/// Join `path` onto `base` unless it is already absolute.
pub fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

impl Config {
    /// Config file path from `CONFIG_FILE_PATH`, or the default.
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(ENV_CONFIG_FILE_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE_PATH))
    }

    /// Load, validate and resolve relative paths against the file's directory.
    ///
    /// Without a configured log path, `LOG_FILE_PATH` or the default log file
    /// is used.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if config.logging.path.is_none() {
            config.logging.path = Some(
                std::env::var_os(ENV_LOG_FILE_PATH)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE_PATH)),
            );
        }

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_paths(base))
    }

    /// Parse and validate without touching any paths.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("data_timeout_seconds must be positive".into()));
        }
        if self.view_change_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "view_change_interval_seconds must be positive".into(),
            ));
        }
        if self.home_assistant.url.trim().is_empty() {
            return Err(ConfigError::Invalid("home_assistant.url must not be empty".into()));
        }
        if self.home_assistant.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "home_assistant.request_timeout_seconds must be positive".into(),
            ));
        }
        let sensors = self.home_assistant.sensors.len();
        if sensors > MAX_SENSORS {
            return Err(ConfigError::Invalid(format!(
                "{sensors} sensors configured, the dashboard shows at most {MAX_SENSORS}"
            )));
        }
        Ok(())
    }

    /// Resolve every relative path in the config against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve_str = |p: &str| resolve_path(base, Path::new(p)).to_string_lossy().into_owned();

        self.font_path = resolve_path(base, &self.font_path);
        self.border_image_path = resolve_path(base, &self.border_image_path);
        self.preview_path = resolve_path(base, &self.preview_path);
        if let Some(log) = self.logging.path.take() {
            self.logging.path = Some(resolve_path(base, &log));
        }
        for sensor in &mut self.home_assistant.sensors {
            sensor.icon_path_small = resolve_str(&sensor.icon_path_small);
            sensor.icon_path_large = resolve_str(&sensor.icon_path_large);
        }
        self
    }

    pub fn data_interval(&self) -> Duration {
        Duration::from_secs(self.data_timeout_seconds)
    }

    pub fn view_interval(&self) -> Duration {
        Duration::from_secs(self.view_change_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"
color_palette = "yellow"

[home_assistant]
url = "http://ha.local:8123"
token = "secret"
"#;

    const FULL: &str = r#"
color_palette = "red"
color_mode = "dark"
data_timeout_seconds = 60
view_change_interval_seconds = 15
font_path = "/usr/share/fonts/dashboard.otf"
border_image_path = "media/general/border.png"
flip_screen = true
enable_inky = false
waste_detailed_days = 2
waste_alert_days = 0

[home_assistant]
url = "http://ha.local:8123"
token = "secret"
request_timeout_seconds = 5

[[home_assistant.sensors]]
name = "paper"
friendly_name = "Papier"
entity_id = "sensor.papier"
icon_path_small = "media/waste/paper_small.png"
icon_path_large = "media/waste/paper_large.png"

[logging]
level = "debug"
path = "logs/dashboard.log"

[hardware]
busy_pin = 24
"#;

    fn with_sensors(count: usize) -> String {
        let mut contents = MINIMAL.to_string();
        for i in 0..count {
            contents.push_str(&format!(
                "\n[[home_assistant.sensors]]\nname = \"s{i}\"\nfriendly_name = \"S{i}\"\n\
                    entity_id = \"sensor.s{i}\"\nicon_path_small = \"s.png\"\n\
                    icon_path_large = \"l.png\"\n"
            ));
        }
        contents
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.color_palette, ColorPalette::Yellow);
        assert_eq!(config.color_mode, ColorMode::Light);
        assert_eq!(config.data_interval(), Duration::from_secs(10));
        assert_eq!(config.view_interval(), Duration::from_secs(5));
        assert_eq!(config.font_path, PathBuf::from("fonts/MinecraftRegular.otf"));
        assert!(config.enable_inky);
        assert!(!config.flip_screen);
        assert_eq!(config.waste_detailed_days, 3);
        assert_eq!(config.waste_alert_days, 1);
        assert_eq!(config.home_assistant.request_timeout_seconds, 30);
        assert!(config.home_assistant.sensors.is_empty());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.path, None);
        assert_eq!(config.hardware.dc_pin, 22);
        assert_eq!(config.hardware.reset_pin, 27);
        assert_eq!(config.hardware.busy_pin, 17);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(FULL).unwrap();
        assert_eq!(config.color_mode, ColorMode::Dark);
        assert_eq!(config.view_change_interval_seconds, 15);
        assert!(config.flip_screen);
        assert!(!config.enable_inky);
        assert_eq!(config.waste_alert_days, 0);
        assert_eq!(config.home_assistant.sensors.len(), 1);
        assert_eq!(config.home_assistant.sensors[0].friendly_name, "Papier");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.hardware.busy_pin, 24);
        assert_eq!(config.hardware.dc_pin, 22);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::File::create(&path)
            .unwrap()
            .write_all(FULL.as_bytes())
            .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.border_image_path, dir.path().join("media/general/border.png"));
        assert_eq!(config.font_path, PathBuf::from("/usr/share/fonts/dashboard.otf"));
        assert_eq!(config.logging.path, Some(dir.path().join("logs/dashboard.log")));
        assert_eq!(
            PathBuf::from(&config.home_assistant.sensors[0].icon_path_large),
            dir.path().join("media/waste/paper_large.png")
        );
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = Config::load("/nonexistent/path/config.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Config::from_toml_str(
                "color_palette = \"green\"\n[home_assistant]\nurl = \"x\"\ntoken = \"t\""
            ),
            Err(ConfigError::Parse(_))
        ));
        // home_assistant is required
        assert!(matches!(
            Config::from_toml_str("color_palette = \"red\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validation() {
        assert!(Config::from_toml_str(&with_sensors(MAX_SENSORS)).is_ok());
        assert!(matches!(
            Config::from_toml_str(&with_sensors(MAX_SENSORS + 1)),
            Err(ConfigError::Invalid(_))
        ));

        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.view_change_interval_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.home_assistant.url = "  ".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::from_toml_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.color_palette, ColorPalette::Red);
        assert_eq!(config.home_assistant.sensors.len(), 2);
        assert_eq!(config.home_assistant.sensors[1].entity_id, "sensor.papier");
        assert_eq!(config.logging.path, Some(PathBuf::from("inky_dashboard.log")));
    }
}
