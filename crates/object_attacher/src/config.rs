//! AttacherConfig - runtime константы (range, интервалы, debug режим)
//!
//! Читается из TOML (`object_attacher.toml`), отсутствующие поля → defaults.
//! Отсутствующий файл - не ошибка (используются defaults).

use crate::logger::LogLevel;
use bevy::prelude::*;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// F11
pub const DEFAULT_CURSOR_TOGGLE_KEY: u32 = 122;
pub const DEFAULT_CONSOLE_COMMAND: &str = "objectattacher";

#[derive(Resource, Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AttacherConfig {
    /// Радиус (distance units), в котором remote players получают объект
    pub object_range: f32,
    /// Период reconciliation loop
    pub check_interval_ms: u64,
    /// Период poll'а загрузки моделей / animation dictionaries
    pub load_poll_interval_ms: u64,
    /// Период idle-camera prevention (пока debug view видим)
    pub idle_cam_interval_ms: u64,
    /// Debug канал (WebView, cursor toggle, console command)
    pub debug_mode: bool,
    pub cursor_toggle_key: u32,
    pub console_command: String,
    /// Путь к JSON registry (относительно рабочей директории хоста)
    pub registry_path: String,
    /// Минимальный уровень логов ("debug" | "info" | "warning" | "error")
    pub log_level: String,
}

impl Default for AttacherConfig {
    fn default() -> Self {
        Self {
            object_range: 30.0,
            check_interval_ms: 1000,
            load_poll_interval_ms: 100,
            idle_cam_interval_ms: 2000,
            debug_mode: cfg!(debug_assertions),
            cursor_toggle_key: DEFAULT_CURSOR_TOGGLE_KEY,
            console_command: DEFAULT_CONSOLE_COMMAND.to_string(),
            registry_path: "objects.json".to_string(),
            log_level: "debug".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl AttacherConfig {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Загрузить config; файла нет → defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let toml_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&toml_str)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.object_range.is_finite() || self.object_range < 0.0 {
            return Err(ConfigError::Invalid {
                field: "object_range",
                reason: format!("must be a finite non-negative distance, got {}", self.object_range),
            });
        }

        for (field, value) in [
            ("check_interval_ms", self.check_interval_ms),
            ("load_poll_interval_ms", self.load_poll_interval_ms),
            ("idle_cam_interval_ms", self.idle_cam_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "interval must be greater than zero".to_string(),
                });
            }
        }

        if LogLevel::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid {
                field: "log_level",
                reason: format!("unknown level `{}`", self.log_level),
            });
        }

        Ok(())
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_original_constants() {
        let config = AttacherConfig::default();
        assert_eq!(config.object_range, 30.0);
        assert_eq!(config.check_interval_ms, 1000);
        assert_eq!(config.load_poll_interval_ms, 100);
        assert_eq!(config.cursor_toggle_key, 122);
        assert_eq!(config.console_command, "objectattacher");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AttacherConfig::from_toml_str("object_range = 12.5\ndebug_mode = true").unwrap();
        assert_eq!(config.object_range, 12.5);
        assert!(config.debug_mode);
        assert_eq!(config.check_interval_ms, 1000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = AttacherConfig::from_toml_str("check_interval_ms = 0");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { field: "check_interval_ms", .. })
        ));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        assert!(AttacherConfig::from_toml_str("log_level = \"loud\"").is_err());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = AttacherConfig::load_or_default("definitely/not/here.toml").unwrap();
        assert_eq!(config, AttacherConfig::default());
    }
}
