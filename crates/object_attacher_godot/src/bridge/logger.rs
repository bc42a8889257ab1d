//! GodotLogger implementation
//!
//! Bridges object_attacher logging to godot_print!/godot_error! + logs/object_attacher.log.

use object_attacher::{LogLevel, LogPrinter};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

// Godot запускается из godot/ директории, путь относительно project root
const LOG_PATH: &str = "../logs/object_attacher.log";

static FILE_ERROR_LOGGED: AtomicBool = AtomicBool::new(false);

pub struct GodotLogger;

impl LogPrinter for GodotLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => godot::prelude::godot_error!("[{}] {}", level.as_str(), message),
            LogLevel::Warning => godot::prelude::godot_warn!("[{}] {}", level.as_str(), message),
            LogLevel::Debug | LogLevel::Info => {
                godot::prelude::godot_print!("[{}] {}", level.as_str(), message)
            }
        }

        self.append_to_file(level, message);
    }
}

impl GodotLogger {
    pub fn clear_log_file() {
        let _ = std::fs::remove_file(LOG_PATH);
    }

    fn append_to_file(&self, level: LogLevel, message: &str) {
        let log_path = std::path::Path::new(LOG_PATH);

        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "[{}] {}", level.as_str(), message);
            }
            Err(e) => {
                // Логируем ошибку только один раз
                if !FILE_ERROR_LOGGED.swap(true, Ordering::Relaxed) {
                    godot::prelude::godot_error!("Failed to open log file {:?}: {}", log_path, e);
                }
            }
        }
    }
}
