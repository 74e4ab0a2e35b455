//! Logging setup
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` applies to this crate and
//! the HTTP trace layer.

use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::BoxError;

/// Default filter directive for a level
pub fn default_directive(level: &str) -> String {
    format!("qravy_cloud={level},tower_http={level}")
}

/// Initialize the global subscriber
///
/// With `log_dir` set, output goes to a daily rolling file instead of stdout.
pub fn init_logger(level: &str, json: bool, log_dir: Option<&str>) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(Path::new(dir))?;
            let file_appender = tracing_appender::rolling::daily(dir, "qravy-cloud");
            let builder = builder.with_writer(file_appender).with_ansi(false);
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
        None => {
            if json {
                builder.json().try_init()
            } else {
                builder.try_init()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_parses() {
        let directive = default_directive("debug");
        assert_eq!(directive, "qravy_cloud=debug,tower_http=debug");
        assert!(EnvFilter::try_new(directive).is_ok());
    }

    #[test]
    fn test_file_logger_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        // a global subscriber may already be set by another test
        let _ = init_logger("info", true, log_dir.to_str());
        assert!(log_dir.exists());
    }
}
