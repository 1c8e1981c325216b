//! Process configuration.
//!
//! Everything is read from environment variables once at startup (a `.env`
//! file is loaded first when present) and stays immutable afterwards.

use std::path::PathBuf;

/// Configuration error raised during startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Runtime configuration for the job runner process.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base directory that all job paths must resolve inside.
    pub jobs_dir: PathBuf,
    /// Port the HTTP gateway listens on.
    pub port: u16,
    /// Whether to default the log filter to debug level.
    pub debug: bool,
}

impl RunnerConfig {
    /// Resolve the configuration from the environment.
    ///
    /// `SCRAPPERD_JOBS_DIR` (default `./jobs`), `SCRAPPERD_PORT` (default
    /// 8000) and `SCRAPPERD_DEBUG` (default off). Malformed values are fatal.
    pub fn resolve() -> Result<Self, ConfigError> {
        let jobs_dir = optional_env("SCRAPPERD_JOBS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./jobs"));

        let port = match optional_env("SCRAPPERD_PORT") {
            Some(raw) => parse_port(&raw)?,
            None => 8000,
        };

        let debug = optional_env("SCRAPPERD_DEBUG")
            .map(|raw| parse_bool(&raw))
            .unwrap_or(false);

        Ok(Self {
            jobs_dir,
            port,
            debug,
        })
    }
}

/// Read an env var, treating unset and empty identically.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: "SCRAPPERD_PORT",
        reason: format!("expected a port number, got {raw:?}"),
    })
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_port() {
        assert_eq!(parse_port("8080").unwrap(), 8080);
    }

    #[test]
    fn rejects_bad_port() {
        let err = parse_port("not-a-port").unwrap_err();
        assert!(err.to_string().contains("SCRAPPERD_PORT"));
    }

    #[test]
    fn bool_values() {
        assert!(parse_bool("1"));
        assert!(parse_bool("true"));
        assert!(parse_bool("YES"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("anything-else"));
    }
}
