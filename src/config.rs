//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback, and `main` loads `.env` before
//! parsing, so a `.env` file holding `GOOGLE_API_KEY` is all a local run needs.

use crate::model::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use clap::Parser;
use std::time::Duration;

/// Crop disease detector: upload a crop photo, get a diagnosis.
#[derive(Parser, Debug, Clone)]
#[command(name = "crop-disease-detector")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Google AI API key (falls back to GEMINI_API_KEY)
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Gemini model identifier
    #[arg(long, env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Base URL of the Gemini API
    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Seconds to wait for the model before failing the request (0 = wait forever)
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 120)]
    pub upstream_timeout_secs: u64,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 10)]
    pub max_upload_mb: usize,

    /// Replace replies that don't match the diagnosis schema with the
    /// invalid-format fallback instead of passing them through
    #[arg(long, env = "STRICT_SCHEMA")]
    pub strict_schema: bool,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Config {
    /// The API key from `--api-key`/`GOOGLE_API_KEY`, else `GEMINI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        let usable = |key: &String| !key.trim().is_empty();
        self.api_key
            .clone()
            .filter(usable)
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(usable))
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        (self.upstream_timeout_secs > 0).then(|| Duration::from_secs(self.upstream_timeout_secs))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["crop-disease-detector", "--api-key", "k"]);
        assert_eq!(config.bind, "0.0.0.0:3000");
        assert_eq!(config.model, "gemini-1.5-pro-latest");
        assert_eq!(config.upstream_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.max_upload_bytes(), 10 * 1024 * 1024);
        assert!(!config.strict_schema);
        assert_eq!(config.resolve_api_key().as_deref(), Some("k"));
    }

    #[test]
    fn test_zero_timeout_disables_it() {
        let config = Config::parse_from([
            "crop-disease-detector",
            "--api-key",
            "k",
            "--upstream-timeout-secs",
            "0",
        ]);
        assert_eq!(config.upstream_timeout(), None);
    }

    #[test]
    fn test_blank_api_key_is_ignored() {
        let config = Config::parse_from(["crop-disease-detector", "--api-key", "  "]);
        if std::env::var("GEMINI_API_KEY").is_err() {
            assert_eq!(config.resolve_api_key(), None);
        }
    }

    #[test]
    fn test_overrides() {
        let config = Config::parse_from([
            "crop-disease-detector",
            "--api-key",
            "k",
            "--bind",
            "127.0.0.1:8080",
            "--model",
            "gemini-2.0-flash",
            "--max-upload-mb",
            "2",
            "--strict-schema",
        ]);
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
        assert!(config.strict_schema);
    }
}
