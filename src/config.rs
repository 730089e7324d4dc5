//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - relat.toml (default configuration)
//! - relat.local.toml (git-ignored local overrides)
//! - Environment variables (RELAT_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # relat.toml
//! [engine]
//! souffle_path = "/usr/local/bin/souffle"
//! workers = 5
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! RELAT_ENGINE__WORKERS=2
//! RELAT_TRANSLATION__EMIT_COMMENTS=false
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::translator::TranslateOptions;

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
}

/// Datalog engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path or name of the `souffle` binary
    #[serde(default = "default_souffle_path")]
    pub souffle_path: PathBuf,

    /// Maximum number of concurrent solves
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Extra arguments passed to souffle before the program file
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Write logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Translator output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Precede each generated relation with a source comment
    #[serde(default = "default_true")]
    pub emit_comments: bool,
}

// Default value functions
fn default_souffle_path() -> PathBuf {
    PathBuf::from("souffle")
}
fn default_workers() -> usize {
    5
}
fn default_extra_args() -> Vec<String> {
    vec!["--no-preprocessor".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_true() -> bool {
    true
}

impl Config {
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("relat.toml"))
            .merge(Toml::file("relat.local.toml"))
            .merge(Env::prefixed("RELAT_").split("__"))
            .extract()
    }

    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("RELAT_").split("__"))
            .extract()
    }

    pub fn translate_options(&self) -> TranslateOptions {
        TranslateOptions {
            emit_comments: self.translation.emit_comments,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            souffle_path: default_souffle_path(),
            workers: default_workers(),
            extra_args: default_extra_args(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        TranslationConfig {
            emit_comments: true,
        }
    }
}
