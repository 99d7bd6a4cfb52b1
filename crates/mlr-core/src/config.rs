//! Runtime configuration read from environment variables.
//!
//! | Variable           | Default                           |
//! |--------------------|-----------------------------------|
//! | `MODEL_NAME`       | `gemini-2.0-flash`                |
//! | `TEMPERATURE`      | `0.7`                             |
//! | `MAX_TOKENS`       | `4000`                            |
//! | `GOOGLE_API_KEY`   | unset                             |
//! | `DATA_DIR`         | `data`                            |
//! | `RESULTS_DIR`      | `results`                         |
//! | `WORKSPACES_DIR`   | `workspaces`                      |
//! | `LOG_LEVEL`        | `INFO`                            |
//! | `LOG_FILE`         | `logs/mlr_bench.log`              |
//! | `TIMEOUT`          | `3600` (seconds)                  |
//! | `JUDGE_MODELS`     | `MODEL_NAME`                      |
//! | `MAX_RETRIES`      | `5`                               |
//! | `RETRY_BASE_DELAY` | `2.0` (seconds)                   |
//! | `EVENT_SINK_URL`   | `http://localhost:5000/api/event` |
//!
//! An empty `EVENT_SINK_URL` disables the visualization sink.
//!
//! [`BenchConfig::from_env`] also reads `KEY=value` pairs from `.env` in the
//! working directory. Variables set in the real environment take precedence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{BenchError, Result};
use crate::events::DEFAULT_SINK_URL;
use crate::generation::GeminiSettings;
use crate::retry::RetryPolicy;

/// Resolved configuration for one process.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
    pub results_dir: PathBuf,
    pub workspaces_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub timeout: Duration,
    /// One judge per entry; never empty.
    pub judge_models: Vec<String>,
    pub retry: RetryPolicy,
    pub event_sink_url: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let model_name = "gemini-2.0-flash".to_string();
        Self {
            judge_models: vec![model_name.clone()],
            model_name,
            temperature: 0.7,
            max_tokens: 4000,
            api_key: None,
            data_dir: PathBuf::from("data"),
            results_dir: PathBuf::from("results"),
            workspaces_dir: PathBuf::from("workspaces"),
            log_level: "INFO".to_string(),
            log_file: Some(PathBuf::from("logs/mlr_bench.log")),
            timeout: Duration::from_secs(3600),
            retry: RetryPolicy::default(),
            event_sink_url: Some(DEFAULT_SINK_URL.to_string()),
        }
    }
}

/// Dotenv file consulted by [`BenchConfig::from_env`].
pub const DOTENV_FILE: &str = ".env";

/// Sampling temperatures the generation backend accepts.
const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

/// `KEY=value` pairs from a dotenv file. A missing file yields no pairs.
pub fn read_dotenv(path: &Path) -> Result<HashMap<String, String>> {
    let env_file_error = |source| BenchError::EnvFile {
        path: path.to_path_buf(),
        source,
    };
    match dotenvy::from_path_iter(path) {
        Ok(pairs) => pairs
            .collect::<std::result::Result<HashMap<_, _>, _>>()
            .map_err(env_file_error),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(env_file_error(e)),
    }
}

/// Lookup consulting `primary` first, then `fallback`.
pub fn layered_lookup<F>(primary: F, fallback: HashMap<String, String>) -> impl Fn(&str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    move |key: &str| primary(key).or_else(|| fallback.get(key).cloned())
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| BenchError::InvalidConfig {
            key: key.to_string(),
            value,
        }),
    }
}

impl BenchConfig {
    /// Read configuration from the process environment, then `.env`.
    pub fn from_env() -> Result<Self> {
        let dotenv = read_dotenv(Path::new(DOTENV_FILE))?;
        Self::from_lookup(layered_lookup(|key| std::env::var(key).ok(), dotenv))
    }

    /// Read configuration through `lookup`. Blank values count as unset,
    /// except `EVENT_SINK_URL` where blank disables the sink.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let model_name = get("MODEL_NAME").unwrap_or(defaults.model_name);
        let judge_models: Vec<String> = get("JUDGE_MODELS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .filter(|models: &Vec<String>| !models.is_empty())
            .unwrap_or_else(|| vec![model_name.clone()]);

        let max_retries = parse_var("MAX_RETRIES", get("MAX_RETRIES"), defaults.retry.max_retries)?;
        let base_delay = parse_var(
            "RETRY_BASE_DELAY",
            get("RETRY_BASE_DELAY"),
            defaults.retry.base_delay.as_secs_f64(),
        )?;
        if !base_delay.is_finite() || base_delay < 0.0 {
            return Err(BenchError::InvalidConfig {
                key: "RETRY_BASE_DELAY".to_string(),
                value: base_delay.to_string(),
            });
        }

        let event_sink_url = match lookup("EVENT_SINK_URL") {
            None => defaults.event_sink_url,
            Some(url) if url.trim().is_empty() => None,
            Some(url) => Some(url.trim().to_string()),
        };
        let timeout_secs = parse_var("TIMEOUT", get("TIMEOUT"), defaults.timeout.as_secs())?;

        let temperature = parse_var("TEMPERATURE", get("TEMPERATURE"), defaults.temperature)?;
        if !TEMPERATURE_RANGE.contains(&temperature) {
            return Err(BenchError::InvalidConfig {
                key: "TEMPERATURE".to_string(),
                value: temperature.to_string(),
            });
        }

        Ok(Self {
            temperature,
            max_tokens: parse_var("MAX_TOKENS", get("MAX_TOKENS"), defaults.max_tokens)?,
            api_key: get("GOOGLE_API_KEY"),
            data_dir: get("DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            results_dir: get("RESULTS_DIR").map_or(defaults.results_dir, PathBuf::from),
            workspaces_dir: get("WORKSPACES_DIR").map_or(defaults.workspaces_dir, PathBuf::from),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: get("LOG_FILE").map(PathBuf::from).or(defaults.log_file),
            timeout: Duration::from_secs(timeout_secs),
            retry: RetryPolicy::from_secs_f64(max_retries, base_delay),
            judge_models,
            event_sink_url,
            model_name,
        })
    }

    /// Location of the task catalog.
    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join("tasks").join("tasks.json")
    }

    /// Gemini settings for `model`, sharing this config's sampling knobs.
    pub fn gemini_settings(&self, model: &str) -> GeminiSettings {
        GeminiSettings {
            model: model.to_string(),
            temperature: self.temperature,
            max_output_tokens: self.max_tokens,
            timeout: self.timeout,
            ..GeminiSettings::new(model)
        }
    }

    /// Create the data, results, workspace and log directories.
    pub fn ensure_directories(&self) -> Result<()> {
        let mut dirs: Vec<&Path> = vec![
            self.data_dir.as_path(),
            self.results_dir.as_path(),
            self.workspaces_dir.as_path(),
        ];
        if let Some(parent) = self.log_file.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                dirs.push(parent);
            }
        }
        for dir in dirs {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
