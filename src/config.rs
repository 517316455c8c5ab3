use crate::constants::{
    DEFAULT_ADDRESS_COLUMN, DEFAULT_ADDRESS_PATTERN, DEFAULT_CONFIG_PATH, DEFAULT_DELIMITER,
    DEFAULT_DISPATCH_FLOOR_MS, DEFAULT_MAX_BATCH_SIZE, DEFAULT_NOTIFY_BASE_URL,
    DEFAULT_TIMEOUT_SECS, ENV_ACCOUNT_SID, ENV_AUTH_TOKEN, ENV_MAX_BATCH_SIZE, ENV_MSG_BODY,
    ENV_NOTIFY_BASE_URL, FAILED_LEDGER_PATH, SUCCESS_LEDGER_PATH,
};
use crate::error::{NotifyError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Fully resolved run configuration. Built once at startup and then only read.
#[derive(Debug, Clone)]
pub struct Config {
    pub notify: NotifyConfig,
    pub batch: BatchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
}

#[derive(Clone)]
pub struct NotifyConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

// Keep the auth token out of logs.
impl fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    pub message_body: String,
    pub dispatch_floor_ms: u64,
}

impl BatchConfig {
    pub fn dispatch_floor(&self) -> Duration {
        Duration::from_millis(self.dispatch_floor_ms)
    }
}

#[derive(Debug, Clone)]
pub struct InputConfig {
    pub address_column: String,
    pub delimiter: char,
    pub validate_addresses: bool,
    pub address_pattern: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            address_column: DEFAULT_ADDRESS_COLUMN.to_string(),
            delimiter: DEFAULT_DELIMITER,
            validate_addresses: true,
            address_pattern: DEFAULT_ADDRESS_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub failed_path: PathBuf,
    pub success_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            failed_path: PathBuf::from(FAILED_LEDGER_PATH),
            success_path: PathBuf::from(SUCCESS_LEDGER_PATH),
        }
    }
}

// On-disk shape. Everything optional so env vars can fill the gaps.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    notify: FileNotify,
    batch: FileBatch,
    input: FileInput,
    output: FileOutput,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileNotify {
    account_sid: Option<String>,
    auth_token: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileBatch {
    max_batch_size: Option<toml::Value>,
    message_body: Option<String>,
    dispatch_floor_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileInput {
    address_column: Option<String>,
    delimiter: Option<String>,
    validate_addresses: Option<bool>,
    address_pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileOutput {
    failed_path: Option<PathBuf>,
    success_path: Option<PathBuf>,
}

impl Config {
    /// Load `config.toml` (or the given file) and overlay process environment,
    /// including anything picked up from `.env`.
    ///
    /// The default file may be absent; an explicitly named file must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let contents = read_config_file(path)?;
        Self::from_sources(contents.as_deref(), |key| std::env::var(key).ok())
    }

    /// Only the `[input]` section. Needs no credentials.
    pub fn load_input(path: Option<&Path>) -> Result<InputConfig> {
        let file: FileConfig = match read_config_file(path)? {
            Some(text) => toml::from_str(&text)?,
            None => FileConfig::default(),
        };
        input_from_file(file.input)
    }

    /// Resolve configuration from TOML text plus an environment lookup.
    /// Environment values win over file values.
    pub fn from_sources<F>(toml_text: Option<&str>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match toml_text {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let account_sid = env(ENV_ACCOUNT_SID).or(file.notify.account_sid);
        let auth_token = env(ENV_AUTH_TOKEN).or(file.notify.auth_token);
        let raw_batch_size = env(ENV_MAX_BATCH_SIZE)
            .map(toml::Value::String)
            .or(file.batch.max_batch_size);
        let message_body = env(ENV_MSG_BODY).or(file.batch.message_body);

        let account_sid = required(ENV_ACCOUNT_SID, account_sid)?;
        let auth_token = required(ENV_AUTH_TOKEN, auth_token)?;
        let raw_batch_size = match raw_batch_size {
            Some(v) => v,
            None => return Err(missing(ENV_MAX_BATCH_SIZE)),
        };
        let message_body = required(ENV_MSG_BODY, message_body)?;

        let input = input_from_file(file.input)?;

        let output_defaults = OutputConfig::default();
        let output = OutputConfig {
            failed_path: file.output.failed_path.unwrap_or(output_defaults.failed_path),
            success_path: file.output.success_path.unwrap_or(output_defaults.success_path),
        };

        Ok(Config {
            notify: NotifyConfig {
                account_sid,
                auth_token,
                base_url: env(ENV_NOTIFY_BASE_URL)
                    .or(file.notify.base_url)
                    .unwrap_or_else(|| DEFAULT_NOTIFY_BASE_URL.to_string()),
                timeout_secs: file.notify.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            },
            batch: BatchConfig {
                max_batch_size: parse_batch_size(&raw_batch_size),
                message_body,
                dispatch_floor_ms: file
                    .batch
                    .dispatch_floor_ms
                    .unwrap_or(DEFAULT_DISPATCH_FLOOR_MS),
            },
            input,
            output,
        })
    }
}

fn read_config_file(path: Option<&Path>) -> Result<Option<String>> {
    match path {
        Some(p) => fs::read_to_string(p).map(Some).map_err(|e| {
            NotifyError::Config(format!(
                "Failed to read config file '{}': {}",
                p.display(),
                e
            ))
        }),
        None => match fs::read_to_string(DEFAULT_CONFIG_PATH) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No {} found, using environment only", DEFAULT_CONFIG_PATH);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        },
    }
}

fn input_from_file(input: FileInput) -> Result<InputConfig> {
    let delimiter = match input.delimiter {
        None => DEFAULT_DELIMITER,
        Some(d) => {
            let mut chars = d.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() && c != '"' && c != '\n' && c != '\r' => c,
                _ => {
                    return Err(NotifyError::Config(format!(
                        "input.delimiter must be a single ASCII character, got '{}'",
                        d
                    )))
                }
            }
        }
    };

    let defaults = InputConfig::default();
    Ok(InputConfig {
        address_column: input.address_column.unwrap_or(defaults.address_column),
        delimiter,
        validate_addresses: input.validate_addresses.unwrap_or(defaults.validate_addresses),
        address_pattern: input.address_pattern.unwrap_or(defaults.address_pattern),
    })
}

fn missing(key: &str) -> NotifyError {
    NotifyError::Config(format!("missing required configuration key {}", key))
}

fn required(key: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| missing(key))
}

/// Present but unusable batch sizes fall back to one address per batch.
fn parse_batch_size(raw: &toml::Value) -> usize {
    let parsed = match raw {
        toml::Value::Integer(i) => Some(*i),
        toml::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match parsed {
        Some(n) if n > 0 => n as usize,
        _ => {
            warn!(
                "max_batch_size {} is not a positive integer, using {}",
                raw, DEFAULT_MAX_BATCH_SIZE
            );
            DEFAULT_MAX_BATCH_SIZE
        }
    }
}
