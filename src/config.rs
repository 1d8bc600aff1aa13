//! Stack Configuration Module
//!
//! A stack file carries the values the declaration needs and optional engine
//! tuning:
//!
//! ```yaml
//! config:
//!   skyform:sshPublicKey: ssh-rsa AAAA...
//! engine:
//!   poll_interval_ms: 2000
//!   status_timeout_ms: 600000
//! ```
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`SKYFORM_SSH_PUBLIC_KEY`, `SKYFORM_POLL_INTERVAL_MS`, ...)
//! 2. Stack file
//! 3. Defaults

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkyError};
use crate::util::{DEFAULT_POLL_INTERVAL, DEFAULT_STATUS_TIMEOUT};

/// Namespace prefix of stack config keys
pub const NAMESPACE: &str = "skyform";

const ENV_PREFIX: &str = "SKYFORM_";
const ENV_POLL_INTERVAL: &str = "SKYFORM_POLL_INTERVAL_MS";
const ENV_STATUS_TIMEOUT: &str = "SKYFORM_STATUS_TIMEOUT_MS";

/// How status watches poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Keep only the pairs that are valid UTF-8
fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
}

/// Engine tuning section
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    pub poll_interval_ms: Option<u64>,
    pub status_timeout_ms: Option<u64>,
}

#[derive(Deserialize)]
struct RawStack {
    #[serde(default)]
    config: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    engine: EngineSettings,
}

/// Configuration of one stack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StackConfig {
    values: BTreeMap<String, String>,
    pub engine: EngineSettings,
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a stack file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SkyError::ConfigError {
            reason: format!("Failed to read stack file {}: {}", path.display(), e),
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty file is an empty stack
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawStack = serde_yaml::from_str(content).map_err(|e| SkyError::ConfigError {
            reason: format!("Failed to parse stack file: {}", e),
        })?;

        let mut values = BTreeMap::new();
        for (key, value) in raw.config {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => continue,
                _ => {
                    return Err(SkyError::ConfigError {
                        reason: format!("config value '{}' must be a scalar", key),
                    })
                }
            };
            values.insert(bare_key(&key).to_string(), text);
        }

        Ok(Self {
            values,
            engine: raw.engine,
        })
    }

    /// Merge with the process environment.
    ///
    /// Variables whose name or value is not UTF-8 are ignored.
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(utf8_vars(std::env::vars_os()))
    }

    /// Merge with explicit environment pairs; they take precedence over the file.
    ///
    /// `SKYFORM_<SCREAMING_SNAKE>` maps onto the camelCase key
    /// (`SKYFORM_SSH_PUBLIC_KEY` → `sshPublicKey`).
    pub fn with_env_from(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        for (name, value) in vars {
            if value.is_empty() {
                continue;
            }
            match name.as_str() {
                ENV_POLL_INTERVAL => self.engine.poll_interval_ms = Some(parse_ms(&name, &value)?),
                ENV_STATUS_TIMEOUT => self.engine.status_timeout_ms = Some(parse_ms(&name, &value)?),
                _ => {
                    if let Some(rest) = name.strip_prefix(ENV_PREFIX) {
                        if !rest.is_empty() {
                            self.values.insert(camel_case(rest), value);
                        }
                    }
                }
            }
        }
        Ok(self)
    }

    /// Value of `key` (namespaced or bare)
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(bare_key(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Value of `key`, or `ConfigurationMissing`
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key).ok_or_else(|| SkyError::ConfigurationMissing {
            key: bare_key(key).to_string(),
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(bare_key(key).to_string(), value.into());
    }

    /// Polling policy from the engine section, defaults filling the gaps
    pub fn poll_policy(&self) -> Result<PollPolicy> {
        let defaults = PollPolicy::default();
        let interval = self
            .engine
            .poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);
        let timeout = self
            .engine
            .status_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.timeout);

        if interval.is_zero() {
            return Err(SkyError::ConfigError {
                reason: "poll_interval_ms must be greater than zero".into(),
            });
        }
        if interval > timeout {
            return Err(SkyError::ConfigError {
                reason: format!(
                    "poll_interval_ms ({}) exceeds status_timeout_ms ({})",
                    interval.as_millis(),
                    timeout.as_millis()
                ),
            });
        }
        Ok(PollPolicy::new(interval, timeout))
    }
}

/// `skyform:sshPublicKey` → `sshPublicKey`
fn bare_key(key: &str) -> &str {
    key.strip_prefix(NAMESPACE)
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(key)
}

/// `SSH_PUBLIC_KEY` → `sshPublicKey`
fn camel_case(screaming: &str) -> String {
    let mut out = String::with_capacity(screaming.len());
    for (i, word) in screaming.split('_').filter(|w| !w.is_empty()).enumerate() {
        let lower = word.to_ascii_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.push(first.to_ascii_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

fn parse_ms(name: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| SkyError::ConfigError {
        reason: format!("{} must be a number of milliseconds, got '{}'", name, value),
    })
}
