use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub const LIVE_FOLDER_ENV: &str = "CHAINSYNC_LIVE_FOLDER";
pub const STORE_ENV: &str = "CHAINSYNC_STORE";
pub const ON_MALFORMED_ENV: &str = "CHAINSYNC_ON_MALFORMED";
pub const DEFAULT_STORE_FILE: &str = "chainsync-store.json";

/// What a collection fetch does with a document that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Fail the whole fetch on the first malformed document.
    #[default]
    Abort,
    /// Log the document and keep reconciling the rest of the scope.
    Skip,
}

impl MalformedPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for MalformedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown malformed-document policy '{0}' (expected 'abort' or 'skip')")]
pub struct ParsePolicyError(String);

impl FromStr for MalformedPolicy {
    type Err = ParsePolicyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" | "" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(ParsePolicyError(value.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub live_folder: Option<Utf8PathBuf>,
    pub store: Option<Utf8PathBuf>,
    pub on_malformed: Option<MalformedPolicy>,
}

#[derive(Debug, Clone)]
pub struct Config {
    live_folder: Utf8PathBuf,
    store: Utf8PathBuf,
    on_malformed: MalformedPolicy,
}

impl Config {
    /// Configuration rooted at `live_folder` with every other setting defaulted.
    pub fn new(live_folder: impl Into<Utf8PathBuf>) -> Self {
        Self {
            live_folder: live_folder.into(),
            store: Utf8PathBuf::from(DEFAULT_STORE_FILE),
            on_malformed: MalformedPolicy::default(),
        }
    }

    /// Builds a configuration from the process environment plus overrides.
    ///
    /// # Errors
    /// Returns an error when no live folder is configured or a setting does not parse.
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self> {
        Self::from_snapshot(&EnvSnapshot::capture(), overrides)
    }

    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot, overrides: &ConfigOverrides) -> Result<Self> {
        let live_folder = match (&overrides.live_folder, snapshot.var(LIVE_FOLDER_ENV)) {
            (Some(path), _) => path.clone(),
            (None, Some(value)) => Utf8PathBuf::from(value),
            (None, None) => bail!("{LIVE_FOLDER_ENV} is not set; pass --live-folder"),
        };
        let store = overrides
            .store
            .clone()
            .or_else(|| snapshot.var(STORE_ENV).map(Utf8PathBuf::from))
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_STORE_FILE));
        let on_malformed = match overrides.on_malformed {
            Some(policy) => policy,
            None => snapshot
                .var(ON_MALFORMED_ENV)
                .map(MalformedPolicy::from_str)
                .transpose()?
                .unwrap_or_default(),
        };
        Ok(Self {
            live_folder,
            store,
            on_malformed,
        })
    }

    #[must_use]
    pub fn with_on_malformed(mut self, policy: MalformedPolicy) -> Self {
        self.on_malformed = policy;
        self
    }

    #[must_use]
    pub fn live_folder(&self) -> &Utf8Path {
        &self.live_folder
    }

    #[must_use]
    pub fn store(&self) -> &Utf8Path {
        &self.store
    }

    #[must_use]
    pub fn on_malformed(&self) -> MalformedPolicy {
        self.on_malformed
    }
}
