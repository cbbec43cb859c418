//! Advisor Configuration
//!
//! Everything the advisor reads from the environment. Numeric values that
//! fail to parse fall back to their defaults.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use agent_core::graph::DEFAULT_MAX_STEPS;
use agent_core::provider::DEFAULT_MODEL;

use crate::error::{AdvisorError, Result};

pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 90;

/// The accountant reasons over the whole conversation and needs room
pub const COORDINATOR_MAX_TOKENS: u32 = 5000;

pub const WORKER_MAX_TOKENS: u32 = 2048;

/// Sample tables compiled into the binary, comma separated
pub const BUNDLED_DEDUCTIONS: &str = include_str!("../resources/deductions_data.csv");
pub const BUNDLED_RATES: &str = include_str!("../resources/tax_data.csv");

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorConfig {
    /// Model used by every agent
    pub model: String,

    /// Deduction categories with their caps; `None` uses [`BUNDLED_DEDUCTIONS`]
    pub deductions_table: Option<PathBuf>,

    /// Progressive tax brackets; `None` uses [`BUNDLED_RATES`]
    pub rates_table: Option<PathBuf>,

    /// Applies to tables read from disk
    pub table_delimiter: char,

    pub max_steps: usize,

    /// Per agent call; zero disables the timeout
    pub step_timeout_secs: u64,

    pub coordinator_max_tokens: u32,

    pub worker_max_tokens: u32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            deductions_table: None,
            rates_table: None,
            table_delimiter: ',',
            max_steps: DEFAULT_MAX_STEPS,
            step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            coordinator_max_tokens: COORDINATOR_MAX_TOKENS,
            worker_max_tokens: WORKER_MAX_TOKENS,
        }
    }
}

impl AdvisorConfig {
    /// Load from `TAX_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let table_delimiter = match get("TAX_TABLE_DELIMITER") {
            None => defaults.table_delimiter,
            Some(value) => single_char(&value).ok_or_else(|| {
                AdvisorError::Config(format!(
                    "TAX_TABLE_DELIMITER must be a single character, got '{}'",
                    value
                ))
            })?,
        };

        Ok(Self {
            model: get("TAX_MODEL").unwrap_or(defaults.model),
            deductions_table: get("TAX_DEDUCTIONS_TABLE").map(PathBuf::from),
            rates_table: get("TAX_RATES_TABLE").map(PathBuf::from),
            table_delimiter,
            max_steps: parsed_or(get("TAX_MAX_STEPS"), defaults.max_steps),
            step_timeout_secs: parsed_or(get("TAX_STEP_TIMEOUT_SECS"), defaults.step_timeout_secs),
            coordinator_max_tokens: defaults.coordinator_max_tokens,
            worker_max_tokens: defaults.worker_max_tokens,
        })
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_tables(mut self, deductions: impl Into<PathBuf>, rates: impl Into<PathBuf>) -> Self {
        self.deductions_table = Some(deductions.into());
        self.rates_table = Some(rates.into());
        self
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        (self.step_timeout_secs > 0).then(|| Duration::from_secs(self.step_timeout_secs))
    }
}

fn parsed_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn single_char(value: &str) -> Option<char> {
    if value == "\\t" {
        return Some('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
