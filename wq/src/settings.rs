//! Process-wide tunables
//!
//! Resolved once at startup into an explicit [`Tunables`] value handed to the
//! queue constructor - never read ad hoc from global state, so the engine
//! stays testable with injected values. Environment variables win over the
//! optional config file ([`crate::config::FileConfig`]), which wins over the
//! built-in defaults.

use thiserror::Error;

use crate::config::FileConfig;

/// Environment variable for the completed-step retention cap.
pub const ENV_MAX_COMPLETED_TASKS: &str = "WIZQUEUE_MAX_COMPLETED_TASKS";

/// Environment variable for the memory-pressure byte threshold.
pub const ENV_MEMORY_THRESHOLD: &str = "WIZQUEUE_MEMORY_THRESHOLD";

/// Environment variable for the process soft memory limit; when set and no
/// explicit threshold is given, the threshold becomes 80% of it.
pub const ENV_SOFT_MEMORY_LIMIT: &str = "WIZQUEUE_SOFT_MEMORY_LIMIT";

/// Default number of completed steps kept in memory.
pub const DEFAULT_MAX_COMPLETED_TASKS: usize = 50;

/// Default memory-pressure threshold: 64 MiB.
pub const DEFAULT_MEMORY_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Errors resolving tunables
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Invalid byte size '{value}': expected a byte count with optional KB/MB/GB/KiB/MiB/GiB suffix")]
    InvalidByteSize { value: String },

    #[error("Invalid count '{value}': expected a positive integer")]
    InvalidCount { value: String },
}

/// Resolved process-wide tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    /// Maximum retained completed steps (hard cap, not pressure-dependent)
    pub max_completed_tasks: usize,

    /// Byte threshold above which emergency cleanup triggers
    pub memory_threshold: u64,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            max_completed_tasks: DEFAULT_MAX_COMPLETED_TASKS,
            memory_threshold: DEFAULT_MEMORY_THRESHOLD,
        }
    }
}

impl Tunables {
    /// Resolve tunables from the environment and the config-file fallback
    /// chain. Call once at startup.
    pub fn resolve() -> Result<Self, SettingsError> {
        let file = FileConfig::load(None).unwrap_or_default();
        Self::resolve_with(&file)
    }

    /// Resolve tunables against an already-loaded file config.
    pub fn resolve_with(file: &FileConfig) -> Result<Self, SettingsError> {
        let max_completed_tasks = match std::env::var(ENV_MAX_COMPLETED_TASKS) {
            Ok(value) => parse_count(&value)?,
            Err(_) => file.max_completed_tasks.unwrap_or(DEFAULT_MAX_COMPLETED_TASKS),
        };

        let memory_threshold = match std::env::var(ENV_MEMORY_THRESHOLD) {
            Ok(value) => parse_byte_size(&value)?,
            Err(_) => match &file.memory_threshold {
                Some(value) => parse_byte_size(value)?,
                None => match Self::soft_limit(file)? {
                    Some(limit) => limit / 5 * 4,
                    None => DEFAULT_MEMORY_THRESHOLD,
                },
            },
        };

        Ok(Self {
            max_completed_tasks,
            memory_threshold,
        })
    }

    fn soft_limit(file: &FileConfig) -> Result<Option<u64>, SettingsError> {
        if let Ok(value) = std::env::var(ENV_SOFT_MEMORY_LIMIT) {
            return parse_byte_size(&value).map(Some);
        }
        match &file.soft_memory_limit {
            Some(value) => parse_byte_size(value).map(Some),
            None => Ok(None),
        }
    }
}

/// Parse a positive integer count.
pub fn parse_count(value: &str) -> Result<usize, SettingsError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SettingsError::InvalidCount { value: value.to_string() }),
    }
}

/// Parse a byte size: a raw count, or a count with a decimal (KB/MB/GB) or
/// binary (KiB/MiB/GiB) suffix. Case-insensitive, optional whitespace before
/// the suffix.
pub fn parse_byte_size(value: &str) -> Result<u64, SettingsError> {
    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(trimmed.len());
    let (number, suffix) = trimmed.split_at(split);

    let number: u64 = number
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidByteSize { value: value.to_string() })?;

    let multiplier: u64 = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "kb" => 1_000,
        "mb" => 1_000_000,
        "gb" => 1_000_000_000,
        "kib" => 1 << 10,
        "mib" => 1 << 20,
        "gib" => 1 << 30,
        _ => return Err(SettingsError::InvalidByteSize { value: value.to_string() }),
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| SettingsError::InvalidByteSize { value: value.to_string() })
}
