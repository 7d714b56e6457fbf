use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_FAILURE_DELAY_SECONDS: u64 = 10;
pub const FAILURE_DELAY_ENV: &str = "FAILURE_DELAY_SECONDS";
pub const SCRATCH_DIR_ENV: &str = "SCRATCH_DIR";
pub const PAYLOAD_FAILURE_MODE_ENV: &str = "PAYLOAD_FAILURE_MODE";

/// What happens when a single payload cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionFailureMode {
    /// The failure aborts the invocation and is reported as `FAILED`.
    #[default]
    Propagate,
    /// The error text is written as the file content and processing goes on.
    Substitute,
}

impl FromStr for ResolutionFailureMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "propagate" => Ok(Self::Propagate),
            "substitute" => Ok(Self::Substitute),
            other => Err(format!(
                "{PAYLOAD_FAILURE_MODE_ENV} must be 'propagate' or 'substitute', got '{other}'"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Pause before reporting `FAILED`, throttling the orchestrator's
    /// re-invocations. No retry happens inside the handler.
    pub failure_delay: Duration,
    pub scratch_dir: PathBuf,
    pub resolution_failure: ResolutionFailureMode,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            failure_delay: Duration::from_secs(DEFAULT_FAILURE_DELAY_SECONDS),
            scratch_dir: std::env::temp_dir(),
            resolution_failure: ResolutionFailureMode::default(),
        }
    }
}

impl HandlerConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Self::default();

        let failure_delay = match lookup(FAILURE_DELAY_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|error| {
                    format!("{FAILURE_DELAY_ENV} must be a whole number of seconds: {error}")
                })?,
            None => defaults.failure_delay,
        };

        let scratch_dir = lookup(SCRATCH_DIR_ENV)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.scratch_dir);

        let resolution_failure = match lookup(PAYLOAD_FAILURE_MODE_ENV) {
            Some(raw) => raw.parse()?,
            None => defaults.resolution_failure,
        };

        Ok(Self {
            failure_delay,
            scratch_dir,
            resolution_failure,
        })
    }
}
