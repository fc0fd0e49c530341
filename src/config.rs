use std::error::Error;
use std::fmt::{Display, Formatter};
use log::{info, warn};

pub const DEFAULT_MEMORY: usize = 1 << 16;
/// Largest accepted memory size: 2^28 cells, 2 GiB of `i64`.
pub const MAX_MEMORY: usize = 1 << 28;

/// Run options given on the command line as `key=value` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Number of memory cells.
    pub memory: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config { memory: DEFAULT_MEMORY }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MalformedOption {
        option: String
    },
    InvalidMemory {
        value: String
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MalformedOption { option } => write!(f, "invalid option: {option} (expected key=value)"),
            ConfigError::InvalidMemory { value } => write!(f, "invalid memory size: {value} (expected 1 to {MAX_MEMORY} cells)"),
        }
    }
}

impl Error for ConfigError {}

impl Config {
    pub fn from_options<S: AsRef<str>>(options: &[S]) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        for option in options {
            let option = option.as_ref();
            let Some((key, value)) = option.split_once('=') else {
                return Err(ConfigError::MalformedOption { option: option.to_string() });
            };
            match key {
                "memory" => {
                    config.memory = value
                        .parse::<usize>()
                        .ok()
                        .filter(|memory| (1..=MAX_MEMORY).contains(memory))
                        .ok_or_else(|| ConfigError::InvalidMemory { value: value.to_string() })?;
                    info!("memory size set to {} cells", config.memory);
                }
                _ => warn!("ignoring unknown option {key}"),
            }
        }
        Ok(config)
    }
}
