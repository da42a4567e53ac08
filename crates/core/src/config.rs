use crate::{ConfigError, Destination};

pub const DEFAULT_PARTITION_MARKER: &str = "year=";

const TARGET_BUCKET: &str = "TARGET_BUCKET";
const TARGET_DEFAULT_PATH: &str = "TARGET_DEFAULT_PATH";
const PARTITION_MARKER: &str = "PARTITION_MARKER";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationConfig {
    pub destination: Destination,
    pub partition_marker: String,
}

impl RelocationConfig {
    pub fn new(destination: Destination) -> Self {
        Self { destination, partition_marker: DEFAULT_PARTITION_MARKER.to_string() }
    }

    pub fn with_partition_marker(mut self, marker: impl Into<String>) -> Self {
        self.partition_marker = marker.into();
        self
    }

    /// Checks the fields a copy cannot do without. The destination prefix may
    /// be empty (objects land at the bucket root).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.bucket.trim().is_empty() { return Err(ConfigError::EmptyField("bucket")); }
        if self.partition_marker.is_empty() { return Err(ConfigError::EmptyField("partition_marker")); }
        Ok(())
    }

    /// Reads `TARGET_BUCKET`, `TARGET_DEFAULT_PATH` and the optional
    /// `PARTITION_MARKER` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bucket = lookup(TARGET_BUCKET).ok_or(ConfigError::MissingVar(TARGET_BUCKET))?;
        let prefix = lookup(TARGET_DEFAULT_PATH).ok_or(ConfigError::MissingVar(TARGET_DEFAULT_PATH))?;
        let mut cfg = Self::new(Destination::new(bucket, prefix));
        if let Some(marker) = lookup(PARTITION_MARKER) {
            cfg.partition_marker = marker;
        }
        cfg.validate().map_err(|e| match e {
            ConfigError::EmptyField("bucket") => ConfigError::EmptyField(TARGET_BUCKET),
            ConfigError::EmptyField("partition_marker") => ConfigError::EmptyField(PARTITION_MARKER),
            other => other,
        })?;
        Ok(cfg)
    }
}
