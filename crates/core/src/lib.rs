use serde::{Serialize, Deserialize};
use std::fmt;
use thiserror::Error;

mod config;
mod key;

pub use config::{RelocationConfig, DEFAULT_PARTITION_MARKER};
pub use key::{decode_key, extract_account_id, extract_partition_suffix};

/// Cloud account identifier. Nominally twelve ASCII digits, but never
/// rejected on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 12 && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Where aggregated objects land: one bucket, one prefix, one
/// `account=<id>/` folder per member account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub bucket: String,
    pub prefix: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self { bucket: bucket.into(), prefix: prefix.into() }
    }

    pub fn account_prefix(&self, account: &AccountId) -> String {
        format!("{}account={}/", self.prefix, account)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MalformedKeyError {
    #[error("object key '{key}' is not valid percent-encoded UTF-8")]
    InvalidEncoding { key: String },
    #[error("object key '{key}' contains no 12-digit account id")]
    MissingAccountId { key: String },
    #[error("object key '{key}' has no '{marker}' partition suffix")]
    MissingPartition { key: String, marker: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
    #[error("configuration field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// One planned copy from a source object into the aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relocation {
    pub source_bucket: String,
    pub source_key: String,
    pub account_id: AccountId,
    pub partition_suffix: String,
    pub destination_bucket: String,
    pub destination_key: String,
}

impl Relocation {
    /// `CopySource` reference: source bucket and decoded key.
    pub fn copy_source(&self) -> String {
        format!("{}/{}", self.source_bucket, self.source_key)
    }
}

/// Decodes `raw_key` and derives the destination of the copy. Pure; no I/O.
pub fn plan_relocation(
    source_bucket: &str,
    raw_key: &str,
    config: &RelocationConfig,
) -> Result<Relocation, MalformedKeyError> {
    let source_key = decode_key(raw_key)?;
    let account_id = extract_account_id(&source_key)?;
    let partition_suffix = extract_partition_suffix(&source_key, &config.partition_marker)?.to_string();
    let destination_key = format!("{}{}", config.destination.account_prefix(&account_id), partition_suffix);
    Ok(Relocation {
        source_bucket: source_bucket.to_string(),
        source_key,
        account_id,
        partition_suffix,
        destination_bucket: config.destination.bucket.clone(),
        destination_key,
    })
}
