use anyhow::Result;
use curagg_core::{AccountId, Destination};
use serde::{Serialize, Deserialize};

pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename="AWS")]
    pub aws: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename="Effect")]    pub effect: String,
    #[serde(rename="Principal")] pub principal: Principal,
    #[serde(rename="Action")]    pub action: String,
    #[serde(rename="Resource")]  pub resource: String,
}

impl PolicyStatement {
    /// Lets `account`'s root identity write into its own folder of the
    /// aggregation bucket.
    pub fn put_object(account: &AccountId, destination: &Destination) -> Self {
        Self {
            effect: "Allow".to_string(),
            principal: Principal { aws: format!("arn:aws:iam::{}:root", account) },
            action: "s3:PutObject".to_string(),
            resource: format!("arn:aws:s3:::{}/{}*", destination.bucket, destination.account_prefix(account)),
        }
    }
}

/// Bucket policy for the aggregation bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename="Version")]   pub version: String,
    #[serde(rename="Statement")] pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// One statement per account, in input order. Duplicates and malformed
    /// ids pass through untouched.
    pub fn for_accounts<'a>(accounts: impl IntoIterator<Item = &'a AccountId>, destination: &Destination) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statements: accounts.into_iter().map(|a| PolicyStatement::put_object(a, destination)).collect(),
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
