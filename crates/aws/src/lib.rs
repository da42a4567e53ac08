use anyhow::Context;
use async_trait::async_trait;
use aws_lambda_events::event::s3::S3Event;
use aws_sdk_s3::Client as S3Client;
use curagg_core::{plan_relocation, MalformedKeyError, Relocation, RelocationConfig};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("storage event contains no records")]
    NoRecords,
    #[error("first record has no bucket name")]
    MissingBucket,
    #[error("first record has no object key")]
    MissingKey,
}

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    MalformedKey(#[from] MalformedKeyError),
    #[error(transparent)]
    Copy(#[from] anyhow::Error),
}

/// Bucket and still-encoded key named by a notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceObject { pub bucket: String, pub key: String }

/// Only the first record of an event is ever consumed.
pub fn first_record(event: &S3Event) -> Result<SourceObject, EventError> {
    let record = event.records.first().ok_or(EventError::NoRecords)?;
    let bucket = record.s3.bucket.name.clone().ok_or(EventError::MissingBucket)?;
    let key = record.s3.object.key.clone().ok_or(EventError::MissingKey)?;
    Ok(SourceObject { bucket, key })
}

/// Server-side copy seam. The Lambda and the CLI hand in an [`S3Copier`];
/// tests hand in fakes.
#[async_trait]
pub trait ObjectCopier: Send + Sync {
    async fn copy_object(&self, relocation: &Relocation) -> anyhow::Result<()>;
}

pub struct S3Copier { client: S3Client }

impl S3Copier {
    pub fn new(client: S3Client) -> Self { Self { client } }
}

#[async_trait]
impl ObjectCopier for S3Copier {
    async fn copy_object(&self, relocation: &Relocation) -> anyhow::Result<()> {
        self.client
            .copy_object()
            .bucket(&relocation.destination_bucket)
            .copy_source(relocation.copy_source())
            .key(&relocation.destination_key)
            .send()
            .await
            .with_context(|| format!(
                "copy {} to {}/{}",
                relocation.copy_source(), relocation.destination_bucket, relocation.destination_key
            ))?;
        Ok(())
    }
}

/// Copies the object named by the event's first record into the aggregation
/// bucket. Exactly one copy is issued, and only when the key parses.
pub async fn relocate(
    event: &S3Event,
    config: &RelocationConfig,
    copier: &dyn ObjectCopier,
) -> Result<Relocation, HandlerError> {
    let source = first_record(event)?;
    let relocation = plan_relocation(&source.bucket, &source.key, config)?;
    tracing::info!(
        source = %relocation.copy_source(),
        destination_bucket = %relocation.destination_bucket,
        destination_key = %relocation.destination_key,
        account_id = %relocation.account_id,
        "Copying {} to {}/{}",
        relocation.copy_source(), relocation.destination_bucket, relocation.destination_key
    );
    copier.copy_object(&relocation).await?;
    Ok(relocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_lambda_events::event::s3::{S3Bucket, S3Entity, S3EventRecord, S3Object};
    use aws_sdk_s3::operation::copy_object::CopyObjectOutput;
    use aws_smithy_mocks::{mock, mock_client};
    use curagg_core::Destination;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCopier { calls: Mutex<Vec<Relocation>> }

    #[async_trait]
    impl ObjectCopier for RecordingCopier {
        async fn copy_object(&self, relocation: &Relocation) -> anyhow::Result<()> {
            self.calls.lock().unwrap().push(relocation.clone());
            Ok(())
        }
    }

    struct FailingCopier;

    #[async_trait]
    impl ObjectCopier for FailingCopier {
        async fn copy_object(&self, _relocation: &Relocation) -> anyhow::Result<()> {
            anyhow::bail!("AccessDenied")
        }
    }

    fn event(bucket: Option<&str>, key: Option<&str>) -> S3Event {
        let record = S3EventRecord {
            s3: S3Entity {
                bucket: S3Bucket { name: bucket.map(str::to_string), ..Default::default() },
                object: S3Object { key: key.map(str::to_string), size: Some(1234), ..Default::default() },
                ..Default::default()
            },
            ..Default::default()
        };
        S3Event { records: vec![record] }
    }

    fn config() -> RelocationConfig { RelocationConfig::new(Destination::new("dest", "curs/")) }

    #[tokio::test]
    async fn copies_first_record_once() {
        let mut ev = event(Some("source-bucket"), Some("curs/123456789012/year=2024/month=01/file.csv.gz"));
        ev.records.push(event(Some("other"), Some("x/210987654321/year=2023/f")).records.remove(0));
        let copier = RecordingCopier::default();
        let r = relocate(&ev, &config(), &copier).await.unwrap();
        let calls = copier.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], r);
        assert_eq!(r.destination_bucket, "dest");
        assert_eq!(r.destination_key, "curs/account=123456789012/year=2024/month=01/file.csv.gz");
        assert_eq!(r.copy_source(), "source-bucket/curs/123456789012/year=2024/month=01/file.csv.gz");
    }

    #[tokio::test]
    async fn decodes_before_extracting() {
        let ev = event(Some("src"), Some("cur+reports/123456789012/year=2024/a%20b.csv"));
        let copier = RecordingCopier::default();
        let r = relocate(&ev, &config(), &copier).await.unwrap();
        assert_eq!(r.source_key, "cur reports/123456789012/year=2024/a b.csv");
        assert_eq!(r.destination_key, "curs/account=123456789012/year=2024/a b.csv");
    }

    #[tokio::test]
    async fn malformed_keys_never_reach_storage() {
        let copier = RecordingCopier::default();
        for key in ["curs/no-account/year=2024/f", "curs/123456789012/month=01/f"] {
            let err = relocate(&event(Some("src"), Some(key)), &config(), &copier).await.unwrap_err();
            assert!(matches!(err, HandlerError::MalformedKey(_)), "{key}: {err}");
        }
        assert!(copier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn incomplete_events_are_named() {
        let copier = RecordingCopier::default();
        let err = relocate(&S3Event { records: vec![] }, &config(), &copier).await.unwrap_err();
        assert!(matches!(err, HandlerError::Event(EventError::NoRecords)));
        let err = relocate(&event(None, Some("k")), &config(), &copier).await.unwrap_err();
        assert!(matches!(err, HandlerError::Event(EventError::MissingBucket)));
        let err = relocate(&event(Some("b"), None), &config(), &copier).await.unwrap_err();
        assert!(matches!(err, HandlerError::Event(EventError::MissingKey)));
    }

    #[tokio::test]
    async fn copy_failures_propagate() {
        let ev = event(Some("src"), Some("curs/123456789012/year=2024/f"));
        let err = relocate(&ev, &config(), &FailingCopier).await.unwrap_err();
        assert!(matches!(err, HandlerError::Copy(_)));
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[tokio::test]
    async fn relocates_a_delivered_notification() {
        let ev: S3Event = serde_json::from_str(include_str!("../../../demos/example_event.json")).unwrap();
        let copier = RecordingCopier::default();
        let r = relocate(&ev, &config(), &copier).await.unwrap();
        assert_eq!(r.source_bucket, "member-cur-bucket");
        assert_eq!(r.source_key, "curs/123456789012/cur report/year=2024/month=01/cur-report-00001.csv.gz");
        assert_eq!(r.destination_key, "curs/account=123456789012/year=2024/month=01/cur-report-00001.csv.gz");
        assert_eq!(copier.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn s3_copier_sends_copy_object() {
        let copy_rule = mock!(aws_sdk_s3::Client::copy_object)
            .match_requests(|req| {
                req.bucket() == Some("dest")
                    && req.copy_source() == Some("src/curs/123456789012/year=2024/f.csv")
                    && req.key() == Some("curs/account=123456789012/year=2024/f.csv")
            })
            .then_output(|| CopyObjectOutput::builder().build());
        let s3 = mock_client!(aws_sdk_s3, [&copy_rule]);
        let copier = S3Copier::new(s3);
        relocate(&event(Some("src"), Some("curs/123456789012/year=2024/f.csv")), &config(), &copier)
            .await
            .unwrap();
        assert_eq!(copy_rule.num_calls(), 1);
    }
}
