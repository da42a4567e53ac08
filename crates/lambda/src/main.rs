use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use curagg_aws::S3Copier;
use curagg_core::RelocationConfig;
use lambda_runtime::{run, service_fn, tracing, Error};
mod event_handler;
use event_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::subscriber::fmt().json().init();
    let config = RelocationConfig::from_env()?;
    let shared_config = aws_config::load_defaults(BehaviorVersion::v2025_01_17()).await;
    let copier = S3Copier::new(S3Client::new(&shared_config));
    run(service_fn(|event| function_handler(event, &config, &copier))).await
}
