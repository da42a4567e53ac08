use aws_lambda_events::event::s3::S3Event;
use curagg_aws::{relocate, ObjectCopier};
use curagg_core::RelocationConfig;
use lambda_runtime::{tracing, Error, LambdaEvent};

pub(crate) async fn function_handler(
    event: LambdaEvent<S3Event>,
    config: &RelocationConfig,
    copier: &dyn ObjectCopier,
) -> Result<(), Error> {
    let payload = event.payload;
    if payload.records.len() > 1 {
        tracing::warn!("Event carries {} records; only the first is relocated", payload.records.len());
    }
    let relocation = relocate(&payload, config, copier).await?;
    tracing::info!(request_id = %event.context.request_id, "Relocated {}", relocation.destination_key);
    Ok(())
}
