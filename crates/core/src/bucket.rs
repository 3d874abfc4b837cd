//! Idempotent bucket creation

use serde::Serialize;

use crate::error::Result;
use crate::traits::{BucketOptions, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketCreation {
    Created,
    AlreadyExists,
}

/// Create `bucket`, treating an existing bucket as success
pub async fn make_bucket(
    store: &dyn ObjectStore,
    bucket: &str,
    options: &BucketOptions,
) -> Result<BucketCreation> {
    match store.create_bucket(bucket, options).await {
        Ok(()) => Ok(BucketCreation::Created),
        Err(create_err) => match store.bucket_exists(bucket).await {
            Ok(true) => {
                tracing::debug!(bucket, error = %create_err, "bucket already exists");
                Ok(BucketCreation::AlreadyExists)
            }
            _ => Err(create_err),
        },
    }
}
