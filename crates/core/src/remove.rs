//! Object, prefix and bucket removal

use serde::Serialize;

use crate::error::{Error, Result};
use crate::path::RemotePath;
use crate::sync::DELETE_BATCH;
use crate::traits::{ObjectStore, list_all};

/// Outcome of a removal
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoveReport {
    /// Whether the bucket itself was removed
    pub bucket_removed: bool,
    /// Keys removed
    pub deleted: Vec<String>,
    /// Keys the store refused to remove, with its reason
    pub failed: Vec<(String, String)>,
}

/// Remove `target`
///
/// A bucket is only removed with `recursive`. A recursive removal of a key
/// deletes everything sharing that key prefix and keeps going past
/// individual failures, which are logged and reported.
pub async fn remove(
    store: &dyn ObjectStore,
    target: &RemotePath,
    recursive: bool,
) -> Result<RemoveReport> {
    let mut report = RemoveReport::default();

    if target.key.is_empty() {
        if !recursive {
            return Err(Error::Usage(
                "refusing to delete entire bucket without recursive".into(),
            ));
        }
        store.delete_bucket(&target.bucket).await?;
        tracing::debug!(bucket = %target.bucket, "bucket deleted");
        report.bucket_removed = true;
        return Ok(report);
    }

    if !recursive {
        store.delete_object(target).await?;
        report.deleted.push(target.key.clone());
        return Ok(report);
    }

    let keys: Vec<String> = list_all(store, target, true)
        .await?
        .into_iter()
        .filter(|o| !o.is_dir)
        .map(|o| o.key)
        .collect();
    tracing::debug!(prefix = %target, count = keys.len(), "removing objects");

    for batch in keys.chunks(DELETE_BATCH) {
        match store.delete_objects(&target.bucket, batch.to_vec()).await {
            Ok(outcome) => {
                for (key, reason) in &outcome.failed {
                    tracing::warn!(key = %key, reason = %reason, "failed to delete object");
                }
                report.deleted.extend(outcome.deleted);
                report.failed.extend(outcome.failed);
            }
            Err(e) => {
                tracing::warn!(error = %e, count = batch.len(), "bulk delete request failed");
                let reason = e.to_string();
                report
                    .failed
                    .extend(batch.iter().map(|k| (k.clone(), reason.clone())));
            }
        }
    }
    Ok(report)
}
