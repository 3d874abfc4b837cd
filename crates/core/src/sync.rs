//! One-way synchronization between a local directory and a remote prefix
//!
//! Planning compares the source side against a single recursive listing of
//! the destination. With checksums enabled an entry whose fingerprint
//! matches is skipped; an entry without a usable remote fingerprint is
//! always transferred. Extraneous destination entries are only removed when
//! requested and only after every transfer succeeded.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{RunOptions, TaskFailure, TaskSet, run_tasks, walk_local};
use crate::error::{Error, Result};
use crate::fingerprint::{VERIFY_THRESHOLD, file_md5, remote_fingerprint};
use crate::path::{RemotePath, join_key, local_path_for_key};
use crate::progress::Progress;
use crate::traits::{ObjectInfo, ObjectStore, list_all};
use crate::transfer::TransferTask;

/// Maximum keys per bulk delete request
pub const DELETE_BATCH: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    /// Local to remote
    #[default]
    Up,
    /// Remote to local
    Down,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub direction: SyncDirection,
    /// Skip entries whose content fingerprint already matches
    pub checksums: bool,
    /// Remove destination entries that have no source counterpart
    pub delete: bool,
    pub continue_on_error: bool,
}

/// A destination entry with no source counterpart
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraneous {
    Remote(RemotePath),
    Local(PathBuf),
}

/// What a sync will do, before any byte moves
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    pub transfers: TaskSet,
    pub skipped: Vec<String>,
    /// Populated only when deletion was requested
    pub extraneous: Vec<Extraneous>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub transferred: usize,
    pub bytes: u64,
    pub skipped: usize,
    pub deleted: usize,
    pub failures: Vec<TaskFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Decide which entries to transfer, skip and delete
pub async fn plan(
    store: &dyn ObjectStore,
    local_root: &Path,
    remote: &RemotePath,
    options: &SyncOptions,
) -> Result<SyncPlan> {
    match options.direction {
        SyncDirection::Up => plan_up(store, local_root, remote, options).await,
        SyncDirection::Down => plan_down(store, local_root, remote, options).await,
    }
}

async fn remote_objects(
    store: &dyn ObjectStore,
    remote: &RemotePath,
) -> Result<HashMap<String, ObjectInfo>> {
    let listing = list_all(store, &remote.with_key(remote.dir_prefix()), true).await?;
    Ok(listing
        .into_iter()
        .filter(|o| !o.is_dir && !o.key.ends_with('/'))
        .map(|o| (o.key.clone(), o))
        .collect())
}

/// Fingerprint of a listed object, asking for its metadata when the
/// listing alone cannot provide one
async fn fingerprint_of(
    store: &dyn ObjectStore,
    remote: &RemotePath,
    listed: &ObjectInfo,
) -> Result<Option<String>> {
    if let Some(fp) = remote_fingerprint(listed) {
        return Ok(Some(fp));
    }
    if listed.size() <= VERIFY_THRESHOLD {
        return Ok(None);
    }
    let head = store.head_object(remote).await?;
    Ok(remote_fingerprint(&head))
}

async fn unchanged(
    store: &dyn ObjectStore,
    local: &Path,
    remote: &RemotePath,
    listed: &ObjectInfo,
) -> Result<bool> {
    let Some(remote_fp) = fingerprint_of(store, remote, listed).await? else {
        return Ok(false);
    };
    Ok(file_md5(local).await? == remote_fp)
}

async fn plan_up(
    store: &dyn ObjectStore,
    local_root: &Path,
    remote: &RemotePath,
    options: &SyncOptions,
) -> Result<SyncPlan> {
    if !local_root.is_dir() {
        return Err(Error::Usage(format!(
            "'{}' is not a directory",
            local_root.display()
        )));
    }

    let prefix = remote.dir_prefix();
    let existing = remote_objects(store, remote).await?;
    let mut plan = SyncPlan::default();
    let mut seen = HashSet::new();

    for entry in walk_local(local_root)? {
        let key = join_key(&prefix, &entry.relative);
        let target = remote.with_key(key.clone());
        seen.insert(key.clone());

        if let Some(listed) = existing.get(&key)
            && options.checksums
            && unchanged(store, &entry.path, &target, listed).await?
        {
            tracing::debug!(key = %key, "unchanged, skipping");
            plan.skipped.push(key);
            continue;
        }
        plan.transfers
            .push(TransferTask::upload(entry.path, target, entry.size_bytes));
    }

    if options.delete {
        let mut extra: Vec<_> = existing
            .into_keys()
            .filter(|k| !seen.contains(k))
            .collect();
        extra.sort();
        plan.extraneous = extra
            .into_iter()
            .map(|k| Extraneous::Remote(remote.with_key(k)))
            .collect();
    }
    Ok(plan)
}

async fn plan_down(
    store: &dyn ObjectStore,
    local_root: &Path,
    remote: &RemotePath,
    options: &SyncOptions,
) -> Result<SyncPlan> {
    let prefix = remote.dir_prefix();
    let mut objects: Vec<_> = remote_objects(store, remote).await?.into_values().collect();
    objects.sort_by(|a, b| a.key.cmp(&b.key));

    let mut plan = SyncPlan::default();
    let mut wanted = HashSet::new();

    for object in objects {
        let Some(local) = local_path_for_key(local_root, &prefix, &object.key) else {
            tracing::warn!(key = %object.key, "skipping key that would leave the destination");
            continue;
        };
        let source = remote.with_key(object.key.clone());
        wanted.insert(local.clone());

        if local.is_file()
            && options.checksums
            && unchanged(store, &local, &source, &object).await?
        {
            tracing::debug!(key = %object.key, "unchanged, skipping");
            plan.skipped.push(object.key);
            continue;
        }
        let size = object.size();
        plan.transfers
            .push(TransferTask::download(source, local, size));
    }

    if options.delete && local_root.is_dir() {
        plan.extraneous = walk_local(local_root)?
            .into_iter()
            .filter(|e| !wanted.contains(&e.path))
            .map(|e| Extraneous::Local(e.path))
            .collect();
    }
    Ok(plan)
}

/// Plan and execute a sync
pub async fn sync(
    store: &dyn ObjectStore,
    local_root: &Path,
    remote: &RemotePath,
    options: SyncOptions,
    progress: Arc<dyn Progress>,
) -> Result<SyncReport> {
    let plan = plan(store, local_root, remote, &options).await?;
    tracing::debug!(
        transfers = plan.transfers.len(),
        skipped = plan.skipped.len(),
        extraneous = plan.extraneous.len(),
        "sync planned"
    );

    progress.begin(plan.transfers.total_bytes);
    let run = run_tasks(
        store,
        &plan.transfers.tasks,
        RunOptions {
            continue_on_error: options.continue_on_error,
        },
        progress.clone(),
    )
    .await;
    progress.finish();
    let run = run?;

    let mut report = SyncReport {
        direction: options.direction,
        transferred: run.transferred,
        bytes: run.bytes,
        skipped: plan.skipped.len(),
        deleted: 0,
        failures: run.failures,
    };

    if !plan.extraneous.is_empty() {
        if report.is_success() {
            delete_extraneous(store, plan.extraneous, &mut report).await?;
        } else {
            tracing::warn!(
                count = plan.extraneous.len(),
                "transfers failed, not deleting extraneous entries"
            );
        }
    }
    Ok(report)
}

async fn delete_extraneous(
    store: &dyn ObjectStore,
    extraneous: Vec<Extraneous>,
    report: &mut SyncReport,
) -> Result<()> {
    let mut remote_keys: Vec<(String, String)> = Vec::new();
    for entry in extraneous {
        match entry {
            Extraneous::Remote(path) => remote_keys.push((path.bucket, path.key)),
            Extraneous::Local(path) => match tokio::fs::remove_file(&path).await {
                Ok(()) => report.deleted += 1,
                Err(e) => report.failures.push(TaskFailure {
                    source: String::new(),
                    destination: path.display().to_string(),
                    error: Error::file("Cannot remove", &path, e).to_string(),
                }),
            },
        }
    }

    let Some((bucket, _)) = remote_keys.first().cloned() else {
        return Ok(());
    };
    let keys: Vec<String> = remote_keys.into_iter().map(|(_, k)| k).collect();
    for batch in keys.chunks(DELETE_BATCH) {
        let outcome = store.delete_objects(&bucket, batch.to_vec()).await?;
        report.deleted += outcome.deleted.len();
        for (key, reason) in outcome.failed {
            tracing::warn!(key = %key, reason = %reason, "delete failed");
            report.failures.push(TaskFailure {
                source: String::new(),
                destination: format!("{bucket}/{key}"),
                error: reason,
            });
        }
    }
    Ok(())
}
