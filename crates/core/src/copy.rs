//! `cp` execution for every [`CopyPlan`]

use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{RunOptions, RunReport, TaskSet, run_tasks, scan_local, scan_remote};
use crate::error::{Error, Result};
use crate::path::{CopyPlan, upload_key};
use crate::progress::Progress;
use crate::traits::ObjectStore;
use crate::transfer::{Direction, TransferTask, download_target};

/// Result of a copy
#[derive(Debug, Clone, Serialize)]
pub struct CopyReport {
    pub direction: Direction,
    pub source: String,
    pub destination: String,
    #[serde(flatten)]
    pub run: RunReport,
}

/// Perform `plan`, driving `progress` from the first byte to the last
pub async fn copy(
    store: &dyn ObjectStore,
    plan: &CopyPlan,
    options: RunOptions,
    progress: Arc<dyn Progress>,
) -> Result<CopyReport> {
    let (direction, source, destination) = describe(plan);
    let set = match plan {
        CopyPlan::UploadFile { local, remote } => {
            let size = tokio::fs::metadata(local)
                .await
                .map_err(|e| Error::file("Cannot stat", local, e))?
                .len();
            let key = upload_key(local, remote);
            single(TransferTask::upload(local.clone(), remote.with_key(key), size))
        }
        CopyPlan::DownloadObject { remote, local } => {
            let info = store.head_object(remote).await?;
            let dest = download_target(remote, local);
            single(TransferTask::download(remote.clone(), dest, info.size()))
        }
        CopyPlan::UploadDir { local, remote } => scan_local(local, remote)?,
        CopyPlan::DownloadPrefix { remote, local } => scan_remote(store, remote, local).await?,
    };

    progress.begin(set.total_bytes);
    let result = run_tasks(store, &set.tasks, options, progress.clone()).await;
    progress.finish();

    Ok(CopyReport {
        direction,
        source,
        destination,
        run: result?,
    })
}

fn single(task: TransferTask) -> TaskSet {
    let mut set = TaskSet::default();
    set.push(task);
    set
}

fn describe(plan: &CopyPlan) -> (Direction, String, String) {
    match plan {
        CopyPlan::UploadFile { local, remote } | CopyPlan::UploadDir { local, remote } => (
            Direction::Upload,
            local.display().to_string(),
            remote.to_string(),
        ),
        CopyPlan::DownloadObject { remote, local } | CopyPlan::DownloadPrefix { remote, local } => (
            Direction::Download,
            remote.to_string(),
            local.display().to_string(),
        ),
    }
}
