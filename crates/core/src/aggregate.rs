//! Recursive transfers
//!
//! A scan collects every file under a local directory or remote prefix into
//! a [`TaskSet`] together with the byte total. [`run_tasks`] then consumes
//! that same set, so the progress total and the transferred files always
//! describe the same entries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::path::{RemotePath, join_key, local_path_for_key};
use crate::progress::Progress;
use crate::traits::{ObjectStore, list_all};
use crate::transfer::TransferTask;

/// A regular file found under a local root
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub path: PathBuf,
    /// Path relative to the walked root
    pub relative: PathBuf,
    pub size_bytes: u64,
    pub modified: Option<SystemTime>,
}

/// Every regular file below `root`, ordered by file name at each level
pub fn walk_local(root: &Path) -> Result<Vec<LocalEntry>> {
    let mut entries = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            Error::file("Cannot read", path, source)
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|e| Error::General(format!("Cannot stat {}: {e}", entry.path().display())))?;
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| {
                Error::General(format!(
                    "{} is outside {}",
                    entry.path().display(),
                    root.display()
                ))
            })?
            .to_path_buf();

        entries.push(LocalEntry {
            path: entry.path().to_path_buf(),
            relative,
            size_bytes: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }
    Ok(entries)
}

/// Ordered transfers plus their combined size
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    pub tasks: Vec<TransferTask>,
    pub total_bytes: u64,
}

impl TaskSet {
    pub fn push(&mut self, task: TransferTask) {
        self.total_bytes += task.size_bytes;
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// Upload tasks for every file below `root`, keyed under `remote`'s prefix
pub fn scan_local(root: &Path, remote: &RemotePath) -> Result<TaskSet> {
    let prefix = remote.dir_prefix();
    let mut set = TaskSet::default();
    for entry in walk_local(root)? {
        let key = join_key(&prefix, &entry.relative);
        set.push(TransferTask::upload(
            entry.path,
            remote.with_key(key),
            entry.size_bytes,
        ));
    }
    tracing::debug!(root = %root.display(), files = set.len(), bytes = set.total_bytes, "scanned local tree");
    Ok(set)
}

/// Download tasks for every object under `remote`, placed below `root`
///
/// Directory marker objects (keys ending in `/`) are skipped.
pub async fn scan_remote(
    store: &dyn ObjectStore,
    remote: &RemotePath,
    root: &Path,
) -> Result<TaskSet> {
    let prefix = remote.dir_prefix();
    let listing = list_all(store, &remote.with_key(prefix.clone()), true).await?;

    let mut set = TaskSet::default();
    for object in listing {
        if object.is_dir || object.key.ends_with('/') {
            continue;
        }
        let Some(local) = local_path_for_key(root, &prefix, &object.key) else {
            tracing::warn!(key = %object.key, "skipping key that would leave the destination");
            continue;
        };
        let size = object.size();
        set.push(TransferTask::download(remote.with_key(object.key), local, size));
    }
    tracing::debug!(remote = %remote, files = set.len(), bytes = set.total_bytes, "scanned remote prefix");
    Ok(set)
}

/// How a batch reacts to a failed task
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Keep going after a failure and report all failures at the end
    pub continue_on_error: bool,
}

/// A task that did not complete
#[derive(Debug, Clone, Serialize)]
pub struct TaskFailure {
    pub source: String,
    pub destination: String,
    pub error: String,
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub transferred: usize,
    pub bytes: u64,
    pub failures: Vec<TaskFailure>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run tasks in order against one shared progress total
///
/// Without `continue_on_error` the first failure is returned as the error.
/// The caller owns `progress.begin` and `progress.finish`.
pub async fn run_tasks(
    store: &dyn ObjectStore,
    tasks: &[TransferTask],
    options: RunOptions,
    progress: Arc<dyn Progress>,
) -> Result<RunReport> {
    let mut report = RunReport::default();
    for task in tasks {
        match task.run(store, progress.clone()).await {
            Ok(()) => {
                report.transferred += 1;
                report.bytes += task.size_bytes;
            }
            Err(e) if options.continue_on_error => {
                tracing::warn!(source = %task.source(), error = %e, "transfer failed");
                report.failures.push(TaskFailure {
                    source: task.source(),
                    destination: task.destination(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::progress::MockProgress;
    use crate::progress::NoProgress;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub").join("deep")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "bb").unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("sub").join("c.txt"), "ccc").unwrap();
        std::fs::write(dir.path().join("sub").join("deep").join("d.txt"), "dddd").unwrap();
        dir
    }

    #[test]
    fn test_scan_local_orders_and_sums() {
        let dir = tree();
        let set = scan_local(dir.path(), &RemotePath::new("b", "backup")).unwrap();

        let keys: Vec<_> = set.tasks.iter().map(|t| t.remote.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "backup/a.txt",
                "backup/b.txt",
                "backup/sub/c.txt",
                "backup/sub/deep/d.txt"
            ]
        );
        assert_eq!(set.total_bytes, 10);
    }

    #[test]
    fn test_scan_local_bucket_root() {
        let dir = tree();
        let set = scan_local(dir.path(), &RemotePath::new("b", "")).unwrap();
        assert_eq!(set.tasks[0].remote.key, "a.txt");
    }

    #[tokio::test]
    async fn test_scan_remote_skips_markers() {
        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.insert("b", "runs/", b"");
        store.insert("b", "runs/one.log", b"1");
        store.insert("b", "runs/nested/two.log", b"22");
        store.insert("b", "other/x", b"x");

        let root = Path::new("/restore");
        let set = scan_remote(&store, &RemotePath::new("b", "runs"), root)
            .await
            .unwrap();

        let locals: Vec<_> = set.tasks.iter().map(|t| t.local.clone()).collect();
        assert_eq!(
            locals,
            [
                root.join("nested").join("two.log"),
                root.join("one.log"),
            ]
        );
        assert_eq!(set.total_bytes, 3);
    }

    #[tokio::test]
    async fn test_scan_remote_never_leaves_destination() {
        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.insert("b", "runs/ok.txt", b"ok");
        store.insert("b", "runs/../escaped.txt", b"pwned");
        store.insert("b", "runs/../../escaped.txt", b"pwned");

        let base = TempDir::new().unwrap();
        let dest = base.path().join("dest");
        let set = scan_remote(&store, &RemotePath::new("b", "runs"), &dest)
            .await
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.tasks[0].local, dest.join("ok.txt"));

        run_tasks(&store, &set.tasks, RunOptions::default(), Arc::new(NoProgress))
            .await
            .unwrap();
        assert!(!base.path().join("escaped.txt").exists());
        assert_eq!(std::fs::read(dest.join("ok.txt")).unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_directory_round_trip_reports_total_bytes() {
        let src = tree();
        let store = MemoryStore::new();
        store.insert_bucket("b");

        let set = scan_local(src.path(), &RemotePath::new("b", "copy/")).unwrap();
        let counter = Arc::new(AtomicU64::new(0));
        let mut mock = MockProgress::new();
        let seen = counter.clone();
        mock.expect_advance().returning(move |n| {
            seen.fetch_add(n, Ordering::SeqCst);
        });
        let report = run_tasks(&store, &set.tasks, RunOptions::default(), Arc::new(mock))
            .await
            .unwrap();
        assert_eq!(report.transferred, 4);
        assert_eq!(counter.load(Ordering::SeqCst), set.total_bytes);

        let dest = TempDir::new().unwrap();
        let set = scan_remote(&store, &RemotePath::new("b", "copy/"), dest.path())
            .await
            .unwrap();
        run_tasks(&store, &set.tasks, RunOptions::default(), Arc::new(NoProgress))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.path().join("sub").join("deep").join("d.txt")).unwrap(),
            "dddd"
        );
    }

    #[tokio::test]
    async fn test_run_tasks_aborts_on_first_failure() {
        let src = tree();
        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.fail_key("a.txt");

        let set = scan_local(src.path(), &RemotePath::new("b", "")).unwrap();
        let err = run_tasks(&store, &set.tasks, RunOptions::default(), Arc::new(NoProgress))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_run_tasks_continue_on_error() {
        let src = tree();
        let store = MemoryStore::new();
        store.insert_bucket("b");
        store.fail_key("a.txt");

        let set = scan_local(src.path(), &RemotePath::new("b", "")).unwrap();
        let options = RunOptions {
            continue_on_error: true,
        };
        let report = run_tasks(&store, &set.tasks, options, Arc::new(NoProgress))
            .await
            .unwrap();
        assert_eq!(report.transferred, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].destination, "b/a.txt");
        assert!(!report.is_success());
    }
}
