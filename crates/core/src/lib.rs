//! nimbus-core: transfer and synchronization engine for the nimbus CLI
//!
//! This crate provides the core functionality for nimbus, including:
//! - Configuration and credential resolution
//! - Path parsing and copy classification
//! - ObjectStore trait for S3 operations
//! - Single and recursive transfers with progress and integrity checks
//! - One-way synchronization, listing, removal and bucket creation
//!
//! This crate is independent of any specific S3 SDK; the engine runs
//! against `&dyn ObjectStore` so it can be exercised without a server.

pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod copy;
pub mod credential;
pub mod error;
pub mod fingerprint;
pub mod listing;
pub mod path;
pub mod progress;
pub mod remove;
pub mod sync;
pub mod traits;
pub mod transfer;

#[cfg(test)]
pub(crate) mod memory;

pub use aggregate::{RunOptions, RunReport, TaskFailure};
pub use bucket::{BucketCreation, make_bucket};
pub use config::{Config, ConfigManager};
pub use copy::{CopyReport, copy};
pub use credential::{Credential, StoreEndpoint};
pub use error::{Error, Result};
pub use listing::{ListEntry, Listing};
pub use path::{CopyPlan, RemotePath, classify};
pub use progress::{NoProgress, Progress};
pub use remove::{RemoveReport, remove};
pub use sync::{SyncDirection, SyncOptions, SyncReport};
pub use traits::{
    BucketAcl, BucketOptions, ListOptions, ListResult, ObjectInfo, ObjectStore, PresignMethod,
    UploadBody,
};
