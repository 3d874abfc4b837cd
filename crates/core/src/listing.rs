//! Directory-style listings of buckets and prefixes

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::Result;
use crate::path::RemotePath;
use crate::traits::{ObjectInfo, ObjectStore, list_all};

/// One row of a listing, named relative to the listed prefix
#[derive(Debug, Clone, Serialize)]
pub struct ListEntry {
    /// Base name; directories end in `/`
    pub name: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<jiff::Timestamp>,
}

impl ListEntry {
    fn from_object(object: ObjectInfo, prefix: &str) -> Self {
        let relative = object.key.strip_prefix(prefix).unwrap_or(&object.key);
        let name = if object.is_dir && !relative.ends_with('/') {
            format!("{relative}/")
        } else {
            relative.to_string()
        };
        Self {
            name,
            is_dir: object.is_dir,
            size_bytes: object.size_bytes,
            size_human: object.size_human,
            last_modified: object.last_modified,
        }
    }
}

/// Directories first, then names compared case-insensitively
pub fn listing_order(a: &ListEntry, b: &ListEntry) -> Ordering {
    b.is_dir
        .cmp(&a.is_dir)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// What `ls` resolved its argument to
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Listing {
    Buckets { entries: Vec<ListEntry> },
    Prefix {
        bucket: String,
        prefix: String,
        entries: Vec<ListEntry>,
    },
}

impl Listing {
    pub fn entries(&self) -> &[ListEntry] {
        match self {
            Listing::Buckets { entries } | Listing::Prefix { entries, .. } => entries,
        }
    }
}

/// List buckets for an empty or `/` argument, otherwise one prefix level
pub async fn list(store: &dyn ObjectStore, target: &str) -> Result<Listing> {
    let target = target.trim();
    if target.is_empty() || target == "/" {
        let mut entries: Vec<_> = store
            .list_buckets()
            .await?
            .into_iter()
            .map(|b| {
                let mut entry = ListEntry::from_object(b, "");
                entry.name = entry.name.trim_end_matches('/').to_string();
                entry
            })
            .collect();
        entries.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        return Ok(Listing::Buckets { entries });
    }

    let remote = RemotePath::parse(target)?;
    let prefix = remote.dir_prefix();
    let objects = list_all(store, &remote.with_key(prefix.clone()), false).await?;

    let mut entries: Vec<_> = objects
        .into_iter()
        .filter(|o| o.key != prefix)
        .map(|o| ListEntry::from_object(o, &prefix))
        .collect();
    entries.sort_by(listing_order);

    Ok(Listing::Prefix {
        bucket: remote.bucket,
        prefix,
        entries,
    })
}
