//! stat command - Show object metadata
//!
//! Displays detailed metadata information about an object.

use std::collections::BTreeMap;

use clap::Args;
use nimbus_core::{Error, ObjectInfo, ObjectStore, RemotePath};
use serde::Serialize;

use super::fail;
use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Show object metadata
#[derive(Args, Debug)]
pub struct StatArgs {
    /// Object path (bucket/key)
    pub path: String,
}

#[derive(Debug, Serialize)]
struct StatOutput {
    bucket: String,
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_modified: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_human: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,
}

impl StatOutput {
    fn new(path: &RemotePath, info: ObjectInfo) -> Self {
        Self {
            bucket: path.bucket.clone(),
            key: path.key.clone(),
            last_modified: info.last_modified.map(|t| t.to_string()),
            size_bytes: info.size_bytes,
            size_human: info.size_human,
            etag: info.etag,
            content_type: info.content_type,
            storage_class: info.storage_class,
            metadata: info.metadata.into_iter().collect(),
        }
    }

    fn lines(&self) -> Vec<String> {
        let dash = || "-".to_string();
        let mut lines = vec![
            format!("Bucket       : {}", self.bucket),
            format!("Key          : {}", self.key),
            format!(
                "Size         : {} ({} bytes)",
                self.size_human.clone().unwrap_or_else(dash),
                self.size_bytes.unwrap_or(0)
            ),
            format!(
                "Last modified: {}",
                self.last_modified.clone().unwrap_or_else(dash)
            ),
            format!("ETag         : {}", self.etag.clone().unwrap_or_else(dash)),
            format!(
                "Content type : {}",
                self.content_type.clone().unwrap_or_else(dash)
            ),
        ];
        if let Some(class) = &self.storage_class {
            lines.push(format!("Storage class: {class}"));
        }
        if !self.metadata.is_empty() {
            lines.push("Metadata     :".to_string());
            lines.extend(self.metadata.iter().map(|(k, v)| format!("  {k}: {v}")));
        }
        lines
    }
}

/// Execute the stat command
pub async fn execute(args: StatArgs, store: &dyn ObjectStore, formatter: &Formatter) -> ExitCode {
    let path = match RemotePath::parse(&args.path) {
        Ok(path) if !path.key.is_empty() => path,
        Ok(_) => {
            let e = Error::Usage(format!("'{}' is missing an object key", args.path));
            return fail(formatter, "Invalid path", &e);
        }
        Err(e) => return fail(formatter, "Invalid path", &e),
    };

    let info = match store.head_object(&path).await {
        Ok(info) => info,
        Err(e) => return fail(formatter, "Failed to stat", &e),
    };

    let output = StatOutput::new(&path, info);
    if formatter.is_json() {
        formatter.json(&output);
    } else {
        for line in output.lines() {
            formatter.println(&line);
        }
    }
    ExitCode::Success
}
