//! Progress bar for transfers
//!
//! One bar spans a whole command: the engine announces the byte total once
//! and then reports bytes as they move.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use nimbus_core::Progress;

use super::OutputConfig;

const TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec} ({eta})";

/// indicatif-backed progress sink
///
/// In quiet, JSON or no-progress mode the bar stays hidden.
#[derive(Debug)]
pub struct TransferProgress {
    bar: ProgressBar,
}

impl TransferProgress {
    pub fn new(config: &OutputConfig, label: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▶ ");
            bar.set_style(style);
            bar.set_message(label.to_string());
            bar
        };
        Self { bar }
    }

    /// Shared handle for the engine
    pub fn shared(config: &OutputConfig, label: &str) -> Arc<Self> {
        Arc::new(Self::new(config, label))
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        !self.bar.is_hidden()
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl Progress for TransferProgress {
    fn begin(&self, total_bytes: u64) {
        self.bar.set_length(total_bytes);
        self.bar.set_position(0);
    }

    fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
