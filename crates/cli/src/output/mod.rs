//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles progress bars and colored output.

mod formatter;
mod progress;

pub use formatter::Formatter;
pub use progress::TransferProgress;

use nimbus_core::Config;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Fold in the defaults stored in the configuration file
    ///
    /// Flags can only switch features off, so a set flag always wins.
    pub fn with_defaults(mut self, config: &Config) -> Self {
        self.json |= config.defaults.output == "json";
        self.no_color |= config.defaults.color == "never";
        self.no_progress |= !config.defaults.progress;
        if config.defaults.color == "always" && !self.no_color {
            console::set_colors_enabled(true);
            console::set_colors_enabled_stderr(true);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_defaults_applies_config() {
        let mut config = Config::default();
        config.defaults.output = "json".into();
        config.defaults.progress = false;

        let output = OutputConfig::default().with_defaults(&config);
        assert!(output.json);
        assert!(output.no_progress);
        assert!(!output.no_color);
    }

    #[test]
    fn test_flags_survive_defaults() {
        let flags = OutputConfig {
            no_color: true,
            ..Default::default()
        };
        let output = flags.with_defaults(&Config::default());
        assert!(output.no_color);
        assert!(!output.json);
    }
}
