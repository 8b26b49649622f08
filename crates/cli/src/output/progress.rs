//! Progress bar for batch object transfers
//!
//! Counts objects, not bytes: a batch finishes when every object is done.

use super::OutputConfig;

/// Progress bar wrapper
///
/// In quiet or JSON mode, or with --no-progress, progress is suppressed.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a progress bar over `total` objects
    pub fn new(config: &OutputConfig, total: u64, action: &str) -> Self {
        if config.quiet || config.json || config.no_progress {
            return Self { bar: None };
        }

        let bar = indicatif::ProgressBar::new(total);
        let style = indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} objects")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
            .progress_chars("#>-");
        bar.set_style(style);
        bar.set_message(action.to_string());
        Self { bar: Some(bar) }
    }

    /// Record one finished object
    pub fn inc(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
