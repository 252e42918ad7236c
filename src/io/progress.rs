//! Progress tracking for long-running Monte Carlo and fitting loops

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::LazyLock;

static STAGE_STYLE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    let template = format!(
        "[{{elapsed_precise}}] {{msg}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}}"
    );
    ProgressStyle::default_bar()
        .template(&template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ ")
});

/// Manages one progress bar per analysis stage
///
/// A disabled manager hands out hidden bars so library code can report
/// progress unconditionally.
pub struct ProgressManager {
    multi_progress: Option<MultiProgress>,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: enabled.then(MultiProgress::new),
        }
    }

    /// Create a manager that never draws
    pub const fn hidden() -> Self {
        Self {
            multi_progress: None,
        }
    }

    /// Check whether bars are drawn
    pub const fn is_enabled(&self) -> bool {
        self.multi_progress.is_some()
    }

    /// Start a bar for a stage with `len` steps
    pub fn stage(&self, label: &str, len: usize) -> ProgressBar {
        match &self.multi_progress {
            Some(multi) => {
                let bar = multi.add(ProgressBar::new(len as u64));
                bar.set_style(STAGE_STYLE.clone());
                bar.set_message(label.to_string());
                bar
            }
            None => ProgressBar::hidden(),
        }
    }

    /// Clean up all progress displays
    pub fn finish(&self) {
        if let Some(multi) = &self.multi_progress {
            let _ = multi.clear();
        }
    }
}
