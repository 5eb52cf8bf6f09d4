//! Progress spinner on stderr using indicatif.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// A spinner showing the sweep point currently being measured.
pub struct SweepProgress {
    bar: ProgressBar,
}

impl SweepProgress {
    /// Create a spinner; a disabled one draws nothing.
    pub fn new(enabled: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if !enabled {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return Self { bar };
        }
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }

    pub fn update(&self, msg: &str) {
        self.bar.set_message(msg.to_string());
    }

    /// Finish and clear the spinner.
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Callback for [`crate::sweep::run_configuration`].
    pub fn callback(&self) -> impl Fn(&str) + '_ {
        move |msg: &str| self.update(msg)
    }
}
