//! Task progress rendering.

use indicatif::{ProgressBar, ProgressStyle};
use reconcile::{Task, TaskProgress, TaskState};
use std::time::Duration;

/// Spinner showing the latest task status line.
pub struct TaskSpinner {
    bar: ProgressBar,
}

impl TaskSpinner {
    /// A spinner on stderr; hidden when `quiet`.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style);
        }
        Self { bar }
    }
}

impl TaskProgress for TaskSpinner {
    fn update(&self, task: &Task) {
        self.bar.enable_steady_tick(Duration::from_millis(120));
        self.bar.set_message(task.status_line());
    }

    fn finish(&self, task: &Task) {
        match task.state {
            TaskState::Success => self.bar.finish_and_clear(),
            TaskState::Pending => self
                .bar
                .abandon_with_message(format!("{} (scheduled)", task.status_line())),
            TaskState::Failure | TaskState::Running => {
                self.bar.abandon_with_message(task.status_line());
            }
        }
    }
}

impl Drop for TaskSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
