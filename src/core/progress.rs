//! Terminal progress for the per-template phase, drawn with indicatif.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
        .expect("valid template")
        .progress_chars("=> ")
}

/// Counts finished templates; shared by clone across rayon workers.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
    done: Arc<AtomicUsize>,
}

impl ProgressTracker {
    /// A bar drawn on stderr.
    pub fn new(total: usize, message: &str) -> Self {
        let bar = ProgressBar::new(total as u64)
            .with_style(bar_style())
            .with_message(message.to_string());
        Self::wrap(bar)
    }

    /// A tracker that counts without drawing.
    pub fn hidden(total: usize) -> Self {
        Self::wrap(ProgressBar::with_draw_target(
            Some(total as u64),
            ProgressDrawTarget::hidden(),
        ))
    }

    /// Drawn only when stderr is a terminal and `quiet` is off.
    pub fn for_terminal(total: usize, message: &str, quiet: bool) -> Self {
        if quiet || !std::io::stderr().is_terminal() {
            Self::hidden(total)
        } else {
            Self::new(total, message)
        }
    }

    fn wrap(bar: ProgressBar) -> Self {
        Self {
            bar,
            done: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn inc(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.bar.inc(1);
    }

    /// Callback form for [`crate::analyzers::batch::BatchAnalyzer::with_progress`].
    pub fn callback(&self) -> impl Fn(usize, usize) + Send + Sync + 'static {
        let tracker = self.clone();
        move |_, _| tracker.inc()
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    pub fn count(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::batch::BatchAnalyzer;
    use crate::config::Config;
    use crate::core::TemplateInput;

    #[test]
    fn test_hidden_tracker_counts() {
        let tracker = ProgressTracker::hidden(3);
        tracker.inc();
        tracker.inc();
        assert_eq!(tracker.count(), 2);
        tracker.finish_and_clear();
    }

    #[test]
    fn test_quiet_tracker_is_hidden() {
        let tracker = ProgressTracker::for_terminal(2, "Analyzing", true);
        assert!(tracker.bar.is_hidden());
    }

    #[test]
    fn test_callback_drives_from_batch() {
        let config = Config::default();
        let inputs: Vec<TemplateInput> = (0..12)
            .map(|i| TemplateInput::from_content(format!("t{i}.twig"), "{{ x }}"))
            .collect();
        let tracker = ProgressTracker::hidden(inputs.len());
        BatchAnalyzer::new(&config)
            .with_progress(tracker.callback())
            .analyze(&inputs);
        assert_eq!(tracker.count(), 12);
    }

    #[test]
    fn test_style_is_valid() {
        let _ = bar_style();
    }
}
