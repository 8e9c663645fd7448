//! Progress bar helpers using indicatif

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar for known-length operations.
///
/// When `visible` is false the bar is hidden, so library callers see no
/// terminal output unless they ask for it.
pub fn create_progress_bar(len: u64, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("   {msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) [{eta}]")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a progress bar with a success message
pub fn finish_with_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("[OK] {}", message));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_bar_when_not_visible() {
        let pb = create_progress_bar(10, "pairs", false);
        assert!(pb.is_hidden());
        pb.inc(3);
        finish_with_success(&pb, "done");
        assert!(pb.is_finished());
    }
}
