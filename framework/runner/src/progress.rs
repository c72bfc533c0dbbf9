use indicatif::{ProgressBar, ProgressStyle};

/// Displays a progress bar while the suite is running to show the user how many scenarios are left.
pub(crate) fn start_progress(total: usize, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] {pos}/{len} scenarios [{elapsed_precise}] {msg}",
    )
    .map(|style| style.progress_chars("#>-"))
    .unwrap_or_else(|e| {
        log::warn!("Failed to set progress style: {e}");
        ProgressStyle::default_bar()
    });
    pb.set_style(style);

    pb
}
