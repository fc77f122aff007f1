//! Upload progress bar

use anyhow::Result;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

/// Byte progress bar drawn on stderr
pub fn upload_bar() -> Result<ProgressBar> {
    let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
    bar.set_style(
        ProgressStyle::default_bar()
            .template(TEMPLATE)?
            .progress_chars("#>-"),
    );
    Ok(bar)
}

/// Bar that tracks state without drawing
pub fn hidden_bar() -> ProgressBar {
    ProgressBar::hidden()
}
