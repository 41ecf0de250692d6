use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// A byte-count bar when the input size is known, a spinner otherwise.
pub fn create_progress_bar(
    multi: &MultiProgress,
    total_bytes: Option<u64>,
    message: &'static str,
) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_bytes {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(
            "{bar:40.cyan/blue} {bytes}/{total_bytes} ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
        )?);
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {bytes}\n{msg} | elapsed: {elapsed_precise}",
        )?);
        pb
    };

    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message(message);
    Ok(pb)
}
