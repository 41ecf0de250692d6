use std::fs::File;
use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use indicatif::MultiProgress;

use super::command::{Cli, CorrectArgs};
use super::progress::create_progress_bar;
use crate::input::InputReader;
use crate::timestamp::granule_str;
use oggtimeline::process::{CorrectOptions, correct_track};
use oggtimeline::utils::timing::RateFamily;

pub fn cmd_correct(args: &CorrectArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Correcting track {} of {}",
        args.track,
        args.input.display()
    );

    let input = InputReader::doubled(&args.input, args.buffer_input)?;
    if input.is_pipe() && !args.buffer_input {
        log::debug!("Reading both copies from stdin");
    }

    let pb = multi
        .map(|multi| create_progress_bar(multi, input.total_len(), "correcting"))
        .transpose()?;
    let input = input.with_progress(pb.clone());

    let output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };

    let options = CorrectOptions {
        serial: args.track,
        fail_level: cli.fail_level(),
    };
    let summary = correct_track(input, output, &options)?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let rate = RateFamily::from_sample_rate(summary.sample_rate);
    log::info!(
        "{} {} Hz, {} ch: {} pages read, {} written, corrected length {}",
        summary.codec,
        rate.nominal_rate(),
        summary.channels,
        summary.pages_read,
        summary.pages_written,
        granule_str(summary.correction.final_granule, rate)
    );
    if summary.blocked_waits > 0 {
        log::debug!("Output blocked {} times", summary.blocked_waits);
    }

    Ok(())
}
