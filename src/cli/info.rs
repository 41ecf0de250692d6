use anyhow::Result;
use indicatif::MultiProgress;
use serde::Serialize;

use super::command::{Cli, InfoArgs};
use super::progress::create_progress_bar;
use crate::input::InputReader;
use crate::timestamp::granule_str;
use oggtimeline::container::PageReader;
use oggtimeline::process::{Analysis, CorrectOptions, analyze};

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Analyzing track {} of {}",
        args.track,
        args.input.display()
    );

    let input = InputReader::single(&args.input)?;
    let pb = multi
        .map(|multi| create_progress_bar(multi, input.total_len(), "analyzing"))
        .transpose()?;
    let mut reader = PageReader::new(input.with_progress(pb.clone()));

    let options = CorrectOptions {
        serial: args.track,
        fail_level: cli.fail_level(),
    };
    let analysis = analyze(&mut reader, &options)?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let report = TrackReport::new(args.track, &analysis, reader.pages_read());
    print!("{}", serde_yaml_ng::to_string(&report)?);

    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TrackReport {
    track: u32,
    codec: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    declared_channels: Option<u8>,
    channels: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    vad_threshold: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta_track: Option<u32>,
    initial_offset: u64,
    pages: u64,
    packets: usize,
    silent_packets: usize,
    blocks: usize,
    silent_blocks: usize,
    pauses: u32,
    dropped_packets: u64,
    synthesized_frames: u64,
    trimmed_frames: u64,
    final_granule: u64,
    duration: String,
}

impl TrackReport {
    fn new(track: u32, analysis: &Analysis, pages: u64) -> Self {
        let params = &analysis.params;
        let stats = &analysis.stats;

        Self {
            track,
            codec: params.codec.to_string(),
            sample_rate: params.sample_rate,
            declared_channels: params.declared_channels,
            channels: analysis.packets.max_channels,
            vad_threshold: params.vad_threshold,
            meta_track: params.meta_serial,
            initial_offset: params.initial_offset,
            pages,
            packets: analysis.packets.records.len(),
            silent_packets: analysis.silent_records(),
            blocks: analysis.blocks.len(),
            silent_blocks: analysis.silent_blocks(),
            pauses: analysis.packets.pauses,
            dropped_packets: stats.dropped,
            synthesized_frames: stats.synthesized,
            trimmed_frames: stats.trimmed,
            final_granule: stats.final_granule,
            duration: granule_str(stats.final_granule, params.rate_family()),
        }
    }
}
