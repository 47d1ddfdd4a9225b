//! Invokes the external audio-metadata probe (an ffprobe-compatible binary)
//! against a located file and parses its JSON output.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::process::Command;

use crate::models::AudioAttributes;

#[derive(Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    codec_long_name: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
    channel_layout: Option<String>,
    bits_per_raw_sample: Option<String>,
    bits_per_sample: Option<u32>,
    max_bit_rate: Option<String>,
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `<probe_tool> -v quiet -print_format json -show_format -show_streams <path>`
/// and extracts the first audio stream's attributes.
pub async fn probe(probe_tool: &str, path: &Path) -> Result<AudioAttributes> {
    let invocation = Command::new(probe_tool)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, invocation)
        .await
        .context("audio probe timed out")?
        .context("failed to launch audio probe")?;

    if !output.status.success() {
        anyhow::bail!(
            "audio probe exited with status {:?}",
            output.status.code()
        );
    }

    let parsed: ProbeOutput =
        serde_json::from_slice(&output.stdout).context("failed to parse audio probe output")?;

    let audio_stream = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let file_size_bytes = parsed.format.size.as_deref().and_then(|s| s.parse().ok());
    let duration_seconds = parsed.format.duration.as_deref().and_then(|s| s.parse().ok());
    let bitrate_avg_bps = parsed.format.bit_rate.as_deref().and_then(|s| s.parse().ok());
    let file_format = parsed
        .format
        .format_name
        .as_deref()
        .and_then(|s| s.split(',').next())
        .map(str::to_string);

    let Some(stream) = audio_stream else {
        return Ok(AudioAttributes {
            file_format,
            file_size_bytes,
            duration_seconds,
            bitrate_avg_bps,
            ..Default::default()
        });
    };

    let bit_depth = stream
        .bits_per_raw_sample
        .as_deref()
        .and_then(|s| s.parse().ok())
        .or(stream.bits_per_sample);

    let bitrate_max_bps = stream
        .max_bit_rate
        .as_deref()
        .and_then(|s| s.parse().ok())
        .or(bitrate_avg_bps);

    Ok(AudioAttributes {
        file_format,
        codec_name: stream.codec_name,
        codec_long_name: stream.codec_long_name,
        sample_rate_hz: stream.sample_rate.as_deref().and_then(|s| s.parse().ok()),
        channels: stream.channels,
        channel_layout: stream.channel_layout,
        bit_depth,
        bitrate_avg_bps,
        bitrate_max_bps,
        duration_seconds,
        file_size_bytes,
    })
}
