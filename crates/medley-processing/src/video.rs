//! Video probing and transcoding via external ffprobe/ffmpeg subprocesses.
//!
//! The tools are invoked with explicit argument lists and yield structured
//! output (ffprobe JSON, ffmpeg `-progress` key/value lines). A non-zero exit
//! surfaces stderr as the error.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use medley_core::models::job::TargetResolution;

/// Structured metadata parsed from ffprobe output.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    pub duration_seconds: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub bitrate: Option<u64>,
    pub frame_rate: Option<f32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u32>,
}

/// Validate that a path doesn't contain shell metacharacters or traversal
/// sequences before handing it to a subprocess.
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }
    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }
    Ok(())
}

/// External media tool wrapper (ffprobe + ffmpeg).
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegTool {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Result<Self> {
        validate_path(&ffmpeg_path).context("Invalid ffmpeg path")?;
        validate_path(&ffprobe_path).context("Invalid ffprobe path")?;
        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }

    /// Probe a media file for duration, codecs, dimensions, and audio layout.
    /// Works for both video and audio inputs.
    #[tracing::instrument(skip(self), fields(tool = "ffprobe"))]
    pub async fn probe(&self, input: &Path) -> Result<VideoProbe> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(input)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let probe_data: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        parse_probe_output(&probe_data)
    }

    /// Transcode to one target resolution: letterboxed to the target aspect
    /// ratio, H.264/AAC at the target bitrates, faststart-optimized.
    /// Progress milestones are reported through `on_progress` as 0-100,
    /// estimated from ffmpeg's time-elapsed output against `duration_seconds`.
    #[tracing::instrument(skip(self, on_progress), fields(tool = "ffmpeg", target = %resolution.name))]
    pub async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        resolution: &TargetResolution,
        duration_seconds: f64,
        on_progress: impl Fn(u8) + Send,
    ) -> Result<()> {
        let args = build_transcode_args(input, output, resolution);

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("ffmpeg stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read ffmpeg progress")? {
            if let Some(percent) = parse_progress_line(&line, duration_seconds) {
                on_progress(percent);
            }
        }

        let status = child.wait_with_output().await.context("ffmpeg did not exit")?;
        if !status.status.success() {
            return Err(anyhow!(
                "ffmpeg transcode failed: {}",
                String::from_utf8_lossy(&status.stderr)
            ));
        }
        on_progress(100);
        Ok(())
    }

    /// Extract a single poster frame at `offset_seconds`.
    #[tracing::instrument(skip(self), fields(tool = "ffmpeg"))]
    pub async fn extract_poster(
        &self,
        input: &Path,
        output: &Path,
        offset_seconds: f64,
    ) -> Result<()> {
        let output_arg = path_arg(output)?;
        let run = Command::new(&self.ffmpeg_path)
            .args(["-ss", &format_seconds(offset_seconds), "-i"])
            .arg(input)
            .args(["-frames:v", "1", "-q:v", "2", "-y"])
            .arg(output_arg)
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !run.status.success() {
            return Err(anyhow!(
                "ffmpeg poster extraction failed: {}",
                String::from_utf8_lossy(&run.stderr)
            ));
        }
        Ok(())
    }

    /// Trim a fixed-duration clip starting at `start_offset_seconds` for
    /// quick-look previews. Streams are copied, not re-encoded.
    #[tracing::instrument(skip(self), fields(tool = "ffmpeg"))]
    pub async fn preview_clip(
        &self,
        input: &Path,
        output: &Path,
        start_offset_seconds: f64,
        duration_seconds: f64,
    ) -> Result<()> {
        let output_arg = path_arg(output)?;
        let run = Command::new(&self.ffmpeg_path)
            .args(["-ss", &format_seconds(start_offset_seconds), "-i"])
            .arg(input)
            .args([
                "-t",
                &format_seconds(duration_seconds),
                "-c",
                "copy",
                "-movflags",
                "+faststart",
                "-y",
            ])
            .arg(output_arg)
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !run.status.success() {
            return Err(anyhow!(
                "ffmpeg preview clip failed: {}",
                String::from_utf8_lossy(&run.stderr)
            ));
        }
        Ok(())
    }
}

fn path_arg(path: &Path) -> Result<PathBuf> {
    validate_path(&path.to_string_lossy())?;
    Ok(path.to_path_buf())
}

fn format_seconds(seconds: f64) -> String {
    format!("{:.3}", seconds.max(0.0))
}

/// Argument list for one transcode target. The scale/pad filter letterboxes
/// to the target aspect ratio without distortion.
pub fn build_transcode_args(
    input: &Path,
    output: &Path,
    resolution: &TargetResolution,
) -> Vec<String> {
    let filter = format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
        w = resolution.width,
        h = resolution.height
    );
    vec![
        "-i".to_string(),
        input.to_string_lossy().to_string(),
        "-vf".to_string(),
        filter,
        "-c:v".to_string(),
        "libx264".to_string(),
        "-b:v".to_string(),
        format!("{}k", resolution.video_bitrate_kbps),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        format!("{}k", resolution.audio_bitrate_kbps),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-progress".to_string(),
        "pipe:1".to_string(),
        "-nostats".to_string(),
        "-y".to_string(),
        output.to_string_lossy().to_string(),
    ]
}

/// Parse one `-progress pipe:1` line into a 0-99 percentage relative to the
/// source duration. (100 is reported only on successful exit.) ffmpeg's
/// `out_time_ms` is in microseconds despite the name.
pub fn parse_progress_line(line: &str, duration_seconds: f64) -> Option<u8> {
    if duration_seconds <= 0.0 {
        return None;
    }
    let micros: i64 = line.strip_prefix("out_time_ms=")?.trim().parse().ok()?;
    if micros < 0 {
        return None;
    }
    let elapsed = micros as f64 / 1_000_000.0;
    let percent = (elapsed / duration_seconds * 100.0).floor();
    Some(percent.clamp(0.0, 99.0) as u8)
}

/// Parse ffprobe's JSON document into a [`VideoProbe`].
pub fn parse_probe_output(probe_data: &serde_json::Value) -> Result<VideoProbe> {
    let format = &probe_data["format"];
    let empty = Vec::new();
    let streams = probe_data["streams"].as_array().unwrap_or(&empty);

    let video_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"));
    let audio_stream = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"));

    let duration_seconds = format["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            video_stream
                .or(audio_stream)?
                .get("duration")?
                .as_str()?
                .parse()
                .ok()
        })
        .ok_or_else(|| anyhow!("Could not parse duration"))?;

    let width = video_stream.and_then(|s| s["width"].as_u64()).map(|w| w as u32);
    let height = video_stream
        .and_then(|s| s["height"].as_u64())
        .map(|h| h as u32);

    let video_codec = video_stream
        .and_then(|s| s["codec_name"].as_str())
        .map(str::to_string);
    let audio_codec = audio_stream
        .and_then(|s| s["codec_name"].as_str())
        .map(str::to_string);

    let bitrate = format["bit_rate"].as_str().and_then(|b| b.parse().ok());

    let frame_rate = video_stream
        .and_then(|s| s["r_frame_rate"].as_str())
        .and_then(|r| {
            let (num, den) = r.split_once('/')?;
            let num: f32 = num.parse().ok()?;
            let den: f32 = den.parse().ok()?;
            if den != 0.0 {
                Some(num / den)
            } else {
                None
            }
        });

    let sample_rate = audio_stream
        .and_then(|s| s["sample_rate"].as_str())
        .and_then(|r| r.parse().ok());
    let channels = audio_stream
        .and_then(|s| s["channels"].as_u64())
        .map(|c| c as u32);

    Ok(VideoProbe {
        duration_seconds,
        width,
        height,
        video_codec,
        audio_codec,
        bitrate,
        frame_rate,
        sample_rate,
        channels,
    })
}
