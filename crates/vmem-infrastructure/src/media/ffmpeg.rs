//! Local media toolkit over ffmpeg/ffprobe subprocesses: probing, audio
//! stripping, chunk cutting, frame sampling, thumbnail resizing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use vmem_domain::entities::{MediaInfo, SampledFrame};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::MediaToolkit;

/// ffmpeg/ffprobe-backed [`MediaToolkit`].
pub struct FfmpegToolkit {
    ffmpeg_bin: String,
    ffprobe_bin: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    duration: Option<String>,
}

impl FfmpegToolkit {
    pub fn new(ffmpeg_bin: impl Into<String>, ffprobe_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            ffprobe_bin: ffprobe_bin.into(),
        }
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        debug!(bin = %self.ffmpeg_bin, ?args, "running ffmpeg");
        let output = Command::new(&self.ffmpeg_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::media_with_source("could not spawn ffmpeg", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::media(format!(
                "ffmpeg failed ({}): {}",
                output.status,
                last_lines(&stderr, 4)
            )));
        }
        Ok(())
    }
}

/// ffmpeg stderr is noisy; errors keep only the tail.
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join(" ")
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let output = Command::new(&self.ffprobe_bin)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| Error::media_with_source("could not spawn ffprobe", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::media(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                stderr.trim()
            )));
        }

        let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::media(format!("unparseable ffprobe output: {e}")))?;

        let duration_seconds = probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);
        let (width, height) = probe
            .streams
            .iter()
            .find_map(|s| s.width.zip(s.height))
            .unwrap_or((0, 0));
        let file_size_bytes = tokio::fs::metadata(path)
            .await
            .map(|m| m.len() as i64)
            .unwrap_or(0);

        Ok(MediaInfo {
            duration_seconds,
            width,
            height,
            file_size_bytes,
        })
    }

    async fn strip_to_audio(&self, path: &Path) -> Result<PathBuf> {
        let parent = path.parent().unwrap_or(Path::new("."));
        let output = parent.join(format!("_audio_{}.m4a", std::process::id()));
        let input = path.display().to_string();
        let out = output.display().to_string();

        // Attempt 1: stream copy (instant, no re-encode).
        let copy_args: Vec<String> = ["-y", "-i", input.as_str(), "-vn", "-acodec", "copy", out.as_str()]
            .iter()
            .map(|s| (*s).to_owned())
            .collect();

        if self.run_ffmpeg(&copy_args).await.is_ok() && file_has_bytes(&output).await {
            return Ok(output);
        }

        // Attempt 2: re-encode to AAC (handles Opus/Vorbis sources that
        // cannot live in an m4a container).
        warn!(path = %path.display(), "stream copy failed, re-encoding to AAC");
        let encode_args: Vec<String> = [
            "-y", "-i", input.as_str(), "-vn", "-acodec", "aac", "-b:a", "128k", out.as_str(),
        ]
        .iter()
        .map(|s| (*s).to_owned())
        .collect();
        self.run_ffmpeg(&encode_args).await?;

        Ok(output)
    }

    async fn cut_audio_chunk(
        &self,
        path: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        chunk_index: usize,
    ) -> Result<PathBuf> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("m4a");
        let chunk = path
            .with_file_name(format!("{stem}_chunk{chunk_index}.{ext}"));

        let args: Vec<String> = vec![
            "-y".to_owned(),
            "-i".to_owned(),
            path.display().to_string(),
            "-ss".to_owned(),
            start_seconds.to_string(),
            "-t".to_owned(),
            duration_seconds.to_string(),
            "-acodec".to_owned(),
            "copy".to_owned(),
            chunk.display().to_string(),
        ];
        self.run_ffmpeg(&args).await?;
        Ok(chunk)
    }

    async fn sample_frames(
        &self,
        path: &Path,
        interval_seconds: f64,
        max_frames: usize,
    ) -> Result<Vec<SampledFrame>> {
        let info = self.probe(path).await?;
        if info.duration_seconds <= 0.0 {
            return Err(Error::media(format!(
                "could not determine duration of {}",
                path.display()
            )));
        }

        // Widen the interval for long media so the cap holds.
        let mut interval = interval_seconds.max(1.0);
        if info.duration_seconds / interval > max_frames as f64 {
            interval = info.duration_seconds / max_frames as f64;
        }

        let workdir = tempfile::tempdir()
            .map_err(|e| Error::media_with_source("create frame workdir", e))?;

        let mut frames = Vec::new();
        let mut timestamp = 0.0;
        while timestamp < info.duration_seconds && frames.len() < max_frames {
            let out = workdir.path().join(format!("frame_{}.jpg", frames.len()));
            let args: Vec<String> = vec![
                "-y".to_owned(),
                "-ss".to_owned(),
                timestamp.to_string(),
                "-i".to_owned(),
                path.display().to_string(),
                "-frames:v".to_owned(),
                "1".to_owned(),
                // Downscale anything above 720p-ish widths for the vision model.
                "-vf".to_owned(),
                "scale='min(1280,iw)':-2".to_owned(),
                "-q:v".to_owned(),
                "3".to_owned(),
                out.display().to_string(),
            ];

            match self.run_ffmpeg(&args).await {
                Ok(()) => match tokio::fs::read(&out).await {
                    Ok(jpeg) if !jpeg.is_empty() => frames.push(SampledFrame { timestamp, jpeg }),
                    _ => warn!(timestamp, "frame decode produced no bytes, skipping"),
                },
                // Seeks past the end near the tail are not fatal.
                Err(e) => warn!(timestamp, error = %e, "frame extraction failed, skipping"),
            }

            timestamp += interval;
        }

        debug!(
            count = frames.len(),
            duration = info.duration_seconds,
            "sampled frames"
        );
        Ok(frames)
    }

    async fn make_thumbnail(&self, jpeg: &[u8], target_width: u32) -> Result<Vec<u8>> {
        let workdir = tempfile::tempdir()
            .map_err(|e| Error::media_with_source("create thumbnail workdir", e))?;
        let input = workdir.path().join("in.jpg");
        let output = workdir.path().join("out.jpg");
        tokio::fs::write(&input, jpeg)
            .await
            .map_err(|e| Error::media_with_source("write thumbnail input", e))?;

        let args: Vec<String> = vec![
            "-y".to_owned(),
            "-i".to_owned(),
            input.display().to_string(),
            "-vf".to_owned(),
            format!("scale={target_width}:-2"),
            "-q:v".to_owned(),
            "5".to_owned(),
            output.display().to_string(),
        ];
        self.run_ffmpeg(&args).await?;

        tokio::fs::read(&output)
            .await
            .map_err(|e| Error::media_with_source("read thumbnail output", e))
    }
}

async fn file_has_bytes(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.len() > 0).unwrap_or(false)
}
