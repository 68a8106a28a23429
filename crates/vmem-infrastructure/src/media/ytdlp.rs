//! Media acquisition via yt-dlp subprocesses.
//!
//! One invocation downloads the audio track and prints a delimited
//! metadata record; a cached download (matched by the natural video id)
//! skips straight to a `--no-download` metadata probe. File names use the
//! platform id to keep paths ASCII-safe regardless of media titles.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use vmem_domain::constants::media::STATS_DESCRIPTION_CHARS;
use vmem_domain::entities::{DownloadMetadata, SourceStats};
use vmem_domain::error::{Error, Result};
use vmem_domain::ports::MediaDownloader;
use vmem_domain::utils::extract_youtube_id;

/// Metadata fields printed by yt-dlp, one `|||`-joined record.
const META_FIELDS: &[&str] = &[
    "duration",
    "title",
    "view_count",
    "like_count",
    "comment_count",
    "channel_follower_count",
    "upload_date",
    "uploader",
    "categories",
    "description",
    "id",
];

const AUDIO_EXTENSIONS: &[&str] = &["m4a", "opus", "webm"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv"];

/// yt-dlp-backed [`MediaDownloader`].
pub struct YtDlpDownloader {
    ytdlp_bin: String,
    output_dir: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(ytdlp_bin: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_bin: ytdlp_bin.into(),
            output_dir: output_dir.into(),
        }
    }

    fn output_template(&self) -> String {
        self.output_dir.join("%(id)s.%(ext)s").display().to_string()
    }

    /// Most recent already-downloaded file carrying the video id.
    fn cached_file(&self, video_id: &str, extensions: &[&str]) -> Option<PathBuf> {
        let entries = std::fs::read_dir(&self.output_dir).ok()?;
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.contains(video_id));
            let ext_matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.contains(&e));
            if stem_matches && ext_matches {
                let mtime = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                if newest.as_ref().is_none_or(|(t, _)| mtime > *t) {
                    newest = Some((mtime, path));
                }
            }
        }
        newest.map(|(_, path)| path)
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        debug!(bin = %self.ytdlp_bin, ?args, "running yt-dlp");
        let output = Command::new(&self.ytdlp_bin)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::media_with_source("could not spawn yt-dlp", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::media(format!(
                "yt-dlp failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn meta_template() -> String {
        META_FIELDS
            .iter()
            .map(|f| format!("%({f})s"))
            .collect::<Vec<_>>()
            .join("|||")
    }

    /// Probe metadata without downloading (cache hit path).
    async fn probe_metadata(&self, url: &str, cookies: Option<&Path>) -> Result<DownloadMetadata> {
        let mut args = vec![
            "--no-download".to_owned(),
            "--print".to_owned(),
            Self::meta_template(),
            "--no-playlist".to_owned(),
        ];
        push_cookies(&mut args, cookies);
        args.push(url.to_owned());

        let stdout = self.run(&args).await?;
        Ok(parse_metadata(&stdout))
    }
}

fn push_cookies(args: &mut Vec<String>, cookies: Option<&Path>) {
    if let Some(path) = cookies {
        args.push("--cookies".to_owned());
        args.push(path.display().to_string());
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn download_audio_with_metadata(
        &self,
        url: &str,
        cookies_file: Option<&Path>,
    ) -> Result<(PathBuf, DownloadMetadata)> {
        let video_id = extract_youtube_id(url);

        if let Some(id) = video_id {
            if let Some(cached) = self.cached_file(id, AUDIO_EXTENSIONS) {
                info!(path = %cached.display(), "audio already downloaded, probing metadata only");
                let metadata = self.probe_metadata(url, cookies_file).await?;
                return Ok((cached, metadata));
            }
        }

        let mut args = vec![
            "-f".to_owned(),
            "bestaudio[ext=m4a]/bestaudio".to_owned(),
            "--extract-audio".to_owned(),
            "--audio-format".to_owned(),
            "m4a".to_owned(),
            "-o".to_owned(),
            self.output_template(),
            "--no-playlist".to_owned(),
            "--print".to_owned(),
            "after_move:filepath".to_owned(),
            "--print".to_owned(),
            Self::meta_template(),
        ];
        push_cookies(&mut args, cookies_file);
        args.push(url.to_owned());

        let stdout = self.run(&args).await?;

        // The metadata record prints before the download; the final file
        // path prints after it. Scan from the end for each.
        let mut audio_path: Option<PathBuf> = None;
        let mut metadata = DownloadMetadata::default();
        for line in stdout.lines().rev() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if audio_path.is_none() && Path::new(line).exists() {
                audio_path = Some(PathBuf::from(line));
            } else if line.contains("|||") {
                metadata = parse_metadata(line);
                break;
            }
        }

        let audio_path = match audio_path {
            Some(path) => path,
            // Fallback: newest audio file carrying the id.
            None => video_id
                .and_then(|id| self.cached_file(id, AUDIO_EXTENSIONS))
                .ok_or_else(|| Error::media("could not find downloaded audio"))?,
        };

        Ok((audio_path, metadata))
    }

    async fn download_video(&self, url: &str, cookies_file: Option<&Path>) -> Result<PathBuf> {
        let video_id = extract_youtube_id(url);
        if let Some(id) = video_id {
            if let Some(cached) = self.cached_file(id, VIDEO_EXTENSIONS) {
                info!(path = %cached.display(), "video already downloaded");
                return Ok(cached);
            }
        }

        let mut args = vec![
            "-f".to_owned(),
            "best[height<=720]".to_owned(),
            "-o".to_owned(),
            self.output_template(),
            "--no-playlist".to_owned(),
            "--print".to_owned(),
            "after_move:filepath".to_owned(),
        ];
        push_cookies(&mut args, cookies_file);
        args.push(url.to_owned());

        let stdout = self.run(&args).await?;
        for line in stdout.lines().rev() {
            let line = line.trim();
            if !line.is_empty() && Path::new(line).exists() {
                return Ok(PathBuf::from(line));
            }
        }

        video_id
            .and_then(|id| self.cached_file(id, VIDEO_EXTENSIONS))
            .ok_or_else(|| Error::media("could not find downloaded video"))
    }
}

/// Parse the `|||`-joined metadata record.
fn parse_metadata(output: &str) -> DownloadMetadata {
    let Some(line) = output.lines().find(|l| l.contains("|||")) else {
        return DownloadMetadata::default();
    };
    let values: Vec<&str> = line.split("|||").collect();
    let field = |name: &str| -> &str {
        META_FIELDS
            .iter()
            .position(|f| *f == name)
            .and_then(|i| values.get(i))
            .map_or("", |v| v.trim())
    };
    let numeric = |name: &str| -> i64 {
        let v = field(name);
        if v.is_empty() || v == "NA" {
            return 0;
        }
        v.parse::<f64>().map(|f| f as i64).unwrap_or(0)
    };

    let stats = SourceStats {
        view_count: numeric("view_count"),
        like_count: numeric("like_count"),
        comment_count: numeric("comment_count"),
        subscriber_count: numeric("channel_follower_count"),
        upload_date: na_empty(field("upload_date")),
        channel: na_empty(field("uploader")),
        categories: parse_categories(field("categories")),
        description: na_empty(field("description"))
            .chars()
            .take(STATS_DESCRIPTION_CHARS)
            .collect(),
    };

    DownloadMetadata {
        duration_seconds: numeric("duration") as f64,
        title: na_empty(field("title")),
        media_id: na_empty(field("id")),
        stats: Some(stats),
    }
}

fn na_empty(value: &str) -> String {
    if value == "NA" {
        String::new()
    } else {
        value.to_owned()
    }
}

/// yt-dlp prints categories as a Python-style list string.
fn parse_categories(value: &str) -> Vec<String> {
    if value.is_empty() || value == "NA" {
        return Vec::new();
    }
    value
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(|c| c.trim().trim_matches(&['\'', '"'][..]).to_owned())
        .filter(|c| !c.is_empty())
        .collect()
}
