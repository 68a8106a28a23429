//! Media subprocess adapters (yt-dlp, ffmpeg).

pub mod ffmpeg;
pub mod ytdlp;

pub use ffmpeg::FfmpegToolkit;
pub use ytdlp::YtDlpDownloader;
