use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

// Best available audio stream, transcoded to MP3 at 192 kbps by yt-dlp's
// ffmpeg postprocessor.
const FORMAT_SELECTOR: &str = "bestaudio/best";
const AUDIO_QUALITY: &str = "192K";

/// Turns a video URL into a local MP3 file inside `dest_dir`.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, video_url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

pub struct YtDlpFetcher {
    binary: String,
}

impl YtDlpFetcher {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }

    // "--" ends option parsing so an option-shaped URL cannot be read as a flag.
    fn probe_args<'a>(template: &'a str, video_url: &'a str) -> Vec<&'a str> {
        vec![
            "--print",
            "filename",
            "--no-playlist",
            "-o",
            template,
            "--",
            video_url,
        ]
    }

    fn download_args<'a>(template: &'a str, video_url: &'a str) -> Vec<&'a str> {
        vec![
            "-f",
            FORMAT_SELECTOR,
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            AUDIO_QUALITY,
            "--no-playlist",
            "-o",
            template,
            "--",
            video_url,
        ]
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|error| {
                if error.kind() == ErrorKind::NotFound {
                    anyhow!("yt-dlp is not installed or not in PATH")
                } else {
                    anyhow!("Failed to run yt-dlp: {error}")
                }
            })
    }

    /// Ask yt-dlp for the title-derived output filename without downloading.
    async fn probe_filename(&self, video_url: &str, template: &str) -> Result<PathBuf> {
        let output = self.run(&Self::probe_args(template, video_url)).await?;

        if !output.status.success() {
            bail!("{}", last_stderr_line(&output.stderr));
        }

        let printed = String::from_utf8_lossy(&output.stdout);
        let printed = printed.trim();
        if printed.is_empty() {
            bail!("yt-dlp did not report an output filename");
        }

        Ok(mp3_path(printed))
    }

    async fn download(&self, video_url: &str, template: &str) -> Result<()> {
        let output = self.run(&Self::download_args(template, video_url)).await?;

        if !output.status.success() {
            bail!("{}", last_stderr_line(&output.stderr));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, video_url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let template = dest_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .to_string();

        let expected = self.probe_filename(video_url, &template).await?;
        debug!(path = %expected.display(), "Resolved output filename");

        self.download(video_url, &template).await?;

        if tokio::fs::metadata(&expected).await.is_ok() {
            return Ok(expected);
        }

        // yt-dlp may sanitize the final filename differently than the probe
        find_mp3(dest_dir)
            .await?
            .ok_or_else(|| anyhow!("yt-dlp reported success but produced no MP3 file"))
    }
}

/// Replace the probed extension with `.mp3`, matching the postprocessor output.
fn mp3_path(printed: &str) -> PathBuf {
    PathBuf::from(printed).with_extension("mp3")
}

/// Reduce a yt-dlp failure to its last non-empty stderr line.
fn last_stderr_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    text.lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("yt-dlp failed without error output")
        .to_string()
}

async fn find_mp3(dir: &Path) -> Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .context("Failed to read download directory")?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
        {
            return Ok(Some(path));
        }
    }

    Ok(None)
}
