use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyeframe_types::{config::MediaConfig, raster::RasterFrame, Result};
use image::ImageFormat;
use serde::Deserialize;
use tokio::{process::Command, time::Duration};
use tracing::{debug, info};

use crate::{media_error, PlaybackClock, PlaybackState, VideoSource};

const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_FFPROBE: &str = "ffprobe";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ProbeInfo {
    width: u32,
    height: u32,
    duration: Duration,
}

fn parse_probe(raw: &[u8]) -> Result<ProbeInfo> {
    let output: ProbeOutput = serde_json::from_slice(raw)
        .map_err(|err| media_error(format!("unreadable ffprobe output: {err}")))?;
    let stream = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| media_error("file has no video stream"))?;
    let (Some(width), Some(height)) = (stream.width, stream.height) else {
        return Err(media_error("video stream has no dimensions"));
    };
    let seconds = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| media_error("video duration unknown"))?;
    Ok(ProbeInfo {
        width,
        height,
        duration: Duration::from_secs_f64(seconds),
    })
}

/// Video file played against the wall clock and rasterized by `ffmpeg`.
pub struct FfmpegVideo {
    path: PathBuf,
    ffmpeg: PathBuf,
    info: ProbeInfo,
    clock: PlaybackClock,
}

impl FfmpegVideo {
    pub async fn open(path: impl AsRef<Path>, config: &MediaConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let ffprobe = config
            .ffprobe_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FFPROBE));
        let ffmpeg = config
            .ffmpeg_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG));

        let mut command = Command::new(&ffprobe);
        command
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(&path);
        let raw = run_tool(command, "ffprobe").await?;
        let info = parse_probe(&raw)?;
        info!(
            "Opened {:?}: {}x{}, {:.2}s",
            path,
            info.width,
            info.height,
            info.duration.as_secs_f64()
        );

        Ok(Self {
            path,
            ffmpeg,
            clock: PlaybackClock::new(info.duration),
            info,
        })
    }
}

async fn run_tool(mut command: Command, name: &str) -> Result<Vec<u8>> {
    let output = command
        .output()
        .await
        .map_err(|err| media_error(format!("failed to run {name}: {err}")))?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(media_error(format!(
            "{name} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

#[async_trait]
impl VideoSource for FfmpegVideo {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn native_size(&self) -> Option<(u32, u32)> {
        Some((self.info.width, self.info.height))
    }

    fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    async fn play(&mut self, muted: bool) -> Result<()> {
        // Audio is never rendered here, so muting is implicit.
        debug!("Starting playback of {:?} (muted: {})", self.path, muted);
        self.clock.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    async fn current_frame(&self) -> Result<Option<RasterFrame>> {
        let position = format!("{:.3}", self.clock.position().as_secs_f64());
        let mut command = Command::new(&self.ffmpeg);
        command
            .args(["-v", "error", "-ss", &position, "-i"])
            .arg(&self.path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"]);
        let raw = run_tool(command, "ffmpeg").await?;
        if raw.is_empty() {
            debug!("ffmpeg produced no image at {}s", position);
            return Ok(None);
        }
        let img = image::load_from_memory_with_format(&raw, ImageFormat::Png)
            .map_err(|err| media_error(format!("frame decoding failed: {err}")))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Some(RasterFrame::from_rgba(width, height, rgba.into_raw())))
    }
}
