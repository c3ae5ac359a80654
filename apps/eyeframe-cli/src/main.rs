use std::{env, path::PathBuf, str::FromStr};

use anyhow::{anyhow, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use eyeframe_capture::{CaptureSession, CaptureStart, CaptureTimer, SharedSession};
use eyeframe_export::{DirectorySink, ExportOutcome, Exporter};
use eyeframe_media::{FfmpegVideo, SyntheticVideo, VideoSource, MAX_SYNTHETIC_SIDE};
use eyeframe_ops::{init_tracing, EventLog};
use eyeframe_types::{config::EyeframeConfig, events::ExportMode, frame::EyeSide};
use tokio::time::{sleep, Duration, Instant};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Individual,
    Archive,
}

impl From<Mode> for ExportMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Individual => ExportMode::Individual,
            Mode::Archive => ExportMode::Archive,
        }
    }
}

/// Longest span accepted for `--duration` and synthetic videos.
const MAX_SECONDS: f64 = 24.0 * 60.0 * 60.0;

/// Parse a non-negative number of seconds no larger than a day.
fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number of seconds"))?;
    if !(0.0..=MAX_SECONDS).contains(&seconds) {
        return Err(format!("seconds must be between 0 and {MAX_SECONDS}, got '{value}'"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|err| err.to_string())
}

/// `WIDTHxHEIGHT@SECONDS`, e.g. `640x480@10`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SyntheticSpec {
    width: u32,
    height: u32,
    length: Duration,
}

impl FromStr for SyntheticSpec {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("expected WIDTHxHEIGHT@SECONDS, got '{value}'");
        let (size, seconds) = value.split_once('@').ok_or_else(invalid)?;
        let (width, height) = size.split_once('x').ok_or_else(invalid)?;
        let spec = SyntheticSpec {
            width: width.parse().map_err(|_| invalid())?,
            height: height.parse().map_err(|_| invalid())?,
            length: parse_seconds(seconds).map_err(|_| invalid())?,
        };
        let side = 1..=MAX_SYNTHETIC_SIDE;
        if !side.contains(&spec.width) || !side.contains(&spec.height) {
            return Err(format!(
                "width and height must be between 1 and {MAX_SYNTHETIC_SIDE}, got '{value}'"
            ));
        }
        if spec.length.is_zero() {
            return Err(invalid());
        }
        Ok(spec)
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "eyeframe",
    about = "Sample frames from an eye-exam video and export them",
    group(ArgGroup::new("source").required(true).args(["video", "synthetic"]))
)]
struct Cli {
    /// Video file to sample.
    video: Option<PathBuf>,
    /// Use a generated video instead of a file.
    #[arg(long)]
    synthetic: Option<SyntheticSpec>,
    /// Config file (falls back to EYEFRAME_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    log_level: Option<String>,
    /// Eye side for the first captured frames (OD or OE).
    #[arg(long)]
    eye: Option<EyeSide>,
    /// Seconds to capture before stopping (at most one day).
    #[arg(long, default_value = "5", value_parser = parse_seconds)]
    duration: Duration,
    /// Toggle the eye side once this many frames were captured.
    #[arg(long)]
    switch_eye_after: Option<usize>,
    /// Frame ids to mark as selected, comma separated.
    #[arg(long, value_delimiter = ',')]
    select: Vec<u64>,
    #[arg(long, value_enum, default_value_t = Mode::Archive)]
    mode: Mode,
    /// Download directory (defaults to export.output_dir).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.clone());
    if let Some(level) = &cli.log_level {
        config.ops.log_level = level.clone();
    }
    init_tracing(&config.ops)?;

    let events = EventLog::new();
    let mut session = CaptureSession::with_system_clock(&config.capture, events.clone());
    let video: Box<dyn VideoSource> = match (&cli.synthetic, &cli.video) {
        (Some(spec), _) => Box::new(SyntheticVideo::new(
            spec.width,
            spec.height,
            spec.length,
        )),
        (None, Some(path)) => Box::new(FfmpegVideo::open(path, &config.media).await?),
        (None, None) => return Err(anyhow!("no video source given")),
    };
    session.load_video(video).await;
    if let Some(side) = cli.eye {
        session.set_eye_side(side);
    }
    let session = session.into_shared();

    let timer = CaptureTimer::from_config(&config.capture);
    match timer.start(&session).await? {
        CaptureStart::Running(handle) => {
            capture_for(&session, &timer, &cli).await;
            let captured = handle.stop().await?;
            info!("Captured {} frames", captured);
        }
        CaptureStart::AlreadyRunning => warn!("capture was already running"),
        CaptureStart::Rejected(reason) => warn!("capture not started: {reason}"),
    }

    {
        let mut guard = session.lock().await;
        for id in &cli.select {
            if guard.toggle_selected(*id).await.is_none() {
                warn!("no frame with id {id}; selection ignored");
            }
        }
    }

    let out_dir = cli
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.export.output_dir));
    let exporter = Exporter::new(&config.export, DirectorySink::new(&out_dir), events.clone());
    match exporter.export(&session, cli.mode.into()).await? {
        ExportOutcome::Completed(report) => {
            println!(
                "Exported {} frames ({} bytes) to {}:",
                report.files,
                report.bytes,
                out_dir.display()
            );
            for name in &report.delivered {
                println!("  {name}");
            }
        }
        ExportOutcome::Rejected(_) => {}
    }

    for notice in events.notices().await {
        println!("Notice: {}", notice.message);
    }
    Ok(())
}

/// Keep capturing until the duration elapses or the video ends, toggling the
/// eye side once when asked.
async fn capture_for(session: &SharedSession, timer: &CaptureTimer, cli: &Cli) {
    let Some(deadline) = Instant::now().checked_add(cli.duration) else {
        warn!("capture duration {:?} is out of range", cli.duration);
        return;
    };
    let mut pending_switch = cli.switch_eye_after;
    while Instant::now() < deadline {
        sleep(timer.period() / 2).await;
        let mut guard = session.lock().await;
        if !guard.is_running() {
            break;
        }
        if let Some(after) = pending_switch {
            if guard.frames().len() >= after {
                let side = guard.toggle_eye_side();
                info!("Eye side switched to {} after {} frames", side, after);
                pending_switch = None;
            }
        }
    }
}

fn load_config(from_args: Option<PathBuf>) -> EyeframeConfig {
    let from_env = env::var("EYEFRAME_CONFIG").ok().map(PathBuf::from);
    let Some(path) = from_args.or(from_env) else {
        return EyeframeConfig::default();
    };
    match EyeframeConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                EyeframeConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            EyeframeConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_synthetic_spec() {
        let spec: SyntheticSpec = "640x480@2.5".parse().expect("parse spec");
        assert_eq!(
            spec,
            SyntheticSpec {
                width: 640,
                height: 480,
                length: Duration::from_millis(2500)
            }
        );
        assert!("640x480".parse::<SyntheticSpec>().is_err());
        assert!("0x480@1".parse::<SyntheticSpec>().is_err());
        assert!("640x480@-1".parse::<SyntheticSpec>().is_err());
        assert!("640x480@0".parse::<SyntheticSpec>().is_err());
        assert!("640x480@inf".parse::<SyntheticSpec>().is_err());
    }

    #[test]
    fn synthetic_size_is_bounded() {
        let max = format!("{MAX_SYNTHETIC_SIDE}x1@1");
        assert!(max.parse::<SyntheticSpec>().is_ok());
        assert!("100000x1@1".parse::<SyntheticSpec>().is_err());
        assert!("1x4294967295@1".parse::<SyntheticSpec>().is_err());
    }

    #[test]
    fn duration_rejects_unbounded_values() {
        assert_eq!(parse_seconds("2.5"), Ok(Duration::from_millis(2500)));
        assert_eq!(parse_seconds("0"), Ok(Duration::ZERO));
        for bad in ["inf", "NaN", "-1", "1e300", "86401", "soon"] {
            assert!(parse_seconds(bad).is_err(), "{bad}");
        }
        let args = ["eyeframe", "--synthetic", "4x4@1", "--duration", "inf"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn cli_requires_a_source() {
        assert!(Cli::try_parse_from(["eyeframe"]).is_err());
        let cli = Cli::try_parse_from([
            "eyeframe",
            "--synthetic",
            "32x16@3",
            "--eye",
            "oe",
            "--select",
            "0,2",
            "--mode",
            "individual",
        ])
        .expect("parse cli");
        assert_eq!(cli.eye, Some(EyeSide::Oe));
        assert_eq!(cli.select, vec![0, 2]);
        assert!(matches!(cli.mode, Mode::Individual));
        assert_eq!(cli.duration, Duration::from_secs(5));
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(Some(PathBuf::from("/nonexistent/eyeframe.toml")));
        assert_eq!(config.capture.interval_ms, 500);
        assert!(config.validate().is_ok());
    }
}
