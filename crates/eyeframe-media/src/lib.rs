//! Video source abstraction layer.

use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};

use async_trait::async_trait;
use eyeframe_types::{raster::RasterFrame, EyeframeError, Result};
use tokio::time::{Duration, Instant};
use tracing::info;

mod encode;
mod ffmpeg;

pub use encode::{encode_png, fit_to_native};
pub use ffmpeg::FfmpegVideo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Loaded but never started.
    Idle,
    Playing,
    Paused,
    Ended,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// A playable media source whose current image can be rasterized.
#[async_trait]
pub trait VideoSource: Send + Sync {
    fn describe(&self) -> String;
    /// Native pixel dimensions, if known.
    fn native_size(&self) -> Option<(u32, u32)>;
    fn state(&self) -> PlaybackState;
    async fn play(&mut self, muted: bool) -> Result<()>;
    fn pause(&mut self);
    /// Rasterize the image at the current playback position.
    ///
    /// `Ok(None)` means the surface is not ready for this sample.
    async fn current_frame(&self) -> Result<Option<RasterFrame>>;
}

/// Wall-clock playback position tracker driven by tokio's monotonic clock.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    duration: Duration,
    started_at: Option<Instant>,
    played_before: Duration,
    paused: bool,
}

impl PlaybackClock {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            started_at: None,
            played_before: Duration::ZERO,
            paused: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn play(&mut self) {
        if self.started_at.is_none() || self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
    }

    pub fn pause(&mut self) {
        if let Some(started) = self.started_at {
            if !self.paused {
                self.played_before += started.elapsed();
                self.paused = true;
            }
        }
    }

    pub fn position(&self) -> Duration {
        let running = match (self.started_at, self.paused) {
            (Some(started), false) => started.elapsed(),
            _ => Duration::ZERO,
        };
        (self.played_before + running).min(self.duration)
    }

    pub fn state(&self) -> PlaybackState {
        if self.started_at.is_none() {
            PlaybackState::Idle
        } else if self.position() >= self.duration {
            PlaybackState::Ended
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }
}

/// Largest width or height accepted for a generated video.
pub const MAX_SYNTHETIC_SIDE: u32 = 8192;

/// Failure a [`SyntheticVideo`] can be told to produce when rasterizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SyntheticFault {
    #[default]
    None = 0,
    /// `current_frame` returns an error, like a failed ffmpeg run.
    RasterError = 1,
    /// `current_frame` returns an off-size buffer whose length does not match
    /// its dimensions.
    CorruptRaster = 2,
}

impl SyntheticFault {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => SyntheticFault::RasterError,
            2 => SyntheticFault::CorruptRaster,
            _ => SyntheticFault::None,
        }
    }
}

/// Shared switches for driving a [`SyntheticVideo`] from outside the session.
#[derive(Debug, Clone, Default)]
pub struct SyntheticControl {
    surface_down: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    fault: Arc<AtomicU8>,
}

impl SyntheticControl {
    pub fn set_fault(&self, fault: SyntheticFault) {
        self.fault.store(fault as u8, Ordering::SeqCst);
    }

    fn fault(&self) -> SyntheticFault {
        SyntheticFault::from_u8(self.fault.load(Ordering::SeqCst))
    }

    pub fn set_surface_ready(&self, ready: bool) {
        self.surface_down.store(!ready, Ordering::SeqCst);
    }

    /// Jump to the end of the video.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

/// Generated gradient video used for dry runs and integration testing.
pub struct SyntheticVideo {
    width: u32,
    height: u32,
    clock: PlaybackClock,
    control: SyntheticControl,
    muted: bool,
}

impl SyntheticVideo {
    pub fn new(width: u32, height: u32, duration: Duration) -> Self {
        Self {
            width,
            height,
            clock: PlaybackClock::new(duration),
            control: SyntheticControl::default(),
            muted: false,
        }
    }

    pub fn control(&self) -> SyntheticControl {
        self.control.clone()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn render(&self) -> RasterFrame {
        let shade = ((self.clock.position().as_millis() / 10) % 256) as u8;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((u64::from(x) * 255 / u64::from(self.width.max(1))) as u8);
                data.push((u64::from(y) * 255 / u64::from(self.height.max(1))) as u8);
                data.push(shade);
                data.push(u8::MAX);
            }
        }
        RasterFrame::from_rgba(self.width, self.height, data)
    }
}

#[async_trait]
impl VideoSource for SyntheticVideo {
    fn describe(&self) -> String {
        format!(
            "synthetic {}x{} ({:.1}s)",
            self.width,
            self.height,
            self.clock.duration().as_secs_f64()
        )
    }

    fn native_size(&self) -> Option<(u32, u32)> {
        (self.width > 0 && self.height > 0).then_some((self.width, self.height))
    }

    fn state(&self) -> PlaybackState {
        if self.control.finished.load(Ordering::SeqCst) {
            return PlaybackState::Ended;
        }
        self.clock.state()
    }

    async fn play(&mut self, muted: bool) -> Result<()> {
        info!("Playing {} (muted: {})", self.describe(), muted);
        self.muted = muted;
        self.clock.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    async fn current_frame(&self) -> Result<Option<RasterFrame>> {
        if self.control.surface_down.load(Ordering::SeqCst) || self.native_size().is_none() {
            return Ok(None);
        }
        match self.control.fault() {
            SyntheticFault::None => Ok(Some(self.render())),
            SyntheticFault::RasterError => Err(media_error("synthetic rasterization failed")),
            SyntheticFault::CorruptRaster => Ok(Some(RasterFrame::from_rgba(
                self.width.saturating_add(1),
                self.height,
                vec![0; 7],
            ))),
        }
    }
}

/// Generate an error aligned with media semantics.
pub fn media_error(message: impl Into<String>) -> EyeframeError {
    EyeframeError::Media(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn playback_clock_tracks_pause_and_end() {
        let mut clock = PlaybackClock::new(Duration::from_secs(2));
        assert_eq!(clock.state(), PlaybackState::Idle);

        clock.play();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(clock.state(), PlaybackState::Playing);
        assert_eq!(clock.position(), Duration::from_millis(500));

        clock.pause();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(clock.state(), PlaybackState::Paused);
        assert_eq!(clock.position(), Duration::from_millis(500));

        clock.play();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(clock.state(), PlaybackState::Ended);
        assert_eq!(clock.position(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn synthetic_frames_match_native_size() {
        let mut video = SyntheticVideo::new(8, 4, Duration::from_secs(10));
        video.play(true).await.expect("play");
        assert!(video.is_muted());

        let frame = video
            .current_frame()
            .await
            .expect("rasterize")
            .expect("surface ready");
        assert_eq!((frame.width, frame.height), (8, 4));
        assert!(frame.is_consistent());
    }

    #[tokio::test]
    async fn synthetic_control_drives_state() {
        let mut video = SyntheticVideo::new(2, 2, Duration::from_secs(10));
        let control = video.control();
        video.play(true).await.expect("play");

        control.set_surface_ready(false);
        assert!(video.current_frame().await.expect("rasterize").is_none());
        control.set_surface_ready(true);
        assert!(video.current_frame().await.expect("rasterize").is_some());

        control.finish();
        assert_eq!(video.state(), PlaybackState::Ended);
    }

    #[tokio::test]
    async fn synthetic_faults_reach_the_caller() {
        let mut video = SyntheticVideo::new(4, 2, Duration::from_secs(10));
        let control = video.control();
        video.play(true).await.expect("play");

        control.set_fault(SyntheticFault::RasterError);
        let err = video.current_frame().await.unwrap_err();
        assert!(matches!(err, EyeframeError::Media(_)));

        control.set_fault(SyntheticFault::CorruptRaster);
        let frame = video.current_frame().await.expect("rasterize").expect("surface ready");
        assert!(!frame.is_consistent());
        assert!(encode_png(&frame).is_err());
        assert!(fit_to_native(frame, (4, 2)).is_err());

        control.set_fault(SyntheticFault::None);
        assert!(video.current_frame().await.expect("rasterize").is_some());
    }

    #[test]
    fn gradient_stays_in_range_on_wide_frames() {
        let video = SyntheticVideo::new(MAX_SYNTHETIC_SIDE, 1, Duration::from_secs(1));
        let frame = video.render();
        assert!(frame.is_consistent());
        let last_red = frame.data[(MAX_SYNTHETIC_SIDE as usize - 1) * 4];
        assert_eq!(last_red, 254);
    }
}
