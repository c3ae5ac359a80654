use std::fmt;

use eyeframe_types::{config::CaptureConfig, Precondition, Result};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{
    capture_error,
    session::{SharedSession, StartOutcome, TickOutcome},
};

/// Schedules session ticks at a fixed period.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTimer {
    period: Duration,
}

/// Result of asking the timer to start capturing.
#[derive(Debug)]
pub enum CaptureStart {
    Running(CaptureHandle),
    AlreadyRunning,
    Rejected(Precondition),
}

impl CaptureTimer {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(Duration::from_millis(config.interval_ms))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start playback and spawn the tick task. The first sample is taken one
    /// period after this call.
    ///
    /// The task belongs to the run it was started for: any later `stop()` or
    /// `load_video()` on the session ends it, so a restarted session never
    /// has two timers ticking.
    pub async fn start(&self, session: &SharedSession) -> Result<CaptureStart> {
        let (run_id, runs) = {
            let mut guard = session.lock().await;
            match guard.start().await? {
                StartOutcome::Started => {}
                StartOutcome::AlreadyRunning => return Ok(CaptureStart::AlreadyRunning),
                StartOutcome::Rejected(precondition) => {
                    return Ok(CaptureStart::Rejected(precondition))
                }
            }
            (guard.run_id(), guard.watch_runs())
        };

        let task = tokio::spawn(run_ticks(session.clone(), self.period, run_id, runs));
        info!("Capture timer running every {:?} (run {})", self.period, run_id);
        Ok(CaptureStart::Running(CaptureHandle {
            session: session.clone(),
            run_id,
            task,
        }))
    }
}

async fn run_ticks(
    session: SharedSession,
    period: Duration,
    run_id: u64,
    mut runs: watch::Receiver<u64>,
) -> usize {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut captured = 0;

    loop {
        tokio::select! {
            changed = runs.changed() => {
                if changed.is_err() || *runs.borrow() != run_id {
                    debug!("capture run {run_id} superseded");
                    return captured;
                }
            }
            _ = interval.tick() => {
                let mut guard = session.lock().await;
                if guard.run_id() != run_id {
                    debug!("capture run {run_id} superseded");
                    return captured;
                }
                match guard.tick().await {
                    TickOutcome::Captured(_) => captured += 1,
                    TickOutcome::Skipped => {}
                    TickOutcome::Stopped | TickOutcome::Idle => {
                        debug!("capture timer finished");
                        return captured;
                    }
                }
            }
        }
    }
}

/// Handle to a running capture timer.
pub struct CaptureHandle {
    session: SharedSession,
    run_id: u64,
    task: JoinHandle<usize>,
}

impl fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl CaptureHandle {
    /// Stop the session if it is still on this run, then return how many
    /// frames this run captured.
    pub async fn stop(self) -> Result<usize> {
        self.session.lock().await.stop_run(self.run_id).await;
        self.wait().await
    }

    /// Wait until the run ends: video ended or paused, or the session was
    /// stopped or given a new video.
    pub async fn wait(self) -> Result<usize> {
        self.task
            .await
            .map_err(|err| capture_error(format!("capture task failed: {err}")))
    }
}
