//! Export pipeline: individual downloads and categorized archives.

mod archive;
mod sink;

pub use archive::{build_archive, manifest_json};
pub use sink::{DeliverySink, DirectorySink, MemorySink};

use eyeframe_capture::SharedSession;
use eyeframe_ops::EventLog;
use eyeframe_types::{
    config::ExportConfig,
    events::{EventKind, EventPayload, ExportEvent, ExportMode, SessionEvent},
    frame::Frame,
    EyeframeError, Precondition, Result,
};
use tracing::info;

/// What an export delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub mode: ExportMode,
    /// Frames included in the export.
    pub files: usize,
    /// Total payload bytes handed to the sink.
    pub bytes: u64,
    pub delivered: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed(ExportReport),
    Rejected(Precondition),
}

pub struct Exporter<S: DeliverySink> {
    sink: S,
    archive_name: String,
    manifest_name: String,
    events: EventLog,
}

impl<S: DeliverySink> Exporter<S> {
    pub fn new(config: &ExportConfig, sink: S, events: EventLog) -> Self {
        Self {
            sink,
            archive_name: config.archive_name.clone(),
            manifest_name: config.manifest_name.clone(),
            events,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Export the session's export set: the selected frames, or every frame
    /// when none is selected.
    pub async fn export(&self, session: &SharedSession, mode: ExportMode) -> Result<ExportOutcome> {
        let (permit, frames) = {
            let guard = session.lock().await;
            let Some(permit) = guard.export_gate().try_acquire() else {
                return Ok(self.reject(Precondition::ExportInFlight).await);
            };
            (permit, guard.export_set())
        };
        if frames.is_empty() {
            return Ok(self.reject(Precondition::NothingToExport).await);
        }

        let report = match mode {
            ExportMode::Individual => self.download_individual(&frames).await?,
            ExportMode::Archive => self.download_archive(frames).await?,
        };
        drop(permit);

        info!(
            "{:?} export delivered {} frames ({} bytes)",
            report.mode, report.files, report.bytes
        );
        self.events
            .record(SessionEvent::new(
                EventKind::Export,
                EventPayload::ExportCompleted(ExportEvent {
                    mode: report.mode,
                    files: report.files,
                    bytes: report.bytes,
                }),
            ))
            .await;
        Ok(ExportOutcome::Completed(report))
    }

    async fn download_individual(&self, frames: &[Frame]) -> Result<ExportReport> {
        let mut report = ExportReport {
            mode: ExportMode::Individual,
            files: 0,
            bytes: 0,
            delivered: Vec::with_capacity(frames.len()),
        };
        for frame in frames {
            self.sink.deliver(&frame.file_name, &frame.image).await?;
            report.files += 1;
            report.bytes += frame.image.len() as u64;
            report.delivered.push(frame.file_name.clone());
        }
        Ok(report)
    }

    async fn download_archive(&self, frames: Vec<Frame>) -> Result<ExportReport> {
        let files = frames.len();
        let manifest_name = self.manifest_name.clone();
        let bytes = tokio::task::spawn_blocking(move || build_archive(&frames, &manifest_name))
            .await
            .map_err(|err| export_error(format!("archive task failed: {err}")))??;
        self.sink.deliver(&self.archive_name, &bytes).await?;
        Ok(ExportReport {
            mode: ExportMode::Archive,
            files,
            bytes: bytes.len() as u64,
            delivered: vec![self.archive_name.clone()],
        })
    }

    async fn reject(&self, precondition: Precondition) -> ExportOutcome {
        info!("export rejected: {precondition}");
        self.events.record(SessionEvent::notice(precondition)).await;
        ExportOutcome::Rejected(precondition)
    }
}

pub fn export_error(message: impl Into<String>) -> EyeframeError {
    EyeframeError::Export(message.into())
}
