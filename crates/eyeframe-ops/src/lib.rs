//! Operational helpers: logging setup and the session event log.

use std::sync::Arc;

use eyeframe_types::{
    config::OpsConfig,
    events::{EventPayload, NoticeEvent, SessionEvent},
    EyeframeError, Result,
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| EyeframeError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| EyeframeError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// Append-only, in-memory record of session events.
///
/// Clones share the same underlying log, so the capture session, the export
/// pipeline, and the front end can all hold one.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, event: SessionEvent) {
        match &event.payload {
            EventPayload::Notice(notice) => info!("notice: {}", notice.message),
            other => debug!("session event {:?}: {:?}", event.kind, other),
        }
        self.events.lock().await.push(event);
    }

    pub async fn notices(&self) -> Vec<NoticeEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| event.as_notice().cloned())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }
}
