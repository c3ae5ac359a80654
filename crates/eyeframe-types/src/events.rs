use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    frame::{EyeSide, FrameId},
    Precondition,
};

/// High-level message kinds produced by a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Lifecycle,
    Capture,
    Selection,
    Export,
    Notice,
}

/// Immutable event envelope for logging and user notices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Lifecycle(LifecycleEvent),
    FrameCaptured(FrameCapturedEvent),
    SelectionChanged(SelectionEvent),
    ExportCompleted(ExportEvent),
    Notice(NoticeEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub phase: LifecyclePhase,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LifecyclePhase {
    VideoLoaded,
    CaptureStarted,
    CaptureStopped,
    Reset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameCapturedEvent {
    pub id: FrameId,
    pub file_name: String,
    pub eye_side: EyeSide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionEvent {
    pub id: FrameId,
    pub selected: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportMode {
    Individual,
    Archive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportEvent {
    pub mode: ExportMode,
    pub files: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeEvent {
    pub precondition: Precondition,
    pub message: String,
}

impl SessionEvent {
    pub fn new(kind: EventKind, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn lifecycle(phase: LifecyclePhase, details: Option<String>) -> Self {
        Self::new(
            EventKind::Lifecycle,
            EventPayload::Lifecycle(LifecycleEvent { phase, details }),
        )
    }

    pub fn notice(precondition: Precondition) -> Self {
        Self::new(
            EventKind::Notice,
            EventPayload::Notice(NoticeEvent {
                precondition,
                message: precondition.to_string(),
            }),
        )
    }

    pub fn as_notice(&self) -> Option<&NoticeEvent> {
        match &self.payload {
            EventPayload::Notice(notice) => Some(notice),
            _ => None,
        }
    }
}
