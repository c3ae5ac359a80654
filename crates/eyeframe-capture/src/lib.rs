//! Frame sampling: the frame store, eye-side tagging, and the capture timer.

mod clock;
mod gate;
mod session;
mod store;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gate::{ExportGate, ExportPermit};
pub use session::{CaptureSession, SharedSession, StartOutcome, TickOutcome};
pub use store::{FrameIdCounter, FrameStore};
pub use timer::{CaptureHandle, CaptureStart, CaptureTimer};

use eyeframe_types::EyeframeError;

pub fn capture_error(message: impl Into<String>) -> EyeframeError {
    EyeframeError::Capture(message.into())
}
