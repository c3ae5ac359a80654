use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Flag shared between the capture session and the export pipeline.
///
/// Capture may not start while a permit is outstanding.
#[derive(Debug, Clone, Default)]
pub struct ExportGate {
    busy: Arc<AtomicBool>,
}

impl ExportGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<ExportPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExportPermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Held for the duration of one export; releases the gate on drop.
#[derive(Debug)]
pub struct ExportPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for ExportPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
