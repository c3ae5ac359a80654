use eyeframe_types::frame::{Frame, FrameId};

/// Source of frame ids. Values are handed out in strictly increasing order.
#[derive(Debug, Default)]
pub struct FrameIdCounter {
    next: FrameId,
}

impl FrameIdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self) -> FrameId {
        self.next
    }

    pub fn advance(&mut self) {
        self.next += 1;
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Ordered, append-only sequence of captured frames.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<Frame>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, frame: Frame) {
        debug_assert!(self.frames.last().map_or(true, |last| last.id < frame.id));
        self.frames.push(frame);
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, id: FrameId) -> Option<&Frame> {
        self.position(id).map(|index| &self.frames[index])
    }

    /// Flip the selection flag of frame `id`. Returns the new flag, or `None`
    /// when no frame carries that id.
    pub fn toggle_selected(&mut self, id: FrameId) -> Option<bool> {
        let index = self.position(id)?;
        let frame = &mut self.frames[index];
        frame.selected = !frame.selected;
        Some(frame.selected)
    }

    pub fn select_all(&mut self) {
        self.frames.iter_mut().for_each(|f| f.selected = true);
    }

    pub fn clear_selection(&mut self) {
        self.frames.iter_mut().for_each(|f| f.selected = false);
    }

    pub fn selected(&self) -> Vec<&Frame> {
        self.frames.iter().filter(|f| f.selected).collect()
    }

    pub fn selected_count(&self) -> usize {
        self.frames.iter().filter(|f| f.selected).count()
    }

    /// Frames targeted by an export: the selected ones, or every frame when
    /// nothing is selected.
    pub fn export_set(&self) -> Vec<&Frame> {
        let selected = self.selected();
        if selected.is_empty() {
            self.frames.iter().collect()
        } else {
            selected
        }
    }

    pub fn reset(&mut self) {
        self.frames.clear();
    }

    fn position(&self, id: FrameId) -> Option<usize> {
        self.frames.binary_search_by_key(&id, |f| f.id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eyeframe_types::frame::EyeSide;

    fn store_with(count: u64) -> FrameStore {
        let mut store = FrameStore::new();
        for id in 0..count {
            store.append(Frame::new(id, EyeSide::Od, vec![id as u8], Utc::now()));
        }
        store
    }

    fn ids(frames: &[&Frame]) -> Vec<FrameId> {
        frames.iter().map(|f| f.id).collect()
    }

    #[test]
    fn toggle_twice_restores_state() {
        let mut store = store_with(3);
        assert_eq!(store.toggle_selected(1), Some(true));
        assert_eq!(store.toggle_selected(1), Some(false));
        assert!(store.frames().iter().all(|f| !f.selected));
    }

    #[test]
    fn toggle_unknown_id_is_noop() {
        let mut store = store_with(3);
        assert_eq!(store.toggle_selected(42), None);
        assert_eq!(store.selected_count(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn export_set_falls_back_to_all() {
        let mut store = store_with(4);
        assert_eq!(ids(&store.export_set()), vec![0, 1, 2, 3]);

        store.toggle_selected(3);
        store.toggle_selected(1);
        assert_eq!(ids(&store.selected()), vec![1, 3]);
        assert_eq!(ids(&store.export_set()), vec![1, 3]);

        store.clear_selection();
        assert_eq!(ids(&store.export_set()), vec![0, 1, 2, 3]);
        store.select_all();
        assert_eq!(store.selected_count(), 4);
    }

    #[test]
    fn reset_clears_frames() {
        let mut store = store_with(2);
        store.reset();
        assert!(store.is_empty());
        assert!(store.export_set().is_empty());
        assert!(store.get(0).is_none());
    }

    #[test]
    fn counter_advances_and_resets() {
        let mut counter = FrameIdCounter::new();
        assert_eq!(counter.peek(), 0);
        counter.advance();
        counter.advance();
        assert_eq!(counter.peek(), 2);
        counter.reset();
        assert_eq!(counter.peek(), 0);
    }
}
