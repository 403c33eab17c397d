use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::capture::domain::capture_gate::CaptureGate;
use crate::shared::frame::Frame;

/// Single-writer, latest-value-wins slot for the current frame.
///
/// The producer overwrites the slot on every capture tick; the two cycle
/// handlers take a snapshot (a clone) for exclusive use during their own
/// processing window, so a faster producer can never mutate a frame
/// mid-cycle. A missing frame is a normal condition early in startup;
/// readers skip the cycle rather than wait.
///
/// The slot doubles as the producer's [`CaptureGate`]: while paused the
/// producer stops publishing, which is how the controller keeps the feed
/// quiet during the synchronous act of opening a session.
pub struct FrameSlot {
    current: Mutex<Option<Frame>>,
    paused: AtomicBool,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
            paused: AtomicBool::new(false),
        }
    }

    pub fn publish(&self, frame: Frame) {
        *self.current.lock().unwrap() = Some(frame);
    }

    /// Best-effort read: `None` when no frame has been captured yet.
    pub fn snapshot(&self) -> Option<Frame> {
        self.current.lock().unwrap().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureGate for FrameSlot {
    fn pause(&self) {
        self.paused.store(true, Ordering::Relaxed);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 4], 2, 2, 1, index)
    }

    #[test]
    fn test_empty_slot_snapshot_is_none() {
        assert!(FrameSlot::new().snapshot().is_none());
    }

    #[test]
    fn test_latest_publish_wins() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        slot.publish(frame(2));
        assert_eq!(slot.snapshot().unwrap().index(), 2);
    }

    #[test]
    fn test_snapshot_is_independent_of_later_publishes() {
        let slot = FrameSlot::new();
        slot.publish(frame(1));
        let snap = slot.snapshot().unwrap();
        slot.publish(frame(2));
        assert_eq!(snap.index(), 1);
    }

    #[test]
    fn test_gate_pauses_and_resumes() {
        let slot = Arc::new(FrameSlot::new());
        assert!(!slot.is_paused());

        let gate: Arc<dyn CaptureGate> = slot.clone();
        gate.pause();
        assert!(slot.is_paused());
        gate.resume();
        assert!(!slot.is_paused());
    }
}
