use std::collections::BTreeSet;

use foundation::time::Time;

use crate::frame::Frame;

/// Handle for a requested animation frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Display-refresh scheduler in the style of `requestAnimationFrame`.
///
/// Ordering contract:
/// - `tick` hands out every handle pending at the time of the call, in
///   request order. Handles requested while those are being dispatched fire on
///   the following tick.
/// - `cancel` is idempotent: cancelling a fired, cancelled or unknown handle
///   returns `false` and changes nothing.
#[derive(Debug, Default)]
pub struct AnimationFrames {
    next_handle: u64,
    pending: BTreeSet<FrameHandle>,
    last: Option<Frame>,
}

impl AnimationFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.pending.insert(handle);
        handle
    }

    /// Returns `true` if `handle` was pending and is now cancelled.
    pub fn cancel(&mut self, handle: FrameHandle) -> bool {
        self.pending.remove(&handle)
    }

    pub fn is_pending(&self, handle: FrameHandle) -> bool {
        self.pending.contains(&handle)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last
    }

    /// Advances to the frame at `time` and returns the handles due on it.
    pub fn tick(&mut self, time: Time) -> (Frame, Vec<FrameHandle>) {
        let frame = match self.last {
            None => Frame::first(time),
            Some(prev) => prev.next(time),
        };
        self.last = Some(frame);
        let due = std::mem::take(&mut self.pending).into_iter().collect();
        (frame, due)
    }
}

#[cfg(test)]
mod tests {
    use super::AnimationFrames;
    use foundation::time::Time;

    #[test]
    fn tick_fires_pending_in_request_order() {
        let mut frames = AnimationFrames::new();
        let a = frames.request();
        let b = frames.request();
        let (frame, due) = frames.tick(Time(0.0));
        assert_eq!(frame.index, 0);
        assert_eq!(due, vec![a, b]);
        assert_eq!(frames.pending_len(), 0);
    }

    #[test]
    fn requests_during_dispatch_wait_for_next_tick() {
        let mut frames = AnimationFrames::new();
        frames.request();
        let (_, due) = frames.tick(Time(0.0));
        assert_eq!(due.len(), 1);
        let again = frames.request();
        let (frame, due) = frames.tick(Time(1.0 / 60.0));
        assert_eq!(frame.index, 1);
        assert_eq!(due, vec![again]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut frames = AnimationFrames::new();
        let h = frames.request();
        assert!(frames.cancel(h));
        assert!(!frames.cancel(h));
        let (_, due) = frames.tick(Time(0.0));
        assert!(due.is_empty());
    }

    #[test]
    fn cancelling_a_fired_handle_is_a_no_op() {
        let mut frames = AnimationFrames::new();
        let h = frames.request();
        let _ = frames.tick(Time(0.0));
        assert!(!frames.cancel(h));
    }
}
