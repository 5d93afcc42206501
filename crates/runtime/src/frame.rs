use foundation::time::Time;

/// Frame metadata handed to animation-frame callbacks.
///
/// `dt_s` is measured against the previous tick, so it follows the display
/// refresh rate rather than a fixed step.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Seconds since the previous frame (0 for the first one).
    pub dt_s: f64,
    /// Timestamp of this frame.
    pub time: Time,
}

impl Frame {
    pub fn first(time: Time) -> Self {
        Self {
            index: 0,
            dt_s: 0.0,
            time,
        }
    }

    pub fn next(self, time: Time) -> Self {
        Self {
            index: self.index + 1,
            dt_s: time.since(self.time),
            time,
        }
    }
}
