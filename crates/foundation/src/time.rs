/// Time primitives
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64); // seconds

impl Time {
    pub fn seconds(self) -> f64 {
        self.0
    }

    /// Seconds elapsed since `earlier`, clamped to zero.
    pub fn since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
