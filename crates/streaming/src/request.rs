/// Identifies one issued load of a source.
///
/// Generations increase monotonically per source; only the ticket carrying
/// the latest generation may apply its result.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket {
    pub generation: u64,
}

impl LoadTicket {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }
}

/// Result of handing a completed load back to its source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The result replaced the current snapshot.
    Applied,
    /// The load failed; the previous snapshot stays visible.
    Failed,
    /// A newer load was issued after this one; the result was discarded.
    Stale,
}
