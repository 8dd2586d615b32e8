/// Snapshot of a backend's pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Upper bound on open connections
    pub max_size: usize,
    /// Connections currently open, idle or checked out
    pub size: usize,
    /// Open connections waiting in the pool
    pub idle: usize,
}

impl PoolStatus {
    /// Connections currently checked out by callers.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.size.saturating_sub(self.idle)
    }
}
