use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the shared-state layer and the aggregator.
///
/// Recoverable conditions (lenient parse stops, per-write failures) are
/// handled close to where they occur; only setup failures and strict-mode
/// parsing propagate these variants to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A malformed on-disk entry: bad length field, unaligned tail, or a
    /// record that crosses the published `used` boundary. Strict parsing
    /// surfaces this; lenient parsing silently stops at the damaged suffix.
    #[error("malformed entry at byte offset {offset}: {reason}")]
    Parse { offset: usize, reason: &'static str },

    /// An encoded key failed JSON validation during aggregation.
    #[error("invalid encoded key: {0}")]
    Key(#[from] serde_json::Error),

    /// Rejected metric or label name, or a label-cardinality mismatch.
    #[error("invalid metric specification: {0}")]
    InvalidMetric(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `flock` failed for a reason other than the lock being held elsewhere.
    /// Lock *contention* is not an error; the path allocator probes the next
    /// candidate filename instead.
    #[error("failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing file was unlinked or truncated by another process. The
    /// writer stays usable; the registry allocates a fresh file on the next
    /// write.
    #[error("backing file vanished or shrank beneath the mapping: {path}")]
    FileVanished { path: PathBuf },

    /// A write was attempted before `configure()` installed the
    /// process-wide settings.
    #[error("multiprocess metrics are not configured")]
    NotConfigured,
}

pub type Result<T> = std::result::Result<T, StoreError>;
