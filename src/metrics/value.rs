use crate::error::Result;
use crate::key_codec::MetricKey;
use crate::registry;
use std::sync::Mutex;

/// Capability surface shared by both value backends. Metric objects talk
/// to their numbers exclusively through this trait.
pub trait MetricValue {
    fn set(&self, value: f64) -> Result<()>;
    fn inc_by(&self, delta: f64) -> Result<()>;
    fn get(&self) -> Result<f64>;
}

/// Where a metric child's number lives.
///
/// `Simple` is a process-local accumulator, used when multiprocess mode
/// was never configured. `Mmap` routes every access through the
/// process-wide registry to the dict file for its prefix, which also
/// re-checks the pid on each call so forked children transparently move
/// to their own files.
pub enum ValueBackend {
    Simple(Mutex<f64>),
    Mmap { prefix: String, key: Vec<u8> },
}

impl ValueBackend {
    /// Picks the backend for one `(prefix, key)` slot based on whether
    /// the process is configured for multiprocess operation.
    pub fn for_key(prefix: &str, key: &MetricKey) -> Result<Self> {
        if registry::is_configured() {
            Ok(ValueBackend::Mmap {
                prefix: prefix.to_string(),
                key: key.encode()?,
            })
        } else {
            Ok(ValueBackend::Simple(Mutex::new(0.0)))
        }
    }

    /// Materializes the slot with a zero entry so the sample shows up in
    /// scrapes before the first real observation. Existing values are
    /// left untouched.
    pub fn touch(&self) -> Result<()> {
        self.inc_by(0.0)
    }
}

impl MetricValue for ValueBackend {
    fn set(&self, value: f64) -> Result<()> {
        match self {
            ValueBackend::Simple(cell) => {
                *cell.lock().unwrap_or_else(|e| e.into_inner()) = value;
                Ok(())
            }
            ValueBackend::Mmap { prefix, key } => {
                registry::with_dict(prefix, |dict| dict.write_value(key, value))
            }
        }
    }

    fn inc_by(&self, delta: f64) -> Result<()> {
        match self {
            ValueBackend::Simple(cell) => {
                *cell.lock().unwrap_or_else(|e| e.into_inner()) += delta;
                Ok(())
            }
            ValueBackend::Mmap { prefix, key } => {
                // Read-modify-write is atomic here: the registry mutex is
                // held across both halves.
                registry::with_dict(prefix, |dict| {
                    let current = dict.read_value(key)?;
                    dict.write_value(key, current + delta)
                })
            }
        }
    }

    fn get(&self) -> Result<f64> {
        match self {
            ValueBackend::Simple(cell) => Ok(*cell.lock().unwrap_or_else(|e| e.into_inner())),
            ValueBackend::Mmap { prefix, key } => {
                registry::with_dict(prefix, |dict| dict.read_value(key))
            }
        }
    }
}
