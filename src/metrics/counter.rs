use crate::error::Result;
use crate::key_codec::MetricKey;
use crate::metrics::desc::MetricDesc;
use crate::metrics::value::{MetricValue, ValueBackend};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A monotonically increasing counter.
///
/// In multiprocess mode every increment lands in this process's
/// `counter_<pid>-<n>.db` file; the aggregator later sums the per-process
/// contributions. Recording never panics and never fails the caller: a
/// write that cannot reach the dict file is logged and dropped, and the
/// next increment retries.
pub struct Counter {
    desc: Arc<MetricDesc>,
    children: Mutex<HashMap<Vec<String>, Arc<ValueBackend>>>,
}

impl Counter {
    pub fn new(name: &str, help: &str) -> Result<Self> {
        Self::with_labels(name, help, &[])
    }

    pub fn with_labels(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = MetricDesc::new(name, help, label_names)?;
        Ok(Self {
            desc: Arc::new(desc),
            children: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    /// The child bound to one concrete label set.
    pub fn with_label_values(&self, values: &[&str]) -> Result<CounterChild> {
        Ok(CounterChild {
            value: self.child(values)?,
        })
    }

    /// Shortcut for the unlabeled child.
    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    pub fn inc_by(&self, delta: f64) {
        match self.with_label_values(&[]) {
            Ok(child) => child.inc_by(delta),
            Err(err) => warn!("counter {}: {}", self.desc.name, err),
        }
    }

    pub fn get(&self) -> f64 {
        match self.with_label_values(&[]) {
            Ok(child) => child.get(),
            Err(err) => {
                warn!("counter {}: {}", self.desc.name, err);
                0.0
            }
        }
    }

    fn child(&self, values: &[&str]) -> Result<Arc<ValueBackend>> {
        let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
        let cache_key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(backend) = children.get(&cache_key) {
            return Ok(Arc::clone(backend));
        }

        let labels = self.desc.label_pairs(values)?;
        let key = MetricKey::new(&self.desc.name, &self.desc.name, labels);
        let backend = Arc::new(ValueBackend::for_key("counter", &key)?);
        backend.touch()?;
        children.insert(cache_key, Arc::clone(&backend));
        Ok(backend)
    }
}

/// A counter bound to one label set.
pub struct CounterChild {
    value: Arc<ValueBackend>,
}

impl CounterChild {
    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    pub fn inc_by(&self, delta: f64) {
        if delta < 0.0 {
            warn!("counter increments must be non-negative; dropping {delta}");
            return;
        }
        if let Err(err) = self.value.inc_by(delta) {
            warn!("failed to record counter increment: {err}");
        }
    }

    pub fn get(&self) -> f64 {
        self.value.get().unwrap_or_else(|err| {
            warn!("failed to read counter value: {err}");
            0.0
        })
    }
}
