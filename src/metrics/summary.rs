use crate::error::Result;
use crate::key_codec::MetricKey;
use crate::metrics::desc::MetricDesc;
use crate::metrics::value::{MetricValue, ValueBackend};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A summary tracking only `{name}_sum` and `{name}_count`.
///
/// Quantiles are deliberately not computed; merging exact quantiles
/// across processes is not meaningful, while sums and counts add cleanly.
pub struct Summary {
    desc: Arc<MetricDesc>,
    children: Mutex<HashMap<Vec<String>, Arc<SummaryChild>>>,
}

impl Summary {
    pub fn new(name: &str, help: &str) -> Result<Self> {
        Self::with_labels(name, help, &[])
    }

    pub fn with_labels(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = MetricDesc::new(name, help, label_names)?;
        desc.forbid_label("quantile")?;

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

    pub fn with_label_values(&self, values: &[&str]) -> Result<Arc<SummaryChild>> {
        let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
        let cache_key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(child) = children.get(&cache_key) {
            return Ok(Arc::clone(child));
        }

        let child = Arc::new(SummaryChild::bind(&self.desc, values)?);
        children.insert(cache_key, Arc::clone(&child));
        Ok(child)
    }

    /// Shortcut for the unlabeled child.
    pub fn observe(&self, value: f64) {
        match self.with_label_values(&[]) {
            Ok(child) => child.observe(value),
            Err(err) => warn!("summary {}: {}", self.desc.name, err),
        }
    }
}

/// A summary bound to one label set.
pub struct SummaryChild {
    sum: ValueBackend,
    count: ValueBackend,
}

impl SummaryChild {
    fn bind(desc: &MetricDesc, values: &[&str]) -> Result<Self> {
        let labels = desc.label_pairs(values)?;
        let sum_key = MetricKey::new(&desc.name, format!("{}_sum", desc.name), labels.clone());
        let count_key = MetricKey::new(&desc.name, format!("{}_count", desc.name), labels);

        let child = Self {
            sum: ValueBackend::for_key("summary", &sum_key)?,
            count: ValueBackend::for_key("summary", &count_key)?,
        };
        child.sum.touch()?;
        child.count.touch()?;
        Ok(child)
    }

    pub fn observe(&self, value: f64) {
        let outcome = self
            .sum
            .inc_by(value)
            .and_then(|_| self.count.inc_by(1.0));
        if let Err(err) = outcome {
            warn!("failed to record summary observation: {err}");
        }
    }

    pub fn sum(&self) -> f64 {
        self.sum.get().unwrap_or_else(|err| {
            warn!("failed to read summary sum: {err}");
            0.0
        })
    }

    pub fn count(&self) -> f64 {
        self.count.get().unwrap_or_else(|err| {
            warn!("failed to read summary count: {err}");
            0.0
        })
    }
}
