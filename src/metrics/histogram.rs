use crate::error::{Result, StoreError};
use crate::key_codec::MetricKey;
use crate::metrics::desc::MetricDesc;
use crate::metrics::value::{MetricValue, ValueBackend};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// The classic Prometheus latency buckets, in seconds.
pub const DEFAULT_BUCKETS: [f64; 11] = [
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// A histogram of observations over fixed upper bounds.
///
/// Each observation updates the cumulative `{name}_bucket` sample of
/// every bound it falls under, the implicit `le="+Inf"` bucket, and the
/// `{name}_sum` / `{name}_count` samples. Buckets are cumulative on disk,
/// so the aggregator can merge them with a plain per-label sum and the
/// `+Inf` line always equals the count.
pub struct Histogram {
    desc: Arc<MetricDesc>,
    buckets: Arc<Vec<f64>>,
    children: Mutex<HashMap<Vec<String>, Arc<HistogramChild>>>,
}

impl Histogram {
    /// Uses [`DEFAULT_BUCKETS`].
    pub fn new(name: &str, help: &str) -> Result<Self> {
        Self::with_buckets(name, help, &DEFAULT_BUCKETS)
    }

    pub fn with_buckets(name: &str, help: &str, buckets: &[f64]) -> Result<Self> {
        Self::with_labels(name, help, &[], buckets)
    }

    pub fn with_labels(
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<Self> {
        let desc = MetricDesc::new(name, help, label_names)?;
        desc.forbid_label("le")?;

        let bounds = validate_buckets(buckets)?;
        Ok(Self {
            desc: Arc::new(desc),
            buckets: Arc::new(bounds),
            children: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<Arc<HistogramChild>> {
        let mut children = self.children.lock().unwrap_or_else(|e| e.into_inner());
        let cache_key: Vec<String> = values.iter().map(|v| v.to_string()).collect();

        if let Some(child) = children.get(&cache_key) {
            return Ok(Arc::clone(child));
        }

        let child = Arc::new(HistogramChild::bind(&self.desc, &self.buckets, values)?);
        children.insert(cache_key, Arc::clone(&child));
        Ok(child)
    }

    /// Shortcut for the unlabeled child.
    pub fn observe(&self, value: f64) {
        match self.with_label_values(&[]) {
            Ok(child) => child.observe(value),
            Err(err) => warn!("histogram {}: {}", self.desc.name, err),
        }
    }
}

/// A histogram bound to one label set, with one value slot per bucket
/// plus the sum and count slots.
pub struct HistogramChild {
    buckets: Vec<(f64, ValueBackend)>,
    inf_bucket: ValueBackend,
    sum: ValueBackend,
    count: ValueBackend,
}

impl HistogramChild {
    fn bind(desc: &MetricDesc, bounds: &[f64], values: &[&str]) -> Result<Self> {
        let labels = desc.label_pairs(values)?;

        let mut buckets = Vec::with_capacity(bounds.len());
        for &bound in bounds {
            let mut bucket_labels = labels.clone();
            bucket_labels.push(("le".to_string(), Value::String(format_bound(bound))));
            let key = MetricKey::new(
                &desc.name,
                format!("{}_bucket", desc.name),
                bucket_labels,
            );
            buckets.push((bound, ValueBackend::for_key("histogram", &key)?));
        }

        let mut inf_labels = labels.clone();
        inf_labels.push(("le".to_string(), Value::String("+Inf".to_string())));
        let inf_key = MetricKey::new(
            &desc.name,
            format!("{}_bucket", desc.name),
            inf_labels,
        );
        let sum_key = MetricKey::new(&desc.name, format!("{}_sum", desc.name), labels.clone());
        let count_key = MetricKey::new(&desc.name, format!("{}_count", desc.name), labels);

        let child = Self {
            buckets,
            inf_bucket: ValueBackend::for_key("histogram", &inf_key)?,
            sum: ValueBackend::for_key("histogram", &sum_key)?,
            count: ValueBackend::for_key("histogram", &count_key)?,
        };

        // Materialize every slot so an idle child still exposes its full
        // bucket ladder.
        for (_, backend) in &child.buckets {
            backend.touch()?;
        }
        child.inf_bucket.touch()?;
        child.sum.touch()?;
        child.count.touch()?;

        Ok(child)
    }

    pub fn observe(&self, value: f64) {
        let outcome = (|| -> Result<()> {
            for (bound, backend) in &self.buckets {
                if value <= *bound {
                    backend.inc_by(1.0)?;
                }
            }
            self.inf_bucket.inc_by(1.0)?;
            self.sum.inc_by(value)?;
            self.count.inc_by(1.0)
        })();

        if let Err(err) = outcome {
            warn!("failed to record histogram observation: {err}");
        }
    }

    /// Current count of observations (the `+Inf` bucket).
    pub fn count(&self) -> f64 {
        self.inf_bucket.get().unwrap_or_else(|err| {
            warn!("failed to read histogram count: {err}");
            0.0
        })
    }

    pub fn sum(&self) -> f64 {
        self.sum.get().unwrap_or_else(|err| {
            warn!("failed to read histogram sum: {err}");
            0.0
        })
    }
}

fn validate_buckets(buckets: &[f64]) -> Result<Vec<f64>> {
    let mut bounds: Vec<f64> = Vec::with_capacity(buckets.len());
    for &bound in buckets {
        if bound.is_nan() {
            return Err(StoreError::InvalidMetric(
                "histogram buckets must not be NaN".to_string(),
            ));
        }
        // The +Inf bucket is implicit; a trailing explicit one is fine.
        if bound == f64::INFINITY {
            continue;
        }
        if let Some(&last) = bounds.last()
            && bound <= last
        {
            return Err(StoreError::InvalidMetric(format!(
                "histogram buckets must be strictly increasing (saw {last} then {bound})"
            )));
        }
        bounds.push(bound);
    }
    Ok(bounds)
}

/// Renders a bucket bound the way other Prometheus clients do: integral
/// bounds without a decimal point, `+Inf` for the implicit bucket.
fn format_bound(bound: f64) -> String {
    if bound == f64::INFINITY {
        "+Inf".to_string()
    } else if bound == bound.trunc() && bound.abs() < 1e15 {
        format!("{}", bound as i64)
    } else {
        format!("{bound}")
    }
}
