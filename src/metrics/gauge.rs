use crate::error::Result;
use crate::file_store::{MetricType, MultiprocessMode, file_prefix};
use crate::key_codec::MetricKey;
use crate::metrics::desc::MetricDesc;
use crate::metrics::value::{MetricValue, ValueBackend};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// A value that can go up and down.
///
/// The multiprocess mode chosen at construction decides both the file
/// prefix this process writes under (`gauge_<mode>_<pid>-<n>.db`) and the
/// merge rule the aggregator applies across processes. The `pid` label is
/// reserved: `all`/`liveall` scrapes attach it automatically.
pub struct Gauge {
    desc: Arc<MetricDesc>,
    prefix: String,
    children: Mutex<HashMap<Vec<String>, Arc<ValueBackend>>>,
}

impl Gauge {
    /// An unlabeled gauge in the default `all` mode.
    pub fn new(name: &str, help: &str) -> Result<Self> {
        Self::with_labels(name, help, &[], MultiprocessMode::All)
    }

    pub fn with_mode(name: &str, help: &str, mode: MultiprocessMode) -> Result<Self> {
        Self::with_labels(name, help, &[], mode)
    }

    pub fn with_labels(
        name: &str,
        help: &str,
        label_names: &[&str],
        mode: MultiprocessMode,
    ) -> Result<Self> {
        let desc = MetricDesc::new(name, help, label_names)?;
        desc.forbid_label("pid")?;

        Ok(Self {
            desc: Arc::new(desc),
            prefix: file_prefix(MetricType::Gauge, Some(mode)),
            children: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn help(&self) -> &str {
        &self.desc.help
    }

    pub fn with_label_values(&self, values: &[&str]) -> Result<GaugeChild> {
        Ok(GaugeChild {
            value: self.child(values)?,
        })
    }

    pub fn set(&self, value: f64) {
        self.unlabeled(|child| child.set(value));
    }

    pub fn inc(&self) {
        self.unlabeled(|child| child.inc_by(1.0));
    }

    pub fn dec(&self) {
        self.unlabeled(|child| child.inc_by(-1.0));
    }

    pub fn inc_by(&self, delta: f64) {
        self.unlabeled(|child| child.inc_by(delta));
    }

    pub fn dec_by(&self, delta: f64) {
        self.unlabeled(|child| child.inc_by(-delta));
    }

    pub fn get(&self) -> f64 {
        match self.with_label_values(&[]) {
            Ok(child) => child.get(),
            Err(err) => {
                warn!("gauge {}: {}", self.desc.name, err);
                0.0
            }
        }
    }

    fn unlabeled(&self, op: impl FnOnce(GaugeChild)) {
        match self.with_label_values(&[]) {
            Ok(child) => op(child),
            Err(err) => warn!("gauge {}: {}", self.desc.name, err),
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
        let backend = Arc::new(ValueBackend::for_key(&self.prefix, &key)?);
        backend.touch()?;
        children.insert(cache_key, Arc::clone(&backend));
        Ok(backend)
    }
}

/// A gauge bound to one label set.
pub struct GaugeChild {
    value: Arc<ValueBackend>,
}

impl GaugeChild {
    pub fn set(&self, value: f64) {
        if let Err(err) = self.value.set(value) {
            warn!("failed to record gauge value: {err}");
        }
    }

    pub fn inc(&self) {
        self.inc_by(1.0);
    }

    pub fn dec(&self) {
        self.inc_by(-1.0);
    }

    pub fn inc_by(&self, delta: f64) {
        if let Err(err) = self.value.inc_by(delta) {
            warn!("failed to record gauge change: {err}");
        }
    }

    pub fn dec_by(&self, delta: f64) {
        self.inc_by(-delta);
    }

    pub fn get(&self) -> f64 {
        self.value.get().unwrap_or_else(|err| {
            warn!("failed to read gauge value: {err}");
            0.0
        })
    }
}
