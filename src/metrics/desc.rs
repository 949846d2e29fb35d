use crate::error::{Result, StoreError};
use crate::metrics::validation::{validate_label_name, validate_metric_name};
use serde_json::Value;

/// Immutable identity of a metric: validated name, help text, and the
/// label names every child must supply values for.
pub(crate) struct MetricDesc {
    pub name: String,
    pub help: String,
    pub label_names: Vec<String>,
}

impl MetricDesc {
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        validate_metric_name(name)?;
        for label in label_names {
            validate_label_name(label)?;
        }

        Ok(Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Zips declared label names with the supplied values, rejecting
    /// cardinality mismatches.
    pub fn label_pairs(&self, values: &[&str]) -> Result<Vec<(String, Value)>> {
        if values.len() != self.label_names.len() {
            return Err(StoreError::InvalidMetric(format!(
                "metric {} expects {} label value(s), got {}",
                self.name,
                self.label_names.len(),
                values.len()
            )));
        }

        Ok(self
            .label_names
            .iter()
            .zip(values.iter())
            .map(|(name, value)| (name.clone(), Value::String((*value).to_string())))
            .collect())
    }

    /// Rejects a label name the runtime reserves for itself (e.g. `pid`
    /// on gauges, `le` on histograms).
    pub fn forbid_label(&self, reserved: &str) -> Result<()> {
        if self.label_names.iter().any(|l| l == reserved) {
            return Err(StoreError::InvalidMetric(format!(
                "label {reserved:?} on metric {} is reserved",
                self.name
            )));
        }
        Ok(())
    }
}
