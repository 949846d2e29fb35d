use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The encoded-key quadruple:
/// `[metric_name, sample_name, label_names, label_values]`.
///
/// Serialized as UTF-8 JSON, e.g. `["http_requests_total","http_requests_total",["code"],["200"]]`.
/// The storage layer treats the encoded bytes as opaque; only the writer
/// (when building keys) and the aggregator (when decoding them) interpret
/// the structure.
///
/// Labels are canonicalized at construction: pairs are sorted by label
/// name so the same logical `(metric, labels)` always produces identical
/// bytes regardless of the caller's insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricKey(String, String, Vec<String>, Vec<Value>);

impl MetricKey {
    pub fn new(
        metric_name: impl Into<String>,
        sample_name: impl Into<String>,
        labels: Vec<(String, Value)>,
    ) -> Self {
        let mut labels = labels;
        labels.sort_by(|a, b| a.0.cmp(&b.0));

        let (names, values) = labels.into_iter().unzip();
        Self(metric_name.into(), sample_name.into(), names, values)
    }

    pub fn metric_name(&self) -> &str {
        &self.0
    }

    pub fn sample_name(&self) -> &str {
        &self.1
    }

    pub fn label_names(&self) -> &[String] {
        &self.2
    }

    pub fn label_values(&self) -> &[Value] {
        &self.3
    }

    /// Label pairs with values flattened to strings, the shape samples and
    /// the text formatter use. JSON strings render bare ("200", not
    /// "\"200\""); numbers, booleans and null render as their JSON text.
    pub fn label_strings(&self) -> Vec<(String, String)> {
        self.2
            .iter()
            .zip(self.3.iter())
            .map(|(name, value)| (name.clone(), value_to_label_string(value)))
            .collect()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

fn value_to_label_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
