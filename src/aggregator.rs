use crate::error::Result;
use crate::file_store::{
    EntryParser, FileInfo, MetricType, MultiprocessMode, parse_filename,
};
use crate::key_codec::MetricKey;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// One exposition line: sample name, ordered label pairs, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
}

/// The aggregated unit emitted per metric name, in the shape the text
/// formatter consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub samples: Vec<Sample>,
}

/// Merges every `*.db` file under `dir` into one coherent scrape.
///
/// The walk is strictly best-effort: files with foreign names, unreadable
/// files, damaged suffixes and invalid keys all contribute nothing, but
/// none of them fail the scrape. Output is deterministic for a fixed set
/// of files: families are keyed by metric name and samples are ordered
/// by `(sample_name, labels)`.
pub fn aggregate(dir: &Path) -> Result<BTreeMap<String, MetricFamily>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("db") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut merged: BTreeMap<String, Accumulator> = BTreeMap::new();

    for path in &paths {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(info) = parse_filename(name) else {
            warn!("skipping {}: unrecognized dict filename", path.display());
            continue;
        };

        let buf = match std::fs::read(path) {
            Ok(buf) => buf,
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };

        merge_file(&mut merged, &info, &buf);
    }

    debug!(
        "aggregated {} files into {} metric families",
        paths.len(),
        merged.len()
    );

    Ok(merged
        .into_iter()
        .map(|(name, accum)| (name.clone(), accum.into_family(name)))
        .collect())
}

/// Per-metric merge state. Keying samples by `(sample_name, labels)`
/// makes every mode uniform: modes that keep per-process samples get a
/// `pid` label appended, so their keys never collide across processes.
struct Accumulator {
    metric_type: MetricType,
    samples: BTreeMap<(String, Vec<(String, String)>), f64>,
}

/// How two contributions for the same sample key combine.
#[derive(Clone, Copy)]
enum MergeOp {
    Sum,
    Min,
    Max,
    /// Keys are already distinct per process; last write wins within one.
    Keep,
}

fn merge_op(info: &FileInfo) -> MergeOp {
    match (info.metric_type, info.mode) {
        (MetricType::Gauge, Some(MultiprocessMode::Min)) => MergeOp::Min,
        (MetricType::Gauge, Some(MultiprocessMode::Max)) => MergeOp::Max,
        (MetricType::Gauge, Some(MultiprocessMode::LiveSum)) => MergeOp::Sum,
        (MetricType::Gauge, _) => MergeOp::Keep,
        _ => MergeOp::Sum,
    }
}

fn merge_file(merged: &mut BTreeMap<String, Accumulator>, info: &FileInfo, buf: &[u8]) {
    let op = merge_op(info);
    let tag_pid = info
        .mode
        .is_some_and(|mode| mode.keeps_per_process_samples());

    for entry in EntryParser::lenient(buf).flatten() {
        let key = match MetricKey::decode(entry.key) {
            Ok(key) => key,
            Err(err) => {
                warn!("dropping sample with invalid key: {}", err);
                continue;
            }
        };

        let mut labels = key.label_strings();
        if tag_pid {
            labels.push(("pid".to_string(), info.pid.clone()));
        }

        let accum = merged
            .entry(key.metric_name().to_string())
            .or_insert_with(|| Accumulator {
                metric_type: info.metric_type,
                samples: BTreeMap::new(),
            });

        if accum.metric_type != info.metric_type {
            warn!(
                "metric {} seen as both {} and {}; keeping {}",
                key.metric_name(),
                accum.metric_type,
                info.metric_type,
                accum.metric_type
            );
            continue;
        }

        let slot = accum
            .samples
            .entry((key.sample_name().to_string(), labels));
        match op {
            MergeOp::Sum => {
                *slot.or_insert(0.0) += entry.value;
            }
            MergeOp::Min => {
                let current = slot.or_insert(f64::INFINITY);
                *current = current.min(entry.value);
            }
            MergeOp::Max => {
                let current = slot.or_insert(f64::NEG_INFINITY);
                *current = current.max(entry.value);
            }
            MergeOp::Keep => {
                *slot.or_insert(entry.value) = entry.value;
            }
        }
    }
}

impl Accumulator {
    fn into_family(self, name: String) -> MetricFamily {
        let samples = self
            .samples
            .into_iter()
            .map(|((sample_name, labels), value)| Sample {
                name: sample_name,
                labels,
                value,
            })
            .collect();

        MetricFamily {
            name,
            help: "Multiprocess metric".to_string(),
            metric_type: self.metric_type,
            samples,
        }
    }
}
