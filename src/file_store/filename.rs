use crate::file_store::constants::DB_EXTENSION;
use std::fmt;
use std::str::FromStr;

/// The four Prometheus metric kinds a dict file can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "counter" => Ok(MetricType::Counter),
            "gauge" => Ok(MetricType::Gauge),
            "histogram" => Ok(MetricType::Histogram),
            "summary" => Ok(MetricType::Summary),
            _ => Err(()),
        }
    }
}

/// How per-process gauge contributions merge into one scrape.
///
/// Counters, histograms and summaries always sum; gauges pick their rule
/// here. `All` and `LiveAll` keep one sample per process, tagged with a
/// `pid` label, instead of collapsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiprocessMode {
    Min,
    Max,
    LiveSum,
    LiveAll,
    All,
}

impl MultiprocessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiprocessMode::Min => "min",
            MultiprocessMode::Max => "max",
            MultiprocessMode::LiveSum => "livesum",
            MultiprocessMode::LiveAll => "liveall",
            MultiprocessMode::All => "all",
        }
    }

    /// Whether merged samples keep one observation per process.
    pub fn keeps_per_process_samples(&self) -> bool {
        matches!(self, MultiprocessMode::All | MultiprocessMode::LiveAll)
    }
}

impl fmt::Display for MultiprocessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiprocessMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "min" => Ok(MultiprocessMode::Min),
            "max" => Ok(MultiprocessMode::Max),
            "livesum" => Ok(MultiprocessMode::LiveSum),
            "liveall" => Ok(MultiprocessMode::LiveAll),
            "all" => Ok(MultiprocessMode::All),
            _ => Err(()),
        }
    }
}

/// Builds the file prefix a metric writes under: `counter`, `histogram`,
/// `summary`, or `gauge_<mode>`.
pub fn file_prefix(metric_type: MetricType, mode: Option<MultiprocessMode>) -> String {
    match (metric_type, mode) {
        (MetricType::Gauge, Some(mode)) => format!("gauge_{mode}"),
        (MetricType::Gauge, None) => format!("gauge_{}", MultiprocessMode::All),
        (other, _) => other.as_str().to_string(),
    }
}

/// Metadata the aggregator reconstructs from a dict filename alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub metric_type: MetricType,
    pub mode: Option<MultiprocessMode>,
    pub pid: String,
}

/// Splits `<type>(_<mode>)?_<pid>(-<n>)?.db` into its fields.
///
/// The `<mode>` segment only exists for gauges. The pid token is opaque
/// and may itself contain underscores, so everything past the fixed
/// positions is rejoined; the `-<n>` writer ordinal is stripped from the
/// tail only when it is all digits.
pub fn parse_filename(basename: &str) -> Option<FileInfo> {
    let stem = basename.strip_suffix(&format!(".{DB_EXTENSION}"))?;
    let parts: Vec<&str> = stem.split('_').collect();

    let metric_type = MetricType::from_str(parts[0]).ok()?;
    let (mode, pid_parts) = match metric_type {
        MetricType::Gauge => {
            let mode = MultiprocessMode::from_str(parts.get(1)?).ok()?;
            (Some(mode), &parts[2..])
        }
        _ => (None, &parts[1..]),
    };

    if pid_parts.is_empty() {
        return None;
    }
    let mut pid = pid_parts.join("_");

    if let Some(dash) = pid.rfind('-') {
        let ordinal = &pid[dash + 1..];
        if !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit()) {
            pid.truncate(dash);
        }
    }
    if pid.is_empty() {
        return None;
    }

    Some(FileInfo {
        metric_type,
        mode,
        pid,
    })
}
