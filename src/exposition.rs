use crate::aggregator::MetricFamily;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Renders aggregated families as Prometheus text format 0.0.4.
///
/// Families arrive keyed by metric name, so the output order is stable
/// across scrapes of the same directory.
pub fn render(families: &BTreeMap<String, MetricFamily>) -> String {
    let mut out = String::new();

    for family in families.values() {
        let _ = writeln!(out, "# HELP {} {}", family.name, escape_help(&family.help));
        let _ = writeln!(out, "# TYPE {} {}", family.name, family.metric_type);

        for sample in &family.samples {
            if sample.labels.is_empty() {
                let _ = writeln!(out, "{} {}", sample.name, format_value(sample.value));
            } else {
                let rendered: Vec<String> = sample
                    .labels
                    .iter()
                    .map(|(name, value)| format!("{name}=\"{}\"", escape_label_value(value)))
                    .collect();
                let _ = writeln!(
                    out,
                    "{}{{{}}} {}",
                    sample.name,
                    rendered.join(","),
                    format_value(sample.value)
                );
            }
        }
    }

    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Integral values render without a fraction; IEEE specials use the
/// exposition-format spellings.
fn format_value(value: f64) -> String {
    if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
