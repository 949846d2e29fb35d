use crate::error::{Result, StoreError};

/// Checks a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_' || first == ':')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidMetric(format!(
            "invalid metric name {name:?}"
        )))
    }
}

/// Checks a label name against `[a-zA-Z_][a-zA-Z0-9_]*` and rejects the
/// reserved `__` prefix.
pub fn validate_label_name(name: &str) -> Result<()> {
    if name.starts_with("__") {
        return Err(StoreError::InvalidMetric(format!(
            "label name {name:?} uses the reserved __ prefix"
        )));
    }

    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidMetric(format!(
            "invalid label name {name:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names() {
        assert!(validate_metric_name("http_requests_total").is_ok());
        assert!(validate_metric_name("ns:subsystem:count").is_ok());
        assert!(validate_metric_name("_hidden").is_ok());

        assert!(validate_metric_name("").is_err());
        assert!(validate_metric_name("2xx").is_err());
        assert!(validate_metric_name("has space").is_err());
        assert!(validate_metric_name("has-dash").is_err());
    }

    #[test]
    fn label_names() {
        assert!(validate_label_name("code").is_ok());
        assert!(validate_label_name("_internal").is_ok());

        assert!(validate_label_name("__reserved").is_err());
        assert!(validate_label_name("").is_err());
        assert!(validate_label_name("with:colon").is_err());
        assert!(validate_label_name("9code").is_err());
    }
}
