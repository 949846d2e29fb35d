mod counter;
pub use counter::{Counter, CounterChild};

mod desc;

mod gauge;
pub use gauge::{Gauge, GaugeChild};

mod histogram;
pub use histogram::{DEFAULT_BUCKETS, Histogram, HistogramChild};

mod summary;
pub use summary::{Summary, SummaryChild};

mod validation;
pub use validation::{validate_label_name, validate_metric_name};

mod value;
pub use value::{MetricValue, ValueBackend};
