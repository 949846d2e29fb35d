//! # Multiproc Metrics
//!
//! This crate provides Prometheus-compatible metrics collection for
//! pre-fork process pools. Each worker process records observations into
//! its own memory-mapped append-only files; a single exporter process
//! later merges every worker's contribution into one coherent scrape.
//! There is no inter-process coordination on the hot path:
//! - **Lock-free recording**: each process owns its files outright via
//!   advisory locks taken once at allocation time.
//! - **Append-only dict files** encoding `(key, f64)` pairs with a
//!   write-then-publish header, so concurrent scrapers never see torn
//!   entries.
//! - **Crash tolerance**: a truncated or corrupt file yields its largest
//!   well-formed prefix and never fails the scrape.
//! - **Type-aware merging**: counters, histograms and summaries sum;
//!   gauges pick min/max/livesum or keep one sample per process.
//!
//! ## Recording and scraping
//! ```rust
//! use multiproc_metrics::{Counter, Settings, aggregate, configure};
//! use tempfile::tempdir;
//!
//! let dir = tempdir().expect("Failed to create temp dir");
//! configure(Settings::new(dir.path()));
//!
//! let requests = Counter::new("requests_total", "Requests served").unwrap();
//! requests.inc();
//! requests.inc();
//!
//! // In production the exporter is a different process; it only needs
//! // the directory.
//! let families = aggregate(dir.path()).unwrap();
//! let family = &families["requests_total"];
//! assert_eq!(family.samples.len(), 1);
//! assert_eq!(family.samples[0].value, 2.0);
//! ```
//!
//! ## Gauges across processes
//! ```rust
//! use multiproc_metrics::{Gauge, MultiprocessMode, Settings, aggregate, configure, exposition};
//! use tempfile::tempdir;
//!
//! let dir = tempdir().expect("Failed to create temp dir");
//! configure(Settings::new(dir.path()));
//!
//! let in_flight =
//!     Gauge::with_mode("in_flight", "In-flight requests", MultiprocessMode::LiveSum).unwrap();
//! in_flight.set(3.0);
//!
//! let families = aggregate(dir.path()).unwrap();
//! let text = exposition::render(&families);
//! assert!(text.contains("in_flight 3"));
//! ```
//!
//! ## Safety notes
//! - Dict files only ever grow; entry offsets are stable for the life of
//!   a file, so stale read-only mappings stay valid.
//! - Value slots are 8-byte aligned and written with single aligned
//!   stores; readers observe each `f64` atomically.

pub mod aggregator;
pub use aggregator::{MetricFamily, Sample, aggregate};

pub mod error;
pub use error::{Result, StoreError};

pub mod exposition;

pub mod file_store;
pub use file_store::{
    EntryParser, MetricType, MmapedDict, MmapedFile, MultiprocessMode, ParseMode, RawEntry,
};

pub mod key_codec;
pub use key_codec::MetricKey;

pub mod metrics;
pub use metrics::{Counter, Gauge, Histogram, MetricValue, Summary};

pub mod registry;
pub use registry::{Settings, configure, sync_all};
