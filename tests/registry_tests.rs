#[cfg(test)]
mod tests {

    use multiproc_metrics::{
        Counter, Gauge, Histogram, MultiprocessMode, Settings, Summary, aggregate, configure,
        exposition, registry,
    };
    use serial_test::serial;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::{TempDir, tempdir};

    /// Configures the process-wide registry against a scratch directory
    /// with a controllable pid token.
    fn configure_scratch() -> (TempDir, Arc<AtomicUsize>) {
        let dir = tempdir().expect("Failed to create temp dir");
        let pid = Arc::new(AtomicUsize::new(0));

        let provider_pid = Arc::clone(&pid);
        configure(
            Settings::new(dir.path())
                .with_pid_provider(move || format!("worker_{}", provider_pid.load(Ordering::SeqCst))),
        );

        (dir, pid)
    }

    #[test]
    #[serial]
    fn counter_round_trips_through_the_directory() {
        let (dir, _pid) = configure_scratch();

        let requests = Counter::with_labels("requests_total", "Requests", &["code"])
            .expect("Failed to create counter");
        let ok = requests
            .with_label_values(&["200"])
            .expect("Failed to bind labels");
        ok.inc();
        ok.inc_by(2.0);
        assert_eq!(ok.get(), 3.0);

        // The worker's file exists under its pid token.
        assert!(dir.path().join("counter_worker_0-0.db").exists());

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        let family = &families["requests_total"];
        assert_eq!(family.samples.len(), 1);
        assert_eq!(
            family.samples[0].labels,
            vec![("code".to_string(), "200".to_string())]
        );
        assert_eq!(family.samples[0].value, 3.0);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn pid_change_moves_writes_to_a_fresh_file() {
        let (dir, pid) = configure_scratch();

        let jobs = Counter::new("jobs_total", "Jobs").expect("Failed to create counter");
        jobs.inc();

        // Simulate a fork: the provider now reports a different pid, so
        // the next write must land in a new file while the parent's data
        // stays behind for aggregation.
        pid.store(1, Ordering::SeqCst);
        jobs.inc();

        assert!(dir.path().join("counter_worker_0-0.db").exists());
        assert!(dir.path().join("counter_worker_1-0.db").exists());

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        assert_eq!(families["jobs_total"].samples[0].value, 2.0);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn gauge_all_mode_tags_samples_with_the_pid() {
        let (dir, pid) = configure_scratch();

        let temperature = Gauge::with_mode("temperature", "Temp", MultiprocessMode::All)
            .expect("Failed to create gauge");
        temperature.set(20.5);

        pid.store(1, Ordering::SeqCst);
        temperature.set(21.5);

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        let samples = &families["temperature"].samples;

        assert_eq!(samples.len(), 2);
        assert_eq!(
            samples[0].labels,
            vec![("pid".to_string(), "worker_0".to_string())]
        );
        assert_eq!(samples[0].value, 20.5);
        assert_eq!(
            samples[1].labels,
            vec![("pid".to_string(), "worker_1".to_string())]
        );
        assert_eq!(samples[1].value, 21.5);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn gauge_livesum_collapses_processes() {
        let (dir, pid) = configure_scratch();

        let in_flight = Gauge::with_mode("in_flight", "In flight", MultiprocessMode::LiveSum)
            .expect("Failed to create gauge");
        in_flight.inc_by(3.0);

        pid.store(1, Ordering::SeqCst);
        in_flight.inc_by(4.0);

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        let samples = &families["in_flight"].samples;
        assert_eq!(samples.len(), 1);
        assert!(samples[0].labels.is_empty());
        assert_eq!(samples[0].value, 7.0);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn histogram_writes_cumulative_buckets_and_totals() {
        let (dir, _pid) = configure_scratch();

        let latency =
            Histogram::new("latency_seconds", "Latency").expect("Failed to create histogram");
        latency.observe(0.25);
        latency.observe(3.0);

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        let family = &families["latency_seconds"];

        let bucket = |le: &str| {
            family
                .samples
                .iter()
                .find(|s| {
                    s.name == "latency_seconds_bucket"
                        && s.labels.iter().any(|(n, v)| n == "le" && v == le)
                })
                .unwrap_or_else(|| panic!("missing bucket le={le}"))
                .value
        };
        let total = |name: &str| {
            family
                .samples
                .iter()
                .find(|s| s.name == name)
                .unwrap_or_else(|| panic!("missing sample {name}"))
                .value
        };

        assert_eq!(bucket("0.1"), 0.0);
        assert_eq!(bucket("0.25"), 1.0);
        assert_eq!(bucket("2.5"), 1.0);
        assert_eq!(bucket("5"), 2.0);
        assert_eq!(bucket("+Inf"), 2.0);
        assert_eq!(total("latency_seconds_count"), 2.0);
        assert_eq!(total("latency_seconds_sum"), 3.25);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn summary_tracks_sum_and_count() {
        let (dir, _pid) = configure_scratch();

        let sizes = Summary::new("payload_bytes", "Payload sizes")
            .expect("Failed to create summary");
        sizes.observe(1.5);
        sizes.observe(2.0);

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        let family = &families["payload_bytes"];

        let total = |name: &str| {
            family
                .samples
                .iter()
                .find(|s| s.name == name)
                .unwrap_or_else(|| panic!("missing sample {name}"))
                .value
        };

        assert_eq!(total("payload_bytes_sum"), 3.5);
        assert_eq!(total("payload_bytes_count"), 2.0);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn reset_reopens_files_without_losing_published_data() {
        let (dir, _pid) = configure_scratch();

        let jobs = Counter::new("jobs_total", "Jobs").expect("Failed to create counter");
        jobs.inc();

        registry::reset_and_reinitialize();

        // The next write re-acquires the same slot and keeps accumulating.
        jobs.inc();

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        assert_eq!(families["jobs_total"].samples[0].value, 2.0);
        assert!(dir.path().join("counter_worker_0-0.db").exists());
        assert!(!dir.path().join("counter_worker_0-1.db").exists());

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn unconfigured_metrics_fall_back_to_process_local_values() {
        registry::deconfigure();

        let hits = Counter::new("hits_total", "Hits").expect("Failed to create counter");
        hits.inc();
        hits.inc();
        assert_eq!(hits.get(), 2.0);

        let depth = Gauge::new("depth", "Depth").expect("Failed to create gauge");
        depth.set(5.0);
        depth.dec();
        assert_eq!(depth.get(), 4.0);
    }

    #[test]
    #[serial]
    fn sync_all_flushes_every_open_dict() {
        let (dir, _pid) = configure_scratch();

        let requests = Counter::new("requests_total", "Requests")
            .expect("Failed to create counter");
        requests.inc();
        multiproc_metrics::sync_all();

        let families = aggregate(dir.path()).expect("Failed to aggregate");
        assert_eq!(families["requests_total"].samples[0].value, 1.0);

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn end_to_end_exposition_text() {
        let (dir, _pid) = configure_scratch();

        let requests = Counter::with_labels("http_requests_total", "Requests", &["code"])
            .expect("Failed to create counter");
        requests
            .with_label_values(&["200"])
            .expect("Failed to bind labels")
            .inc_by(10.0);
        requests
            .with_label_values(&["500"])
            .expect("Failed to bind labels")
            .inc();

        let text = exposition::render(&aggregate(dir.path()).expect("Failed to aggregate"));

        assert!(text.contains("# HELP http_requests_total Multiprocess metric\n"));
        assert!(text.contains("# TYPE http_requests_total counter\n"));
        assert!(text.contains("http_requests_total{code=\"200\"} 10\n"));
        assert!(text.contains("http_requests_total{code=\"500\"} 1\n"));

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn reserved_labels_are_rejected_at_construction() {
        let (_dir, _pid) = configure_scratch();

        assert!(Gauge::with_labels("g", "Gauge", &["pid"], MultiprocessMode::All).is_err());
        assert!(Histogram::with_labels("h", "Histogram", &["le"], &[1.0]).is_err());
        assert!(Summary::with_labels("s", "Summary", &["quantile"]).is_err());
        assert!(Counter::with_labels("c", "Counter", &["__meta"]).is_err());
        assert!(Counter::new("0badname", "Counter").is_err());

        registry::deconfigure();
    }

    #[test]
    #[serial]
    fn label_cardinality_mismatch_is_an_error() {
        let (_dir, _pid) = configure_scratch();

        let requests = Counter::with_labels("requests_total", "Requests", &["code"])
            .expect("Failed to create counter");
        assert!(requests.with_label_values(&[]).is_err());
        assert!(requests.with_label_values(&["200", "extra"]).is_err());

        registry::deconfigure();
    }
}
