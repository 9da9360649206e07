use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::ShardedLruMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// Writes the Prometheus text exposition format so the output can be served
/// on a scrape endpoint or forwarded to an OpenTelemetry collector. Write
/// errors are ignored; metrics are observational.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, suffix: &str, value: u64) {
        let name = self.metric_name(suffix);
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<ShardedLruMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &ShardedLruMetricsSnapshot) {
        let counters = [
            ("get_calls_total", snapshot.get_calls),
            ("get_hits_total", snapshot.get_hits),
            ("get_misses_total", snapshot.get_misses),
            ("insert_calls_total", snapshot.insert_calls),
            ("insert_new_total", snapshot.insert_new),
            ("insert_updates_total", snapshot.insert_updates),
            ("removes_total", snapshot.removes),
            ("clears_total", snapshot.clears),
            ("flush_triggers_total", snapshot.flush_triggers),
            ("flush_coalesced_total", snapshot.flush_coalesced),
            ("eviction_passes_total", snapshot.eviction_passes),
            ("evicted_entries_total", snapshot.evicted_entries),
            ("bucket_recomputes_total", snapshot.bucket_recomputes),
        ];
        for (suffix, value) in counters {
            self.write_metric("counter", suffix, value);
        }

        self.write_metric("gauge", "len", snapshot.cache_len as u64);
        self.write_metric("gauge", "capacity", snapshot.capacity as u64);
        self.write_metric(
            "gauge",
            "occupied_buckets",
            snapshot.occupied_buckets as u64,
        );
    }
}
