//! Operation counters and latency tracking for the book actor

use crate::events::InstructionKind;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Performance metrics for one order book
pub struct PerformanceMetrics {
    /// Symbol being tracked
    symbol: String,

    /// Operation counters
    levels_added: AtomicU64,
    levels_updated: AtomicU64,
    levels_deleted: AtomicU64,
    queries_served: AtomicU64,
    rejected: AtomicU64,

    /// Largest entry count observed after an instruction
    max_entries: AtomicU64,

    /// Latency tracking
    latency_tracker: LatencyTracker,
}

impl PerformanceMetrics {
    /// Create new performance metrics tracker
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            levels_added: AtomicU64::new(0),
            levels_updated: AtomicU64::new(0),
            levels_deleted: AtomicU64::new(0),
            queries_served: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            max_entries: AtomicU64::new(0),
            latency_tracker: LatencyTracker::new(),
        }
    }

    /// Record a successfully applied instruction
    #[inline]
    pub fn record_applied(&self, kind: InstructionKind, entries: usize, latency_ns: u64) {
        let (counter, op) = match kind {
            InstructionKind::New => (&self.levels_added, OperationType::LevelAdd),
            InstructionKind::Update => (&self.levels_updated, OperationType::LevelUpdate),
            InstructionKind::Delete => (&self.levels_deleted, OperationType::LevelDelete),
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.max_entries.fetch_max(entries as u64, Ordering::AcqRel);
        self.latency_tracker.record_operation(op, latency_ns);
    }

    /// Record a rejected instruction
    #[inline]
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a book query
    #[inline]
    pub fn record_query(&self, latency_ns: u64) {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
        self.latency_tracker.record_operation(OperationType::Query, latency_ns);
    }

    /// Get current metrics snapshot
    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            symbol: self.symbol.clone(),
            levels_added: self.levels_added.load(Ordering::Acquire),
            levels_updated: self.levels_updated.load(Ordering::Acquire),
            levels_deleted: self.levels_deleted.load(Ordering::Acquire),
            queries_served: self.queries_served.load(Ordering::Acquire),
            rejected: self.rejected.load(Ordering::Acquire),
            max_entries: self.max_entries.load(Ordering::Acquire),
            latency_stats: self.latency_tracker.get_stats(),
        }
    }
}

/// Types of book operations for latency tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperationType {
    /// New level
    LevelAdd = 0,
    /// Level update
    LevelUpdate = 1,
    /// Level delete and reindex
    LevelDelete = 2,
    /// Depth query
    Query = 3,
}

const OPERATION_COUNT: usize = 4;

/// Latency tracker using HDR histogram for accurate percentiles
pub struct LatencyTracker {
    histograms: RwLock<[Histogram<u64>; OPERATION_COUNT]>,
    sample_counts: [AtomicU64; OPERATION_COUNT],
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    /// Create new latency tracker
    #[must_use]
    pub fn new() -> Self {
        // Precision 3 gives microsecond accuracy up to ~1 hour.
        // Construction only fails for precision above 5.
        let create_histogram =
            || Histogram::new(3).expect("3 significant figures is a valid precision");

        Self {
            histograms: RwLock::new(std::array::from_fn(|_| create_histogram())),
            sample_counts: Default::default(),
        }
    }

    /// Record a latency measurement
    #[inline]
    pub fn record_operation(&self, op_type: OperationType, latency_ns: u64) {
        let index = op_type as usize;
        self.sample_counts[index].fetch_add(1, Ordering::Relaxed);

        let mut histograms = self.histograms.write();
        let _ = histograms[index].record(latency_ns);
    }

    /// Get latency statistics
    pub fn get_stats(&self) -> LatencyStats {
        let histograms = self.histograms.read();
        let mut stats = LatencyStats::default();

        for (i, hist) in histograms.iter().enumerate() {
            if hist.is_empty() {
                continue;
            }
            let op_stats = OperationLatency {
                count: self.sample_counts[i].load(Ordering::Acquire),
                min: hist.min(),
                max: hist.max(),
                mean: hist.mean() as u64,
                p50: hist.value_at_percentile(50.0),
                p99: hist.value_at_percentile(99.0),
                p999: hist.value_at_percentile(99.9),
            };

            match i {
                0 => stats.level_add = Some(op_stats),
                1 => stats.level_update = Some(op_stats),
                2 => stats.level_delete = Some(op_stats),
                3 => stats.query = Some(op_stats),
                _ => {}
            }
        }

        stats
    }

    /// Reset all histograms
    pub fn reset(&self) {
        let mut histograms = self.histograms.write();
        for hist in histograms.iter_mut() {
            hist.reset();
        }
        for counter in &self.sample_counts {
            counter.store(0, Ordering::Release);
        }
    }
}

/// Latency statistics for an operation type, in nanoseconds
#[derive(Debug, Clone, Default)]
pub struct OperationLatency {
    /// Total number of operations measured
    pub count: u64,
    /// Minimum latency
    pub min: u64,
    /// Maximum latency
    pub max: u64,
    /// Mean latency
    pub mean: u64,
    /// 50th percentile
    pub p50: u64,
    /// 99th percentile
    pub p99: u64,
    /// 99.9th percentile
    pub p999: u64,
}

/// Complete latency statistics
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    /// New level latency
    pub level_add: Option<OperationLatency>,
    /// Update latency
    pub level_update: Option<OperationLatency>,
    /// Delete and reindex latency
    pub level_delete: Option<OperationLatency>,
    /// Depth query latency
    pub query: Option<OperationLatency>,
}

/// Snapshot of all metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Instrument label
    pub symbol: String,
    /// Applied `new` instructions
    pub levels_added: u64,
    /// Applied `update` instructions
    pub levels_updated: u64,
    /// Applied `delete` instructions, including ones that emptied the book
    pub levels_deleted: u64,
    /// Depth queries answered
    pub queries_served: u64,
    /// Instructions refused without changing the book
    pub rejected: u64,
    /// Largest entry count seen after an instruction
    pub max_entries: u64,
    /// Per-operation latency
    pub latency_stats: LatencyStats,
}

impl MetricsSnapshot {
    /// Format metrics as a report
    #[must_use]
    pub fn format_report(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "=== Order Book Metrics: {} ===", self.symbol);
        let _ = writeln!(
            report,
            "Levels: {} added, {} updated, {} deleted",
            self.levels_added, self.levels_updated, self.levels_deleted
        );
        let _ = writeln!(report, "Rejected instructions: {}", self.rejected);
        let _ = writeln!(report, "Queries: {} served", self.queries_served);
        let _ = writeln!(report, "Peak entries: {}", self.max_entries);

        let sections = [
            ("New", &self.latency_stats.level_add),
            ("Update", &self.latency_stats.level_update),
            ("Delete", &self.latency_stats.level_delete),
            ("Query", &self.latency_stats.query),
        ];
        for (name, latency) in sections {
            if let Some(l) = latency {
                let _ = writeln!(report, "\n{name} Latency (ns):");
                let _ = writeln!(report, "  p50: {}, p99: {}, p99.9: {}", l.p50, l.p99, l.p999);
            }
        }

        report
    }
}
