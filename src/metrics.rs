// Metrics hooks for the matching engine.
//
// Callers install a global `MatchMetrics` implementation via
// [`set_match_metrics`], then every `BruteForceMatcher` reports per-call
// latency and workload dimensions. This keeps instrumentation decoupled from
// any specific metrics backend.
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;

use crate::dist::DistType;

/// Metrics observer for match operations.
pub trait MatchMetrics: Send + Sync {
    /// Record one completed knn-match call.
    ///
    /// `queries` and `train_rows` are the descriptor-set sizes, `k` the
    /// requested neighbor count, and `latency` the wall-clock duration of
    /// the call including the pairwise-distance fill and selection.
    fn record_knn_match(
        &self,
        dist_type: DistType,
        queries: usize,
        train_rows: usize,
        k: usize,
        latency: Duration,
    );
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn MatchMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn MatchMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

pub(crate) fn metrics_recorder() -> Option<Arc<dyn MatchMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

/// Install or clear the global match metrics recorder.
///
/// This is typically called once during startup so all matcher instances
/// share the same metrics backend.
pub fn set_match_metrics(recorder: Option<Arc<dyn MatchMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("match metrics lock poisoned");
    *guard = recorder;
}
