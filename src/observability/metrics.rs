//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dashboard_front_door_requests_total` (counter): by route class, status
//! - `dashboard_front_door_request_duration_seconds` (histogram): by route class
//!
//! # Design Decisions
//! - One recorder per dashboard instance, never installed globally, so two
//!   dashboards in one process (tests) keep separate registries
//! - The metrics listener serves its own router built from that recorder
//! - Histogram upkeep runs on a timer for as long as the metrics listener
//!   exists, so samples are drained even when nobody scrapes

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tokio::task::JoinHandle;

/// How often buffered histogram samples are folded into their buckets.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Instance-scoped Prometheus registry.
#[derive(Clone)]
pub struct Metrics {
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
}

impl Metrics {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder: Arc::new(recorder),
            handle,
        }
    }

    /// Run `f` with this registry as the target of the `metrics` macros.
    pub fn scoped<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(self.recorder.as_ref(), f)
    }

    /// Record one front door request.
    pub fn record_request(&self, route: &'static str, status: u16, start_time: Instant) {
        self.scoped(|| {
            metrics::counter!(
                "dashboard_front_door_requests_total",
                "route" => route,
                "status" => status.to_string()
            )
            .increment(1);
            metrics::histogram!(
                "dashboard_front_door_request_duration_seconds",
                "route" => route
            )
            .record(start_time.elapsed().as_secs_f64());
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Fold buffered histogram samples into their buckets.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run upkeep every `interval` until the returned guard is dropped.
    pub fn spawn_upkeep(&self, interval: Duration) -> Upkeep {
        let handle = self.handle.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                handle.run_upkeep();
            }
        });
        Upkeep { task }
    }

    /// Router for the metrics listener.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        let scrape = move || {
            let handle = handle.clone();
            async move { handle.render() }
        };
        Router::new()
            .route("/", get(scrape.clone()))
            .route("/metrics", get(scrape))
    }
}

/// Periodic upkeep task; aborted on drop.
#[derive(Debug)]
pub struct Upkeep {
    task: JoinHandle<()>,
}

impl Upkeep {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Upkeep {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instances_do_not_share_registries() {
        let a = Metrics::new();
        let b = Metrics::new();

        a.record_request("api", 200, Instant::now());

        assert!(a.render().contains("dashboard_front_door_requests_total"));
        assert!(!b.render().contains("dashboard_front_door_requests_total"));
    }

    #[test]
    fn upkeep_keeps_recorded_samples() {
        let metrics = Metrics::new();
        for _ in 0..10 {
            metrics.record_request("api", 200, Instant::now());
        }

        metrics.run_upkeep();

        let text = metrics.render();
        assert!(text.contains("dashboard_front_door_request_duration_seconds"));
        assert!(text.contains("dashboard_front_door_requests_total{route=\"api\",status=\"200\"} 10"));
    }

    #[tokio::test]
    async fn upkeep_task_stops_when_dropped() {
        let metrics = Metrics::new();
        metrics.record_request("ui", 200, Instant::now());

        let upkeep = metrics.spawn_upkeep(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(upkeep.is_running());
        assert!(metrics.render().contains("dashboard_front_door_request_duration_seconds"));

        let task = upkeep.task.abort_handle();
        drop(upkeep);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(task.is_finished());
    }

    #[test]
    fn labels_are_rendered() {
        let metrics = Metrics::new();
        metrics.record_request("ui", 502, Instant::now());

        let text = metrics.render();
        assert!(text.contains("route=\"ui\""));
        assert!(text.contains("status=\"502\""));
    }
}
