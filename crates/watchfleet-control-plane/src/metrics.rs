//! Prometheus metrics collection and formatting.
//!
//! This module provides metrics in Prometheus text exposition format.

use std::fmt::Write;

use crate::scheduler::{Scheduler, StatusSnapshot};

/// Collect all metrics from the scheduler and format as Prometheus text.
pub async fn collect_metrics(scheduler: &Scheduler) -> String {
    let snapshot = scheduler.snapshot().await;
    let mut output = String::new();

    collect_device_metrics(&snapshot, &mut output);
    collect_task_metrics(&snapshot, &mut output);
    collect_video_metrics(&snapshot, &mut output);
    collect_session_metrics(&snapshot, &mut output);

    output
}

fn gauge(output: &mut String, name: &str, help: &str, values: &[(&str, u64)]) {
    writeln!(output, "# HELP {name} {help}").ok();
    writeln!(output, "# TYPE {name} gauge").ok();
    for (status, value) in values {
        writeln!(output, "{name}{{status=\"{status}\"}} {value}").ok();
    }
}

/// Device counts by status.
fn collect_device_metrics(snapshot: &StatusSnapshot, output: &mut String) {
    let d = &snapshot.devices;
    gauge(
        output,
        "watchfleet_devices",
        "Number of registered devices by status",
        &[
            ("idle", d.idle as u64),
            ("busy", d.busy as u64),
            ("offline", d.offline as u64),
            ("error", d.error as u64),
            ("overheat", d.overheat as u64),
        ],
    );
}

/// Task counts by status.
fn collect_task_metrics(snapshot: &StatusSnapshot, output: &mut String) {
    let t = &snapshot.tasks;
    writeln!(output).ok();
    gauge(
        output,
        "watchfleet_tasks",
        "Number of tasks by status",
        &[
            ("queued", t.queued as u64),
            ("assigned", t.assigned as u64),
            ("running", t.running as u64),
            ("completed", t.completed as u64),
            ("failed", t.failed as u64),
            ("cancelled", t.cancelled as u64),
        ],
    );
}

fn collect_video_metrics(snapshot: &StatusSnapshot, output: &mut String) {
    let v = &snapshot.videos;
    writeln!(output).ok();
    gauge(
        output,
        "watchfleet_videos",
        "Number of videos by status",
        &[
            ("pending", v.pending as u64),
            ("processing", v.processing as u64),
            ("completed", v.completed as u64),
            ("error", v.error as u64),
        ],
    );
}

/// Session counters since start.
fn collect_session_metrics(snapshot: &StatusSnapshot, output: &mut String) {
    let s = &snapshot.stats;
    writeln!(output).ok();
    writeln!(output, "# HELP watchfleet_attempts_total Finished session attempts by outcome").ok();
    writeln!(output, "# TYPE watchfleet_attempts_total counter").ok();
    writeln!(output, "watchfleet_attempts_total{{outcome=\"completed\"}} {}", s.completed).ok();
    writeln!(output, "watchfleet_attempts_total{{outcome=\"failed\"}} {}", s.failed_attempts).ok();
    writeln!(output, "watchfleet_attempts_total{{outcome=\"cancelled\"}} {}", s.cancelled).ok();

    writeln!(output).ok();
    writeln!(output, "# HELP watchfleet_watch_seconds_total Seconds watched across completed sessions").ok();
    writeln!(output, "# TYPE watchfleet_watch_seconds_total counter").ok();
    writeln!(output, "watchfleet_watch_seconds_total {}", s.total_watch_secs).ok();

    writeln!(output).ok();
    writeln!(output, "# HELP watchfleet_discoveries_total Successful discoveries by search type").ok();
    writeln!(output, "# TYPE watchfleet_discoveries_total counter").ok();
    for entry in &s.search_types {
        writeln!(
            output,
            "watchfleet_discoveries_total{{search_type=\"{}\"}} {}",
            entry.search_type, entry.count
        )
        .ok();
    }

    writeln!(output).ok();
    writeln!(output, "# HELP watchfleet_scheduler_running Whether the dispatch loop is running").ok();
    writeln!(output, "# TYPE watchfleet_scheduler_running gauge").ok();
    writeln!(output, "watchfleet_scheduler_running {}", snapshot.running as u8).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::Config;
    use crate::state::AppState;
    use crate::testing::{FakeActuator, FakeProvider};

    #[tokio::test]
    async fn test_collect_metrics_empty_state() {
        let config = Config::default();
        let state = AppState::new(&config);
        state.fleet.register("s1", "Pixel 7", "pc-1").await.unwrap();
        let scheduler = Scheduler::new(
            state,
            config,
            Arc::new(FakeProvider::new(FakeActuator::new())),
        );
        let output = collect_metrics(&scheduler).await;

        assert!(output.contains("# TYPE watchfleet_devices gauge"));
        assert!(output.contains("watchfleet_devices{status=\"idle\"} 1"));
        assert!(output.contains("watchfleet_tasks{status=\"queued\"} 0"));
        assert!(output.contains("watchfleet_videos{status=\"pending\"} 0"));
        assert!(output.contains("watchfleet_attempts_total{outcome=\"failed\"} 0"));
        assert!(output.contains("watchfleet_discoveries_total{search_type=\"direct_url\"} 0"));
        assert!(output.contains("watchfleet_scheduler_running 0"));
    }
}
