//! Turns playout reports from the render callback into [`StreamEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use crate::event::EventCallback;
use crate::pipeline::{PlayoutReport, TelemetryReceiver};
use crate::playout::PlayoutStats;
use crate::session::SessionState;
use crate::StreamEvent;

/// Diffs successive playout counters to find what changed between reports.
#[derive(Debug, Default)]
pub struct PlayoutMonitor {
    last: PlayoutStats,
}

impl PlayoutMonitor {
    /// Creates a monitor that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events implied by `report`, in the order the buffer produced them.
    pub fn observe(&mut self, report: &PlayoutReport) -> Vec<StreamEvent> {
        let stats = report.stats;
        let last = std::mem::replace(&mut self.last, stats);
        let mut events = Vec::new();

        if stats.resets > last.resets {
            events.push(StreamEvent::PlayoutReset);
        }
        if stats.overflows > last.overflows {
            events.push(StreamEvent::BufferOverflow {
                dropped_samples: stats.dropped_samples - last.dropped_samples,
                max_buffer_samples: report.max_buffer_samples,
            });
        }
        if stats.starts > last.starts {
            events.push(StreamEvent::PlaybackStarted);
        }
        if stats.underruns > last.underruns {
            events.push(StreamEvent::Underrun {
                partial_buffer_samples: report.partial_buffer_samples,
            });
        }

        events
    }
}

/// Polls the telemetry ring until the session stops.
///
/// Every report is diffed so no transition is missed; only the newest one
/// is kept as the session's snapshot.
pub(crate) async fn run_playout_monitor(
    mut reports: TelemetryReceiver,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
    poll_interval: Duration,
) {
    let mut monitor = PlayoutMonitor::new();
    let mut interval = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));

    while state.is_running() {
        interval.tick().await;

        let mut latest = None;
        while let Some(report) = reports.try_recv() {
            for event in monitor.observe(&report) {
                log_event(&event);
                if let Some(ref callback) = event_callback {
                    callback(event);
                }
            }
            latest = Some(report);
        }

        if let Some(report) = latest {
            *state.playout.lock() = Some(report);
        }
    }
}

fn log_event(event: &StreamEvent) {
    match event {
        StreamEvent::BufferOverflow {
            dropped_samples,
            max_buffer_samples,
        } => tracing::warn!(
            dropped_samples,
            max_buffer_samples,
            "playout buffer overflow - oldest audio dropped"
        ),
        StreamEvent::Underrun {
            partial_buffer_samples,
        } => tracing::warn!(partial_buffer_samples, "playout underrun"),
        StreamEvent::PlaybackStarted => tracing::debug!("playout started"),
        StreamEvent::PlayoutReset => tracing::debug!("playout reset"),
        _ => {}
    }
}

/// Spawns the playout monitor as a background task.
pub(crate) fn spawn_playout_monitor(
    reports: TelemetryReceiver,
    state: Arc<SessionState>,
    event_callback: Option<EventCallback>,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_playout_monitor(
        reports,
        state,
        event_callback,
        poll_interval,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Telemetry;
    use crate::pipeline::telemetry_channel;
    use ringbuf::traits::Producer;
    use std::sync::atomic::Ordering;

    fn report(stats: PlayoutStats) -> PlayoutReport {
        PlayoutReport {
            telemetry: Telemetry::default(),
            stats,
            max_buffer_samples: 7,
            partial_buffer_samples: 3,
        }
    }

    #[test]
    fn test_no_change_no_events() {
        let mut monitor = PlayoutMonitor::new();
        assert!(monitor.observe(&report(PlayoutStats::default())).is_empty());
        assert!(monitor.observe(&report(PlayoutStats::default())).is_empty());
    }

    #[test]
    fn test_transitions_become_events() {
        let mut monitor = PlayoutMonitor::new();
        let stats = PlayoutStats {
            starts: 1,
            ..PlayoutStats::default()
        };
        assert_eq!(
            monitor.observe(&report(stats)),
            vec![StreamEvent::PlaybackStarted]
        );

        let stats = PlayoutStats {
            starts: 1,
            underruns: 1,
            overflows: 1,
            dropped_samples: 480,
            ..stats
        };
        assert_eq!(
            monitor.observe(&report(stats)),
            vec![
                StreamEvent::BufferOverflow {
                    dropped_samples: 480,
                    max_buffer_samples: 7,
                },
                StreamEvent::Underrun {
                    partial_buffer_samples: 3,
                },
            ]
        );
    }

    #[test]
    fn test_reset_reported_first() {
        let mut monitor = PlayoutMonitor::new();
        let stats = PlayoutStats {
            resets: 1,
            starts: 1,
            ..PlayoutStats::default()
        };
        assert_eq!(
            monitor.observe(&report(stats)),
            vec![StreamEvent::PlayoutReset, StreamEvent::PlaybackStarted]
        );
    }

    #[tokio::test]
    async fn test_monitor_task_stores_latest_report() {
        let (mut producer, receiver) = telemetry_channel(8);
        let state = Arc::new(SessionState::new());

        let stats = PlayoutStats {
            starts: 1,
            ..PlayoutStats::default()
        };
        producer.try_push(report(PlayoutStats::default())).unwrap();
        producer.try_push(report(stats)).unwrap();

        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        let callback = crate::event_callback(move |event| seen.lock().push(event));

        let handle = spawn_playout_monitor(
            receiver,
            Arc::clone(&state),
            Some(callback),
            Duration::from_millis(1),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        state.running.store(false, Ordering::SeqCst);
        handle.await.unwrap();

        assert_eq!(*events.lock(), vec![StreamEvent::PlaybackStarted]);
        assert_eq!(state.snapshot().playout.map(|p| p.starts), Some(1));
    }
}
