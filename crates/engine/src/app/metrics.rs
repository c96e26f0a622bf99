use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub tps: f32,
    pub tick_time_ms: f32,
    pub max_tick_time_ms: f32,
    pub ticks_total: u64,
}

#[derive(Clone, Debug)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl Default for MetricsHandle {
    fn default() -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(LoopMetricsSnapshot::default())),
        }
    }
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    ticks: u32,
    ticks_total: u64,
    tick_time_sum: Duration,
    tick_time_max: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    pub(crate) fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            interval_start: start,
            interval,
            ticks: 0,
            ticks_total: 0,
            tick_time_sum: Duration::ZERO,
            tick_time_max: Duration::ZERO,
        }
    }

    pub(crate) fn record_tick(&mut self, tick_time: Duration) {
        self.ticks = self.ticks.saturating_add(1);
        self.ticks_total = self.ticks_total.saturating_add(1);
        self.tick_time_sum = self.tick_time_sum.saturating_add(tick_time);
        self.tick_time_max = self.tick_time_max.max(tick_time);
    }

    pub(crate) fn ticks_total(&self) -> u64 {
        self.ticks_total
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        Some(self.take_snapshot(now, elapsed))
    }

    /// Flushes whatever the current interval holds, used at shutdown.
    pub(crate) fn final_snapshot(&mut self, now: Instant) -> LoopMetricsSnapshot {
        let elapsed = now.saturating_duration_since(self.interval_start);
        self.take_snapshot(now, elapsed)
    }

    fn take_snapshot(&mut self, now: Instant, elapsed: Duration) -> LoopMetricsSnapshot {
        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let tick_time_ms = if self.ticks == 0 {
            0.0
        } else {
            (self.tick_time_sum.as_secs_f32() / self.ticks as f32) * 1000.0
        };

        let snapshot = LoopMetricsSnapshot {
            tps: self.ticks as f32 / elapsed_seconds,
            tick_time_ms,
            max_tick_time_ms: self.tick_time_max.as_secs_f32() * 1000.0,
            ticks_total: self.ticks_total,
        };

        self.interval_start = now;
        self.ticks = 0;
        self.tick_time_sum = Duration::ZERO;
        self.tick_time_max = Duration::ZERO;

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock;
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<LoopMetricsSnapshot>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn snapshot_computes_expected_values() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));

        accumulator.record_tick(Duration::from_millis(2));
        accumulator.record_tick(Duration::from_millis(4));
        accumulator.record_tick(Duration::from_millis(6));
        accumulator.record_tick(Duration::from_millis(4));

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.tick_time_ms - 4.0).abs() < 0.001);
        assert!((snapshot.max_tick_time_ms - 6.0).abs() < 0.001);
        assert_eq!(snapshot.ticks_total, 4);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn ticks_total_survives_interval_reset() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::starting_at(base, Duration::from_secs(1));
        accumulator.record_tick(Duration::ZERO);
        let _ = accumulator.maybe_snapshot(base + Duration::from_secs(1));
        accumulator.record_tick(Duration::ZERO);

        let last = accumulator.final_snapshot(base + Duration::from_secs(2));
        assert_eq!(last.ticks_total, 2);
        assert_eq!(accumulator.ticks_total(), 2);
    }

    #[test]
    fn snapshot_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let snapshot = handle.snapshot();
        assert_eq!(snapshot, LoopMetricsSnapshot::default());
    }

    #[test]
    fn publish_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.snapshot.as_ref());

        let expected = LoopMetricsSnapshot {
            tps: 60.0,
            tick_time_ms: 0.5,
            max_tick_time_ms: 1.5,
            ticks_total: 120,
        };
        handle.publish(expected);

        assert_eq!(handle.snapshot(), expected);
    }
}
