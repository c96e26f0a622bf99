use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::{ContentCompileError, StartupError};

use super::input::{InputFeed, InputSnapshot};
use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, Scene, SceneCommand, SceneWorld};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPacing {
    /// Sleeps between frames so ticks track wall-clock time.
    RealTime,
    /// One tick per frame, no sleeping. Used by tests and batch runs.
    Unpaced,
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_ticks: Option<u64>,
    pub pacing: LoopPacing,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_ticks: None,
            pacing: LoopPacing::RealTime,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to compile content definitions: {0}")]
    Content(#[from] ContentCompileError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxTicks,
    SceneQuit,
    InputQuit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub stop_reason: StopReason,
    pub dropped_backlog: Duration,
}

/// Drives `scene` at a fixed timestep without a window. Per-tick input comes
/// from `input`; the loop ends on a scene `Quit`, an input quit request or
/// `max_ticks`.
pub fn run_headless(
    config: &LoopConfig,
    scene: &mut dyn Scene,
    world: &mut SceneWorld,
    input: &mut dyn InputFeed,
    metrics_handle: &MetricsHandle,
) -> LoopSummary {
    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    scene.load(world);
    world.apply_pending();
    info!(entity_count = world.entity_count(), "scene_loaded");
    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        max_ticks = ?config.max_ticks,
        pacing = ?config.pacing,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut dropped_backlog_total = Duration::ZERO;
    let mut tick: u64 = 0;

    let stop_reason = 'frames: loop {
        let frame_dt = match config.pacing {
            LoopPacing::Unpaced => fixed_dt,
            LoopPacing::RealTime => {
                let now = Instant::now();
                let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                last_frame_instant = now;
                clamp_frame_delta(raw_frame_dt, max_frame_delta)
            }
        };
        accumulator = accumulator.saturating_add(frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            if config.max_ticks.is_some_and(|max| tick >= max) {
                break 'frames StopReason::MaxTicks;
            }

            let snapshot: InputSnapshot = input.snapshot_for_tick(tick);
            if snapshot.quit_requested() {
                info!(reason = "input_quit", tick, "shutdown_requested");
                break 'frames StopReason::InputQuit;
            }

            let tick_started = Instant::now();
            let command = scene.update(fixed_dt_seconds, &snapshot, world);
            world.apply_pending();
            metrics_accumulator.record_tick(tick_started.elapsed());
            tick = tick.saturating_add(1);

            if command == SceneCommand::Quit {
                info!(reason = "scene_quit", tick, "shutdown_requested");
                break 'frames StopReason::SceneQuit;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            dropped_backlog_total = dropped_backlog_total.saturating_add(step_plan.dropped_backlog);
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                tick_time_ms = snapshot.tick_time_ms,
                max_tick_time_ms = snapshot.max_tick_time_ms,
                entity_count = world.entity_count(),
                "loop_metrics"
            );
        }

        if config.pacing == LoopPacing::RealTime {
            let frame_elapsed = Instant::now().saturating_duration_since(last_frame_instant);
            let sleep = compute_cap_sleep(frame_elapsed, Some(fixed_dt));
            if sleep > Duration::ZERO {
                thread::sleep(sleep);
            }
        }
    };

    metrics_handle.publish(metrics_accumulator.final_snapshot(Instant::now()));
    scene.unload(world);
    info!(ticks_run = tick, stop_reason = ?stop_reason, "shutdown");

    LoopSummary {
        ticks_run: tick,
        stop_reason,
        dropped_backlog: dropped_backlog_total,
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}
