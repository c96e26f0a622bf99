use std::process::ExitCode;

use engine::{run_headless, MetricsHandle, SceneWorld, StopReason};
use tracing::{error, info};

use super::bootstrap::{AppWiring, BootstrapError};

pub(crate) fn run(app: Result<AppWiring, BootstrapError>) -> ExitCode {
    let mut app = match app {
        Ok(app) => app,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let metrics = MetricsHandle::default();
    let mut world = SceneWorld::default();
    let summary = run_headless(
        &app.config,
        &mut app.session,
        &mut world,
        &mut app.input,
        &metrics,
    );
    let final_metrics = metrics.snapshot();
    info!(
        ticks_run = summary.ticks_run,
        stop_reason = ?summary.stop_reason,
        dropped_backlog_ms = summary.dropped_backlog.as_millis() as u64,
        tps = final_metrics.tps,
        max_tick_time_ms = final_metrics.max_tick_time_ms,
        "run_finished"
    );
    if summary.stop_reason == StopReason::MaxTicks {
        info!("tick_limit_reached_before_session_finished");
    }

    ExitCode::SUCCESS
}
