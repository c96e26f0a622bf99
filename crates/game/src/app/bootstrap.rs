use engine::{
    compile_def_database, resolve_app_paths, AppError, InputAction, LoopConfig, ScriptedInput,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::gameplay::layout::Layout;
use super::gameplay::session::GameSession;
use super::settings::{load_settings, SettingsError};

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) session: GameSession,
    pub(crate) input: ScriptedInput,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Stealth Startup ===");

    let paths = resolve_app_paths().map_err(AppError::from)?;
    info!(root = %paths.root.display(), "app_paths_resolved");
    let defs = compile_def_database(&paths).map_err(AppError::from)?;
    info!(
        defs = defs.def_count(),
        fingerprint = %defs.fingerprint(),
        "content_compiled"
    );
    let settings = load_settings(&paths.settings_path)?;

    let session = GameSession::new(defs, Layout::demo(), settings.session_config());
    let input = demo_script();
    info!(scheduled_events = input.scheduled_event_count(), "demo_script_ready");

    Ok(AppWiring {
        config: settings.loop_config(),
        session,
        input,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

/// Scripted play-through of the bundled level at 60 ticks per second and the
/// default walking speed of 5 units per second (12 ticks per unit).
fn demo_script() -> ScriptedInput {
    use InputAction::{
        Interact, MoveForward, MoveLeft, MoveRight, PrimaryUse, ToggleInjection,
        ToggleScrewdriver, ToggleTorch,
    };

    ScriptedInput::new()
        // Tutorial: walk up to the torch while the intro plays.
        .tap(10, MoveForward, 36)
        .tap(340, Interact, 1)
        .tap(350, MoveRight, 36)
        .tap(400, Interact, 1)
        .tap(410, MoveForward, 48)
        .tap(470, Interact, 1)
        .tap(490, Interact, 1)
        // Light the torch for a moment.
        .tap(500, ToggleTorch, 1)
        .tap(510, PrimaryUse, 30)
        .tap(550, ToggleTorch, 1)
        // Screwdriver, then the cellar door.
        .tap(560, MoveRight, 36)
        .tap(600, MoveForward, 24)
        .tap(630, Interact, 1)
        .tap(640, MoveForward, 36)
        .tap(680, MoveRight, 24)
        .tap(710, ToggleScrewdriver, 1)
        .tap(720, Interact, 1)
        // Speed vial.
        .tap(910, MoveLeft, 96)
        .tap(1020, Interact, 1)
        .tap(1030, ToggleInjection, 1)
        .tap(1040, PrimaryUse, 1)
        // Ending: step into the trigger, wait out the line, open the door.
        .tap(1050, MoveForward, 12)
        .tap(1380, MoveForward, 12)
        .tap(1410, Interact, 1)
}
