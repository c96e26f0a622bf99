mod app {
    pub(crate) mod bootstrap;
    pub(crate) mod gameplay;
    pub(crate) mod loop_runner;
    pub(crate) mod settings;
}

use std::process::ExitCode;

fn main() -> ExitCode {
    let app = app::bootstrap::build_app();
    app::loop_runner::run(app)
}
