use reinvent_pilot::core::models::run::RunConfiguration;
use reinvent_pilot::engine::launcher::Launcher;
use reinvent_pilot::engine::layout::RunLayout;

#[derive(Debug)]
pub struct AppConfig {
    pub run_config: RunConfiguration,
    pub layout: RunLayout,
    pub launcher: Launcher,
}
