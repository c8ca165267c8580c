use gbsa_prep::engine::config::RunConfig;
use gbsa_prep::workflows::prepare::PrepareOptions;

/// The validated job configuration with command-line overrides applied.
pub struct AppConfig {
    pub run: RunConfig,
    pub options: PrepareOptions,
}
