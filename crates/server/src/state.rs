use wavesmith_core::{BatchController, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    controller: BatchController,
}

impl AppState {
    pub fn new(config: Config, controller: BatchController) -> Self {
        Self { config, controller }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn controller(&self) -> &BatchController {
        &self.controller
    }
}
