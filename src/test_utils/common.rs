use std::path::Path;
use std::sync::Once;

use crate::Settings;

static LOGGER_INIT: Once = Once::new();

pub fn enable_logger() {
    LOGGER_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Defaults rooted in `home`, with the port search kept short.
pub fn test_settings(home: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.paths.home_dir = home.to_path_buf();
    settings.ports.search_timeout_ms = 2_000;
    settings
}
