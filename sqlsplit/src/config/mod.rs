//! Process-wide configuration.

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use lazy_static::lazy_static;
use tracing::{info, warn};

pub use sqlsplit_config::{Config, Error, General, PolicyKind, Role, UseSqlVariablesIn};

lazy_static! {
    static ref CONFIG: ArcSwap<Config> = ArcSwap::from_pointee(Config::default());
}

/// Get currently loaded configuration.
pub fn config() -> Arc<Config> {
    CONFIG.load().clone()
}

/// Load configuration from disk and install it, falling back
/// to defaults if the file doesn't exist.
pub fn load(path: &Path) -> Result<Arc<Config>, Error> {
    let loaded = if path.exists() {
        let loaded = Config::load(path)?;
        info!("loaded \"{}\"", path.display());
        loaded
    } else {
        warn!(
            "\"{}\" doesn't exist, loading defaults instead",
            path.display()
        );
        Config::default()
    };

    set(loaded);
    Ok(config())
}

/// Install new configuration.
pub fn set(config: Config) {
    CONFIG.store(Arc::new(config));
}
