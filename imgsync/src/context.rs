//! Application context that holds resolved configuration
//!
//! The context is built following the precedence order:
//! 1. Default values
//! 2. Config file values
//! 3. Environment variables
//! 4. CLI flags
//!
//! Once built, the context is passed as read-only throughout the application.

use libimgsync::{Cloud, Config};
use std::path::{Path, PathBuf};

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub verbose: u8,
    pub cloud: Option<Cloud>,
    pub listen: Option<String>,
}

/// Application context with resolved configuration
#[derive(Debug, Clone)]
pub struct AppContext {
    /// Resolved configuration
    pub config: Config,
}

impl AppContext {
    /// Build context from the process environment.
    pub fn build(cli: CliOverrides) -> libimgsync::Result<Self> {
        Self::build_with(cli, default_config_path(), |key| std::env::var(key).ok())
    }

    /// Build context with an explicit default file location and environment.
    pub fn build_with<F>(
        cli: CliOverrides,
        default_path: Option<PathBuf>,
        lookup: F,
    ) -> libimgsync::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let path = match cli.config_path {
            Some(path) => Some(path),
            None => default_path.filter(|p| p.exists()),
        };

        let mut config = Config::load(path.as_deref())?;
        config.apply_env(lookup)?;

        if let Some(cloud) = cli.cloud {
            config.falcon.cloud = cloud;
        }
        if let Some(listen) = cli.listen {
            config.server.listen = listen;
        }
        if cli.verbose > 0 {
            config.logging.debug = true;
        }

        config.validate()?;
        Ok(Self { config })
    }

    /// Log filter used when `RUST_LOG` is not set.
    pub fn log_directives(&self) -> &'static str {
        if self.config.logging.debug {
            "imgsync=debug,libimgsync=debug"
        } else {
            "imgsync=info,libimgsync=info"
        }
    }
}

/// `$XDG_CONFIG_HOME/imgsync/config.yaml`, or the platform equivalent.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| config_file_in(&dir))
}

fn config_file_in(dir: &Path) -> PathBuf {
    dir.join("imgsync").join("config.yaml")
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
