//! Subcommand implementations.

pub mod bootstrap;
pub mod completion;
pub mod edit;
pub mod step;

use crate::cli::Cli;
use crate::observer::ConsoleObserver;
use anyhow::Context;
use anyhow::Result;
use playbox_core::Observer;
use playbox_core::Pipeline;
use playbox_core::StreamTag;
use playbox_core::ToolchainConfig;
use playbox_core::sink::RecordingObserver;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Configuration file picked up from the current directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG_FILE: &str = "playbox.toml";

/// Resolves the toolchain configuration from `--config`, `playbox.toml` or
/// built-in defaults, then applies `--dir`.
pub fn load_toolchain(config: Option<&Path>, dir: Option<&Path>) -> Result<ToolchainConfig> {
    let mut toolchain = match config {
        Some(path) => ToolchainConfig::load(path)
            .with_context(|| format!("failed to load configuration '{}'", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
            ToolchainConfig::load(Path::new(DEFAULT_CONFIG_FILE))
                .with_context(|| format!("failed to load configuration '{DEFAULT_CONFIG_FILE}'"))?
        }
        None => ToolchainConfig::default(),
    };

    if let Some(dir) = dir {
        toolchain.workspace_dir = dir.to_path_buf();
    }
    debug!(workspace = %toolchain.workspace_dir.display(), "toolchain configuration loaded");
    Ok(toolchain)
}

/// A pipeline wired to the terminal, or to an in-memory recorder in JSON
/// mode.
pub struct Session {
    pipeline: Pipeline,
    capture: Option<Arc<RecordingObserver>>,
}

impl Session {
    pub fn open(cli: &Cli) -> Result<Self> {
        let toolchain = load_toolchain(cli.config.as_deref(), cli.dir.as_deref())?;

        let capture = cli.json.then(|| Arc::new(RecordingObserver::new()));
        let observer: Arc<dyn Observer> = match &capture {
            Some(recorder) => Arc::clone(recorder) as Arc<dyn Observer>,
            None => Arc::new(ConsoleObserver::new(cli.quiet)),
        };

        Ok(Self {
            pipeline: Pipeline::new(toolchain, observer),
            capture,
        })
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Output recorded for `tag`, if output is being captured.
    pub fn captured(&self, tag: StreamTag) -> Option<String> {
        self.capture.as_ref().map(|recorder| recorder.output(tag))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_dir_override() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("custom.toml");
        std::fs::write(&config, "workspace_dir = \"from-file\"\n").unwrap();

        let toolchain = load_toolchain(Some(config.as_path()), None).unwrap();
        assert_eq!(toolchain.workspace_dir, PathBuf::from("from-file"));

        let toolchain = load_toolchain(Some(config.as_path()), Some(Path::new("elsewhere"))).unwrap();
        assert_eq!(toolchain.workspace_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_toolchain(Some(Path::new("/nonexistent/playbox.toml")), None).unwrap_err();
        assert!(format!("{err}").contains("failed to load configuration"));
    }
}
