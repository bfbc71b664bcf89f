//! Extraction limits and the toolchain command table.

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Extraction configuration with secure defaults.
///
/// # Examples
///
/// ```
/// use playbox_core::ExtractConfig;
///
/// let config = ExtractConfig {
///     max_file_size: 100 * 1024 * 1024,
///     cleanup_on_failure: true,
///     ..Default::default()
/// };
/// assert_eq!(config.max_file_count, 100_000);
/// ```
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Maximum size for a single file in bytes.
    pub max_file_size: u64,

    /// Maximum total size for all extracted files in bytes.
    pub max_total_size: u64,

    /// Maximum number of files that can be extracted.
    pub max_file_count: usize,

    /// Remove everything this run created when extraction fails.
    ///
    /// Off by default: a failed extraction leaves whatever was written and
    /// the caller is expected to discard the whole destination tree.
    pub cleanup_on_failure: bool,
}

impl Default for ExtractConfig {
    /// Default values:
    /// - `max_file_size`: 512 MB
    /// - `max_total_size`: 4 GB
    /// - `max_file_count`: 100,000
    /// - `cleanup_on_failure`: false
    fn default() -> Self {
        Self {
            max_file_size: 512 * 1024 * 1024,
            max_total_size: 4 * 1024 * 1024 * 1024,
            max_file_count: 100_000,
            cleanup_on_failure: false,
        }
    }
}

/// A program plus its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    /// Program name or path.
    pub program: String,

    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Creates a command from a program and its arguments.
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Renders the invocation the way a shell prompt would echo it.
    #[must_use]
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            format!("$ {}", self.program)
        } else {
            format!("$ {} {}", self.program, self.args.join(" "))
        }
    }
}

/// Commands and files used by the playground pipeline.
///
/// Defaults reproduce a Go playground: `go build -v .`, then
/// `./playground`, with `go fmt .` for formatting and `main.go` as the
/// tracked source file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Directory holding the playground sources.
    pub workspace_dir: PathBuf,

    /// Tracked source file, relative to `workspace_dir`.
    pub main_file: PathBuf,

    /// Command that initializes the workspace.
    pub init: Option<CommandSpec>,

    /// File the `init` command leaves behind, relative to `workspace_dir`.
    ///
    /// `init` is skipped once this file exists. When unset, `init` runs on
    /// every call.
    pub init_creates: Option<PathBuf>,

    /// Build step.
    pub build: CommandSpec,

    /// Run step, started only after a successful build.
    pub run: CommandSpec,

    /// Format step, followed by reloading `main_file`.
    pub format: CommandSpec,

    /// Force-reject a step still pending after this many seconds.
    pub step_timeout_secs: Option<u64>,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("playground"),
            main_file: PathBuf::from("main.go"),
            init: Some(CommandSpec::new("go", ["mod", "init", "playground"])),
            init_creates: Some(PathBuf::from("go.mod")),
            build: CommandSpec::new("go", ["build", "-v", "."]),
            run: CommandSpec::new("./playground", Vec::<String>::new()),
            format: CommandSpec::new("go", ["fmt", "."]),
            step_timeout_secs: None,
        }
    }
}

impl ToolchainConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns the TOML parse error on malformed input.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or an
    /// `InvalidData` error wrapping the TOML parse failure.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Per-step deadline, if configured. Zero means no deadline.
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Whether the `init` command still has to run.
    #[must_use]
    pub fn needs_init(&self) -> bool {
        match &self.init_creates {
            Some(marker) => !self.workspace_dir.join(marker).exists(),
            None => true,
        }
    }

    /// Absolute-or-relative path of the tracked source file.
    #[must_use]
    pub fn main_path(&self) -> PathBuf {
        self.workspace_dir.join(&self.main_file)
    }
}
