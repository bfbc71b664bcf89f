//! The playground directory and its tracked source file.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::RunError;
use crate::ToolchainConfig;

/// Mode of the playground directory.
pub const WORKSPACE_DIR_MODE: u32 = 0o700;

/// Mode of the tracked source file.
pub const MAIN_FILE_MODE: u32 = 0o600;

/// Source written into a fresh workspace.
pub const STARTER_MAIN: &str = r#"package main

import "fmt"

func main() {
	fmt.Println("Hello from the playground!")
}
"#;

/// A playground directory with one tracked source file.
#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
    main_file: PathBuf,
}

impl Workspace {
    /// Describes a workspace; nothing is touched on disk.
    pub fn new(dir: impl Into<PathBuf>, main_file: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            main_file: main_file.into(),
        }
    }

    /// The workspace described by `config`.
    #[must_use]
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self::new(&config.workspace_dir, &config.main_file)
    }

    /// The playground directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the tracked source file.
    #[must_use]
    pub fn main_path(&self) -> PathBuf {
        self.dir.join(&self.main_file)
    }

    /// Creates the directory (mode 0o700) and its ancestors.
    ///
    /// Returns `false` if it already existed.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the directory cannot be created.
    pub fn create(&self) -> Result<bool, RunError> {
        if self.dir.is_dir() {
            return Ok(false);
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(WORKSPACE_DIR_MODE);
        }
        builder.create(&self.dir).map_err(|source| RunError::Filesystem {
            path: self.dir.clone(),
            source,
        })?;

        debug!(dir = %self.dir.display(), "workspace created");
        Ok(true)
    }

    /// Writes [`STARTER_MAIN`] unless the source file already exists.
    ///
    /// Returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the file cannot be written.
    pub fn write_starter(&self) -> Result<bool, RunError> {
        if self.main_path().exists() {
            return Ok(false);
        }
        self.write_main(STARTER_MAIN)?;
        Ok(true)
    }

    /// Replaces the tracked source file with `content`, mode 0o600.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the file cannot be written.
    pub fn write_main(&self, content: &str) -> Result<(), RunError> {
        let path = self.main_path();
        let fs_err = |source| RunError::Filesystem {
            path: path.clone(),
            source,
        };

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(MAIN_FILE_MODE);
        }
        let mut file = options.open(&path).map_err(fs_err)?;
        file.write_all(content.as_bytes()).map_err(fs_err)?;

        // `mode` only applies on creation.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(MAIN_FILE_MODE))
                .map_err(fs_err)?;
        }

        debug!(path = %path.display(), bytes = content.len(), "source saved");
        Ok(())
    }

    /// Reads the tracked source file.
    ///
    /// # Errors
    ///
    /// Returns `Filesystem` if the file cannot be read.
    pub fn read_main(&self) -> Result<String, RunError> {
        let path = self.main_path();
        fs::read_to_string(&path).map_err(|source| RunError::Filesystem { path, source })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_then_reuse() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path().join("playground"), "main.go");

        assert!(workspace.create().unwrap());
        assert!(!workspace.create().unwrap());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(workspace.dir()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, WORKSPACE_DIR_MODE);
        }
    }

    #[test]
    fn test_starter_written_once() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path(), "main.go");

        assert!(workspace.write_starter().unwrap());
        workspace.write_main("package main\n").unwrap();
        assert!(!workspace.write_starter().unwrap());
        assert_eq!(workspace.read_main().unwrap(), "package main\n");
    }

    #[test]
    #[cfg(unix)]
    fn test_write_main_resets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path(), "main.go");
        fs::write(workspace.main_path(), "old").unwrap();
        fs::set_permissions(workspace.main_path(), fs::Permissions::from_mode(0o644)).unwrap();

        workspace.write_main("new").unwrap();

        let mode = fs::metadata(workspace.main_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, MAIN_FILE_MODE);
    }

    #[test]
    fn test_read_missing_main() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::new(temp.path(), "absent.go");
        assert!(matches!(
            workspace.read_main(),
            Err(RunError::Filesystem { .. })
        ));
    }
}
