//! File-based configuration loading.

use std::path::{Path, PathBuf};

use super::{EnvConfig, ShellConfig};
use crate::error::{Result, ShellError};

/// File names tried, in order, by [`find`].
pub const CONFIG_NAMES: &[&str] = &["ssh-shell.toml", ".ssh-shell.toml"];

/// Find a configuration file in the given directories.
#[must_use]
pub fn find(search_paths: &[PathBuf]) -> Option<PathBuf> {
    search_paths
        .iter()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Read a configuration file.
pub async fn read(path: &Path) -> Result<ShellConfig> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        ShellError::io_context(format!("reading configuration {}", path.display()), e)
    })?;
    ShellConfig::from_toml(&content)
}

/// Load the effective configuration.
///
/// Reads `path` when given, otherwise the first file [`find`] locates in the
/// working directory, otherwise starts from defaults. Environment overrides
/// are applied last and the result is validated.
pub async fn load(path: Option<&Path>, env: &EnvConfig) -> Result<ShellConfig> {
    let located = match path {
        Some(path) => Some(path.to_path_buf()),
        None => find(&[PathBuf::from(".")]),
    };
    let config = match located {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading configuration");
            read(&path).await?
        }
        None => {
            tracing::debug!("no configuration file found, using defaults");
            ShellConfig::default()
        }
    };
    let config = config.with_env(env);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("ssh-shell-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn load_reads_file_and_env() {
        let dir = temp_dir("load");
        let path = dir.join("ssh-shell.toml");
        std::fs::write(&path, "port = 2400\nuser = \"admin\"\n").unwrap();

        let env = EnvConfig::from_map("SSH_SHELL", [("SSH_SHELL_PORT", "2500")]);
        let config = load(Some(&path), &env).await.unwrap();
        assert_eq!(config.user, "admin");
        assert_eq!(config.port, 2500);

        assert_eq!(find(&[dir.clone()]), Some(path));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_contextual_error() {
        let err = read(Path::new("/nonexistent/ssh-shell.toml")).await.unwrap_err();
        assert!(err.to_string().contains("reading configuration"));
    }

    #[tokio::test]
    async fn invalid_config_fails_validation() {
        let env = EnvConfig::from_map("SSH_SHELL", [("SSH_SHELL_PORT", "0")]);
        let dir = temp_dir("invalid");
        let path = dir.join("ssh-shell.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(
            load(Some(&path), &env).await,
            Err(ShellError::Config(_))
        ));
        std::fs::remove_dir_all(dir).unwrap();
    }
}
