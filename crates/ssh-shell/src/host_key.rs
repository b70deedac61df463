//! Server host key storage.
//!
//! The key is read from the configured file. When the file does not exist an
//! Ed25519 key is generated and written there in OpenSSH format, so clients
//! see the same host key across restarts.

use std::path::Path;

use russh::keys::PrivateKey;
use russh::keys::ssh_key::{Algorithm, LineEnding};

use crate::error::{Result, ShellError};

/// Load the host key at `path`, generating and saving one if missing.
pub async fn load_or_generate(path: &Path) -> Result<PrivateKey> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => load(path).await,
        Ok(false) => {
            let key = generate()?;
            save(&key, path).await?;
            tracing::info!(path = %path.display(), "generated host key");
            Ok(key)
        }
        Err(e) => Err(ShellError::io_context(
            format!("checking host key {}", path.display()),
            e,
        )),
    }
}

/// Read an unencrypted private key.
pub async fn load(path: &Path) -> Result<PrivateKey> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ShellError::io_context(format!("reading host key {}", path.display()), e))?;
    let key = russh::keys::decode_secret_key(&text, None)
        .map_err(|e| ShellError::host_key(format!("failed to decode {}: {e}", path.display())))?;
    tracing::debug!(path = %path.display(), algorithm = %key.algorithm(), "loaded host key");
    Ok(key)
}

/// Generate a new Ed25519 key.
pub fn generate() -> Result<PrivateKey> {
    PrivateKey::random(&mut rand_core::OsRng, Algorithm::Ed25519)
        .map_err(|e| ShellError::host_key(format!("failed to generate key: {e}")))
}

/// Write `key` to `path` in OpenSSH format, readable by the owner only.
pub async fn save(key: &PrivateKey, path: &Path) -> Result<()> {
    let encoded = key
        .to_openssh(LineEnding::LF)
        .map_err(|e| ShellError::host_key(format!("failed to encode key: {e}")))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ShellError::io_context(format!("creating {}", parent.display()), e))?;
    }
    tokio::fs::write(path, encoded.as_bytes())
        .await
        .map_err(|e| ShellError::io_context(format!("writing host key {}", path.display()), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to restrict host key permissions");
        }
    }
    Ok(())
}
