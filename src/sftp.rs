use crate::config::SftpConfig;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use ssh2::Session;
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Transfers a local file to the configured remote server.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, local_file: &Path) -> Result<()>;
}

pub struct SftpUploader {
    config: SftpConfig,
}

impl SftpUploader {
    pub fn new(config: SftpConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Uploader for SftpUploader {
    async fn upload(&self, local_file: &Path) -> Result<()> {
        let config = self.config.clone();
        let local_file = local_file.to_path_buf();

        // libssh2 is synchronous end to end, keep it off the event loop
        tokio::task::spawn_blocking(move || upload_blocking(&config, &local_file))
            .await
            .context("SFTP upload task panicked")?
    }
}

fn upload_blocking(config: &SftpConfig, local_file: &Path) -> Result<()> {
    let tcp = TcpStream::connect((config.address.as_str(), config.port)).with_context(|| {
        format!(
            "Failed to connect to {}:{}",
            config.address, config.port
        )
    })?;

    let mut session = Session::new().context("Failed to create SSH session")?;
    session.set_tcp_stream(tcp);
    session.handshake().context("SSH handshake failed")?;
    session
        .userauth_password(&config.user, &config.password)
        .context("SSH authentication failed")?;

    // Dropping the session tears the transport down on this path
    let sftp = session.sftp().map_err(|error| {
        warn!(%error, "SFTP subsystem request failed");
        anyhow!("Failed to establish SFTP connection.")
    })?;

    let remote_path = remote_name(local_file)?;
    let mut local = std::fs::File::open(local_file)
        .with_context(|| format!("Failed to open '{}'", local_file.display()))?;
    let mut remote = sftp
        .create(&remote_path)
        .with_context(|| format!("Failed to create remote file '{}'", remote_path.display()))?;

    std::io::copy(&mut local, &mut remote).context("Failed to transfer file")?;
    drop(remote);

    info!(path = %local_file.display(), "Uploaded file");
    Ok(())
}

/// Remote files land at the SFTP root under the local base name.
fn remote_name(local_file: &Path) -> Result<PathBuf> {
    let name = local_file
        .file_name()
        .ok_or_else(|| anyhow!("Local file '{}' has no base name", local_file.display()))?;
    Ok(PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_name_is_base_name() {
        let name = remote_name(Path::new("/tmp/workdir/My Song.mp3")).unwrap();
        assert_eq!(name, PathBuf::from("My Song.mp3"));
    }

    #[test]
    fn test_remote_name_rejects_bare_directory() {
        assert!(remote_name(Path::new("/")).is_err());
    }
}
