use crate::sftp::Uploader;
use crate::ytdlp::MediaFetcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DOWNLOADS_DIR: &str = "downloads";

async fn init_workspace(workspace: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(workspace.join(DOWNLOADS_DIR)).await?;
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    pub secret: String,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub uploader: Arc<dyn Uploader>,

    pub downloads_dir: PathBuf,
}

impl AppState {
    pub async fn new(
        workspace: &Path,
        secret: String,
        fetcher: Arc<dyn MediaFetcher>,
        uploader: Arc<dyn Uploader>,
    ) -> anyhow::Result<Self> {
        init_workspace(workspace).await?;

        Ok(Self {
            secret,
            fetcher,
            uploader,

            downloads_dir: workspace.join(DOWNLOADS_DIR),
        })
    }

    pub fn downloads_dir(&self) -> &Path {
        self.downloads_dir.as_path()
    }
}
