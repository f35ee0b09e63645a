use super::{CheckpointError, CheckpointSource};
use crate::models::checkpoint::{Checkpoint, Origin};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const ARTIFACT_NAME: &str = "lastSuccessfulUpdate";
pub const FILE_NAME: &str = "lastSuccessfulUpdate.txt";

/// Blob store that keeps named artifacts between runs of the same job.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Copies the files of artifact `name` into `dest`.
    async fn download(&self, name: &str, dest: &Path) -> Result<(), CheckpointError>;

    /// Replaces artifact `name` with `files`.
    async fn upload(&self, name: &str, files: &[PathBuf]) -> Result<(), CheckpointError>;
}

/// Artifacts kept as sub-directories of `root`.
///
/// A plain directory does not survive between GitHub Actions runs. `root`
/// has to be restored and saved by the workflow (for example with
/// `actions/cache`), otherwise every run resolves to the default window.
#[derive(Debug, Clone)]
pub struct DirArtifactStore {
    pub root: PathBuf,
}

impl DirArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactStore for DirArtifactStore {
    async fn download(&self, name: &str, dest: &Path) -> Result<(), CheckpointError> {
        let mut entries = fs::read_dir(self.root.join(name)).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                fs::copy(entry.path(), dest.join(entry.file_name())).await?;
            }
        }

        Ok(())
    }

    async fn upload(&self, name: &str, files: &[PathBuf]) -> Result<(), CheckpointError> {
        let artifact_dir = self.root.join(name);
        recreate_dir(&artifact_dir).await?;

        for file in files {
            let file_name = file.file_name().ok_or_else(|| CheckpointError::StoreError {
                msg: format!("{} is not a file", file.display()),
            })?;

            fs::copy(file, artifact_dir.join(file_name)).await?;
        }

        Ok(())
    }
}

pub struct ArtifactCheckpoint<S> {
    store: S,
    work_dir: PathBuf,
}

impl<S: ArtifactStore> ArtifactCheckpoint<S> {
    pub fn new(store: S, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            work_dir: work_dir.into(),
        }
    }

    async fn load(&self) -> Result<Checkpoint, CheckpointError> {
        recreate_dir(&self.work_dir).await?;

        self.store.download(ARTIFACT_NAME, &self.work_dir).await?;

        let text = fs::read_to_string(self.work_dir.join(FILE_NAME)).await?;

        Checkpoint::parse(&text, Origin::Stored).ok_or_else(|| CheckpointError::StoreError {
            msg: format!("malformed checkpoint {text:?}"),
        })
    }
}

#[async_trait]
impl<S: ArtifactStore> CheckpointSource for ArtifactCheckpoint<S> {
    /// Every failure falls back to the default window.
    async fn resolve(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError> {
        match self.load().await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(error) => {
                log::warn!("No stored checkpoint, using the default window: {}", error);

                Ok(Checkpoint::default_for(now))
            }
        }
    }

    async fn store(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        recreate_dir(&self.work_dir).await?;

        let file = self.work_dir.join(FILE_NAME);
        fs::write(&file, checkpoint.to_text()).await?;

        self.store.upload(ARTIFACT_NAME, &[file]).await
    }

    fn name(&self) -> &'static str {
        "artifact"
    }
}

async fn recreate_dir(dir: &Path) -> Result<(), CheckpointError> {
    match fs::remove_dir_all(dir).await {
        Err(error) if error.kind() != ErrorKind::NotFound => return Err(error.into()),
        _ => (),
    }

    fs::create_dir_all(dir).await?;

    Ok(())
}
