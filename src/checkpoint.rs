use crate::github_client::GithubError;
use crate::models::checkpoint::Checkpoint;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

pub mod artifact;
pub mod run_history;

pub use artifact::{ArtifactCheckpoint, ArtifactStore, DirArtifactStore};
pub use run_history::{RunHistory, RunHistoryCheckpoint, RunPredicate};

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("missing CI context: {0}")]
    MissingContext(String),
    #[error("artifact store error: {msg}")]
    StoreError { msg: String },
    #[error(transparent)]
    GithubError(#[from] GithubError),
}

impl From<std::io::Error> for CheckpointError {
    fn from(error: std::io::Error) -> Self {
        let msg = format!("{error:?}");

        CheckpointError::StoreError { msg }
    }
}

/// Where the previous run left off.
#[async_trait]
pub trait CheckpointSource: Send + Sync {
    async fn resolve(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError>;

    async fn store(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: CheckpointSource + ?Sized> CheckpointSource for Arc<T> {
    async fn resolve(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError> {
        (**self).resolve(now).await
    }

    async fn store(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        (**self).store(checkpoint).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
