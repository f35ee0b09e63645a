use crate::checkpoint::{
    ArtifactCheckpoint, CheckpointError, CheckpointSource, DirArtifactStore, RunHistoryCheckpoint,
};
use crate::config::{CheckpointStrategy, Config, ConfigError};
use crate::deliver::PocketClient;
use crate::github_client::GithubClient;
use crate::http_client;
use crate::sync::reader::Fetcher;
use crate::sync::{FeedSyncJob, SyncError, SyncReport};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    ConfigError(#[from] ConfigError),
    #[error(transparent)]
    CheckpointError(#[from] CheckpointError),
    #[error(transparent)]
    SyncError(#[from] SyncError),
    #[error("failed to build http client: {msg}")]
    HttpClientError { msg: String },
    #[error("{0} feeds could not be processed, checkpoint was not advanced")]
    FeedFailures(usize),
    #[error("{0} deliveries failed, checkpoint was not advanced")]
    DeliveryFailures(usize),
}

/// A single run of the job: resolve the checkpoint, forward new entries,
/// then move the checkpoint forward.
pub struct SyncInvocation {
    feeds: Vec<String>,
    source: Box<dyn CheckpointSource>,
    job: FeedSyncJob,
    fail_on_delivery_error: bool,
}

impl SyncInvocation {
    pub fn new(
        feeds: Vec<String>,
        source: Box<dyn CheckpointSource>,
        job: FeedSyncJob,
        fail_on_delivery_error: bool,
    ) -> Self {
        Self {
            feeds,
            source,
            job,
            fail_on_delivery_error,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, JobError> {
        let http_client = http_client::build(config.request_timeout_in_seconds).map_err(|error| {
            JobError::HttpClientError {
                msg: format!("{error:?}"),
            }
        })?;

        let source: Box<dyn CheckpointSource> = match config.strategy {
            CheckpointStrategy::Artifact => Box::new(ArtifactCheckpoint::new(
                DirArtifactStore::new(config.artifact_dir.clone()),
                config.work_dir.clone(),
            )),
            CheckpointStrategy::RunHistory => {
                let context = config.github.as_ref().ok_or_else(|| {
                    CheckpointError::MissingContext(
                        "GITHUB_REPOSITORY and GITHUB_WORKFLOW are required".to_string(),
                    )
                })?;

                Box::new(RunHistoryCheckpoint::new(
                    GithubClient::new(context, http_client.clone()),
                    context.workflow.clone(),
                    config.run_predicate,
                    context.run_id,
                ))
            }
        };

        let sink = PocketClient::new(
            config.pocket_api_url.clone(),
            config.consumer_key.clone(),
            config.access_token.clone(),
            http_client.clone(),
        );
        let job = FeedSyncJob::new(
            Arc::new(Fetcher::new(http_client)),
            Arc::new(sink),
            config.on_feed_error,
        );

        Ok(Self::new(
            config.feeds.clone(),
            source,
            job,
            config.fail_on_delivery_error,
        ))
    }

    pub async fn execute(&self, started_at: DateTime<Utc>) -> Result<SyncReport, JobError> {
        if self.feeds.is_empty() {
            return Err(SyncError::NoFeeds.into());
        }

        let checkpoint = self.source.resolve(started_at).await?;

        log::info!(
            "Resolved checkpoint {} using {} strategy",
            checkpoint,
            self.source.name()
        );

        let report = self.job.run(&self.feeds, &checkpoint).await?;

        log::info!(
            "Dispatched {} entries from {} feeds, {} deliveries failed",
            report.dispatched(),
            report.feeds.len(),
            report.delivery_failures.len()
        );

        if !report.feed_failures.is_empty() {
            return Err(JobError::FeedFailures(report.feed_failures.len()));
        }

        if self.fail_on_delivery_error && !report.delivery_failures.is_empty() {
            return Err(JobError::DeliveryFailures(report.delivery_failures.len()));
        }

        let next = checkpoint.advance(started_at);
        self.source.store(&next).await?;

        log::info!("Stored checkpoint {}", next);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::checkpoint::{Checkpoint, Origin};
    use crate::sync::reader::FetchedFeedItem;
    use crate::sync::FeedErrorPolicy;
    use crate::testing::{FakeReader, MemoryCheckpoint, RecordingSink};
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-10T12:00:00Z")
            .unwrap()
            .into()
    }

    fn item(link: &str, date: DateTime<Utc>) -> FetchedFeedItem {
        FetchedFeedItem {
            title: None,
            link: Some(link.to_string()),
            publication_date: Some(date.to_rfc3339()),
        }
    }

    struct Harness {
        source: Arc<MemoryCheckpoint>,
        sink: Arc<RecordingSink>,
        invocation: SyncInvocation,
    }

    fn harness(
        feeds: &[&str],
        reader: FakeReader,
        sink: RecordingSink,
        stored: Option<Checkpoint>,
        policy: FeedErrorPolicy,
        fail_on_delivery_error: bool,
    ) -> Harness {
        let source = Arc::new(MemoryCheckpoint::new(stored));
        let sink = Arc::new(sink);
        let job = FeedSyncJob::new(Arc::new(reader), sink.clone(), policy);

        let invocation = SyncInvocation::new(
            feeds.iter().map(|feed| feed.to_string()).collect(),
            Box::new(source.clone()),
            job,
            fail_on_delivery_error,
        );

        Harness {
            source,
            sink,
            invocation,
        }
    }

    #[tokio::test]
    async fn fails_before_resolving_without_feeds() {
        let test = harness(
            &[],
            FakeReader::default(),
            RecordingSink::default(),
            None,
            FeedErrorPolicy::Abort,
            false,
        );

        let result = test.invocation.execute(now()).await;

        assert!(matches!(result, Err(JobError::SyncError(SyncError::NoFeeds))));
        assert_eq!(*test.source.resolves.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn first_run_uses_the_default_window_and_stores_start_time() {
        let feed = "https://example.com/a.xml";
        let reader = FakeReader::default().with_items(
            feed,
            vec![
                item("https://example.com/recent", now() - Duration::days(6)),
                item("https://example.com/ancient", now() - Duration::days(8)),
            ],
        );
        let test = harness(
            &[feed],
            reader,
            RecordingSink::default(),
            None,
            FeedErrorPolicy::Abort,
            false,
        );

        test.invocation.execute(now()).await.unwrap();

        assert_eq!(test.sink.delivered(), vec!["https://example.com/recent".to_string()]);
        assert_eq!(
            *test.source.writes.lock().unwrap(),
            vec![Checkpoint::new(now(), Origin::Stored)]
        );
    }

    #[tokio::test]
    async fn checkpoint_never_moves_backwards() {
        let feed = "https://example.com/a.xml";
        let ahead = Checkpoint::new(now() + Duration::minutes(5), Origin::Stored);
        let test = harness(
            &[feed],
            FakeReader::default().with_items(feed, vec![]),
            RecordingSink::default(),
            Some(ahead),
            FeedErrorPolicy::Abort,
            false,
        );

        test.invocation.execute(now()).await.unwrap();

        assert_eq!(*test.source.writes.lock().unwrap(), vec![ahead]);
    }

    #[tokio::test]
    async fn feed_without_items_leaves_checkpoint_untouched() {
        let test = harness(
            &["https://example.com/broken.xml"],
            FakeReader::default().without_items("https://example.com/broken.xml"),
            RecordingSink::default(),
            None,
            FeedErrorPolicy::Abort,
            false,
        );

        let result = test.invocation.execute(now()).await;

        assert!(matches!(
            result,
            Err(JobError::SyncError(SyncError::NoItems { .. }))
        ));
        assert!(test.source.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn skipped_feed_holds_the_checkpoint_back() {
        let fresh = now() - Duration::hours(1);
        let reader = FakeReader::default()
            .failing("https://example.com/down.xml", "timeout")
            .with_items(
                "https://example.com/ok.xml",
                vec![item("https://example.com/post", fresh)],
            );
        let test = harness(
            &["https://example.com/down.xml", "https://example.com/ok.xml"],
            reader,
            RecordingSink::default(),
            None,
            FeedErrorPolicy::Skip,
            false,
        );

        let result = test.invocation.execute(now()).await;

        assert!(matches!(result, Err(JobError::FeedFailures(1))));
        assert_eq!(test.sink.delivered(), vec!["https://example.com/post".to_string()]);
        assert!(test.source.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivery_failures_only_block_the_checkpoint_when_configured() {
        let feed = "https://example.com/a.xml";
        let entries = vec![item("https://example.com/rejected", now() - Duration::hours(1))];

        let lenient = harness(
            &[feed],
            FakeReader::default().with_items(feed, entries.clone()),
            RecordingSink::rejecting("https://example.com/rejected"),
            None,
            FeedErrorPolicy::Abort,
            false,
        );
        let report = lenient.invocation.execute(now()).await.unwrap();
        assert_eq!(report.delivery_failures.len(), 1);
        assert_eq!(lenient.source.writes.lock().unwrap().len(), 1);

        let strict = harness(
            &[feed],
            FakeReader::default().with_items(feed, entries),
            RecordingSink::rejecting("https://example.com/rejected"),
            None,
            FeedErrorPolicy::Abort,
            true,
        );
        let result = strict.invocation.execute(now()).await;
        assert!(matches!(result, Err(JobError::DeliveryFailures(1))));
        assert!(strict.source.writes.lock().unwrap().is_empty());
    }
}
