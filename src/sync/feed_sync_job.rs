use crate::deliver::{DeliveryFailure, DeliverySink, PendingDeliveries};
use crate::models::checkpoint::{parse_timestamp, Checkpoint};
use crate::sync::reader::{FeedReaderError, FetchedFeedItem, ReadFeed};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum SyncError {
    #[error("no feeds found")]
    NoFeeds,
    #[error("no items in feed: {feed}")]
    NoItems { feed: String },
    #[error("failed to read feed {feed}: {source}")]
    FeedError {
        feed: String,
        source: FeedReaderError,
    },
}

/// What happens to the rest of the run when one feed cannot be read.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum FeedErrorPolicy {
    Abort,
    Skip,
}

impl FromStr for FeedErrorPolicy {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "skip" => Ok(Self::Skip),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SkipReason {
    MissingLink,
    MissingDate,
    InvalidDate,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Classification {
    New {
        link: String,
        published_at: DateTime<Utc>,
    },
    AlreadyDelivered,
    Skipped(SkipReason),
}

pub fn classify(item: &FetchedFeedItem, checkpoint: &Checkpoint) -> Classification {
    let link = match item.link.as_deref().map(str::trim) {
        Some(link) if !link.is_empty() => link,
        _ => return Classification::Skipped(SkipReason::MissingLink),
    };

    let published_at = match item.publication_date.as_deref().map(str::trim) {
        None | Some("") => return Classification::Skipped(SkipReason::MissingDate),
        Some(text) => match parse_timestamp(text) {
            Some(date) => date,
            None => return Classification::Skipped(SkipReason::InvalidDate),
        },
    };

    if checkpoint.is_delivered(published_at) {
        Classification::AlreadyDelivered
    } else {
        Classification::New {
            link: link.to_string(),
            published_at,
        }
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FeedOutcome {
    pub feed: String,
    pub dispatched: usize,
    pub already_delivered: usize,
    pub skipped: usize,
}

#[derive(Debug, Default, Eq, PartialEq)]
pub struct SyncReport {
    pub feeds: Vec<FeedOutcome>,
    pub feed_failures: Vec<SyncError>,
    pub delivery_failures: Vec<DeliveryFailure>,
}

impl SyncReport {
    pub fn dispatched(&self) -> usize {
        self.feeds.iter().map(|outcome| outcome.dispatched).sum()
    }

    pub fn delivered(&self) -> usize {
        self.dispatched() - self.delivery_failures.len()
    }
}

pub struct FeedSyncJob {
    reader: Arc<dyn ReadFeed>,
    sink: Arc<dyn DeliverySink>,
    on_feed_error: FeedErrorPolicy,
}

impl FeedSyncJob {
    pub fn new(
        reader: Arc<dyn ReadFeed>,
        sink: Arc<dyn DeliverySink>,
        on_feed_error: FeedErrorPolicy,
    ) -> Self {
        Self {
            reader,
            sink,
            on_feed_error,
        }
    }

    /// Feeds are read one after another. Deliveries are not awaited while the
    /// loop runs, but all of them are joined before this returns.
    pub async fn run(
        &self,
        feeds: &[String],
        checkpoint: &Checkpoint,
    ) -> Result<SyncReport, SyncError> {
        if feeds.is_empty() {
            return Err(SyncError::NoFeeds);
        }

        let mut pending = PendingDeliveries::new(self.sink.clone());
        let mut report = SyncReport::default();

        for feed in feeds {
            match self.sync_feed(feed, checkpoint, &mut pending).await {
                Ok(outcome) => report.feeds.push(outcome),
                Err(error) => {
                    log::error!("Failed to process feed {}: {}", feed, error);

                    match self.on_feed_error {
                        FeedErrorPolicy::Skip => report.feed_failures.push(error),
                        FeedErrorPolicy::Abort => {
                            let failures = pending.join().await;
                            log_delivery_failures(&failures);

                            return Err(error);
                        }
                    }
                }
            }
        }

        log::info!("Waiting for {} deliveries to finish", pending.len());

        report.delivery_failures = pending.join().await;
        log_delivery_failures(&report.delivery_failures);

        Ok(report)
    }

    async fn sync_feed(
        &self,
        feed: &str,
        checkpoint: &Checkpoint,
        pending: &mut PendingDeliveries,
    ) -> Result<FeedOutcome, SyncError> {
        log::info!("Started processing feed {}", feed);

        let fetched_feed = self
            .reader
            .read(feed)
            .await
            .map_err(|source| SyncError::FeedError {
                feed: feed.to_string(),
                source,
            })?;

        let items = fetched_feed.items.ok_or_else(|| SyncError::NoItems {
            feed: feed.to_string(),
        })?;

        let mut outcome = FeedOutcome {
            feed: feed.to_string(),
            ..FeedOutcome::default()
        };

        for item in &items {
            match classify(item, checkpoint) {
                Classification::New { link, published_at } => {
                    log::debug!("New entry {} published at {}", link, published_at);

                    pending.dispatch(link);
                    outcome.dispatched += 1;
                }
                Classification::AlreadyDelivered => outcome.already_delivered += 1,
                Classification::Skipped(reason) => {
                    log::debug!("Skipping entry {:?} of {}: {:?}", item.title, feed, reason);

                    outcome.skipped += 1;
                }
            }
        }

        log::info!(
            "Finished processing feed {}: {} new, {} already delivered, {} skipped",
            feed,
            outcome.dispatched,
            outcome.already_delivered,
            outcome.skipped
        );

        Ok(outcome)
    }
}

fn log_delivery_failures(failures: &[DeliveryFailure]) {
    if !failures.is_empty() {
        log::error!("{} deliveries failed", failures.len());
    }
}
