use crate::checkpoint::{CheckpointError, CheckpointSource};
use crate::deliver::{DeliveryError, DeliverySink};
use crate::models::checkpoint::Checkpoint;
use crate::sync::reader::{FeedReaderError, FetchedFeed, FetchedFeedItem, ReadFeed};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct FakeReader {
    feeds: HashMap<String, Result<FetchedFeed, FeedReaderError>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl FakeReader {
    pub fn with_items(mut self, url: &str, items: Vec<FetchedFeedItem>) -> Self {
        self.feeds.insert(url.to_string(), Ok(feed(url, Some(items))));
        self
    }

    pub fn without_items(mut self, url: &str) -> Self {
        self.feeds.insert(url.to_string(), Ok(feed(url, None)));
        self
    }

    pub fn failing(mut self, url: &str, msg: &str) -> Self {
        let error = FeedReaderError {
            msg: msg.to_string(),
        };
        self.feeds.insert(url.to_string(), Err(error));
        self
    }
}

fn feed(url: &str, items: Option<Vec<FetchedFeedItem>>) -> FetchedFeed {
    FetchedFeed {
        title: "Test feed".to_string(),
        link: url.to_string(),
        feed_type: "rss".to_string(),
        items,
    }
}

#[async_trait]
impl ReadFeed for FakeReader {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError> {
        self.calls.lock().unwrap().push(url.to_string());

        self.feeds.get(url).cloned().unwrap_or_else(|| {
            Err(FeedReaderError {
                msg: format!("unknown feed {url}"),
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<String>>,
    rejected: Vec<String>,
}

impl RecordingSink {
    pub fn rejecting(url: &str) -> Self {
        Self {
            delivered: Mutex::new(vec![]),
            rejected: vec![url.to_string()],
        }
    }

    pub fn delivered(&self) -> Vec<String> {
        let mut delivered = self.delivered.lock().unwrap().clone();
        delivered.sort();
        delivered
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, url: &str) -> Result<(), DeliveryError> {
        if self.rejected.iter().any(|rejected| rejected == url) {
            return Err(DeliveryError::Status {
                code: 403,
                url: url.to_string(),
            });
        }

        self.delivered.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Checkpoint source that remembers what it was asked to store.
pub struct MemoryCheckpoint {
    stored: Mutex<Option<Checkpoint>>,
    pub resolves: Mutex<usize>,
    pub writes: Mutex<Vec<Checkpoint>>,
}

impl MemoryCheckpoint {
    pub fn new(stored: Option<Checkpoint>) -> Self {
        Self {
            stored: Mutex::new(stored),
            resolves: Mutex::new(0),
            writes: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl CheckpointSource for MemoryCheckpoint {
    async fn resolve(&self, now: DateTime<Utc>) -> Result<Checkpoint, CheckpointError> {
        *self.resolves.lock().unwrap() += 1;

        let stored = *self.stored.lock().unwrap();
        Ok(stored.unwrap_or_else(|| Checkpoint::default_for(now)))
    }

    async fn store(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        *self.stored.lock().unwrap() = Some(*checkpoint);
        self.writes.lock().unwrap().push(*checkpoint);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
