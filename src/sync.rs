pub mod feed_sync_job;
pub mod reader;

pub use feed_sync_job::{
    classify, Classification, FeedErrorPolicy, FeedOutcome, FeedSyncJob, SkipReason, SyncError,
    SyncReport,
};
pub use reader::{FeedReaderError, FetchedFeed, FetchedFeedItem, ReadFeed};
