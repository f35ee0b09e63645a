use crate::models::checkpoint::parse_timestamp;
use crate::sync::reader;
use crate::sync::reader::{FeedReaderError, FetchedFeed, FetchedFeedItem, ReadFeed};
use async_trait::async_trait;
use chrono::SecondsFormat;
use feed_rs::model::{Feed, FeedType};
use feed_rs::parser;
use isahc::HttpClient;
use rss::Channel;

/// Downloads a feed and reads it as RSS first, falling back to Atom and JSON Feed.
#[derive(Clone, Debug)]
pub struct Fetcher {
    pub http_client: HttpClient,
}

impl Fetcher {
    pub fn new(http_client: HttpClient) -> Self {
        Self { http_client }
    }

    pub fn read_from_bytes(&self, url: &str, data: &[u8]) -> Result<FetchedFeed, FeedReaderError> {
        if let Ok(channel) = Channel::read_from(data) {
            let mut fetched_feed = FetchedFeed::from(channel);
            if fetched_feed.link.is_empty() {
                fetched_feed.link = url.to_string();
            }

            fill_unreadable_dates(&mut fetched_feed, data);

            return Ok(fetched_feed);
        }

        match parser::parse(data) {
            Ok(feed) => {
                let mut fetched_feed = FetchedFeed::from(feed);
                fetched_feed.link = url.to_string();

                Ok(fetched_feed)
            }
            Err(err) => {
                let msg = format!("{url} is not a feed: {err:?}");
                Err(FeedReaderError { msg })
            }
        }
    }
}

fn has_unreadable_date(item: &FetchedFeedItem) -> bool {
    item.publication_date
        .as_deref()
        .is_some_and(|date| parse_timestamp(date).is_none())
}

/// Replaces raw RSS dates that are not strict RFC 2822 (wrong weekday, `UTC`
/// zone) with the date feed-rs reads for the entry with the same link.
fn fill_unreadable_dates(fetched_feed: &mut FetchedFeed, data: &[u8]) {
    let items = match fetched_feed.items.as_mut() {
        Some(items) if items.iter().any(has_unreadable_date) => items,
        _ => return,
    };

    let feed = match parser::parse(data) {
        Ok(feed) => feed,
        Err(_) => return,
    };

    for item in items.iter_mut() {
        if !has_unreadable_date(item) {
            continue;
        }

        let date = feed
            .entries
            .iter()
            .find(|entry| {
                entry.links.first().map(|link| link.href.as_str()) == item.link.as_deref()
            })
            .and_then(|entry| entry.published.or(entry.updated));

        if let Some(date) = date {
            item.publication_date = Some(date.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        }
    }
}

#[async_trait]
impl ReadFeed for Fetcher {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError> {
        let body = reader::read_url(&self.http_client, url).await?;

        self.read_from_bytes(url, &body)
    }
}

impl From<Channel> for FetchedFeed {
    fn from(channel: Channel) -> Self {
        let items = channel
            .items()
            .iter()
            .map(|item| {
                let dc_date = item
                    .dublin_core_ext()
                    .and_then(|dc| dc.dates().first().cloned());

                FetchedFeedItem {
                    title: item.title().map(|s| s.to_string()),
                    link: item.link().map(|s| s.to_string()),
                    publication_date: item.pub_date().map(|s| s.to_string()).or(dc_date),
                }
            })
            .collect::<Vec<FetchedFeedItem>>();

        FetchedFeed {
            title: channel.title().to_string(),
            link: channel.link().to_string(),
            feed_type: "rss".to_string(),
            items: Some(items),
        }
    }
}

impl From<Feed> for FetchedFeed {
    fn from(feed: Feed) -> Self {
        let items = feed
            .entries
            .into_iter()
            .map(|item| FetchedFeedItem {
                title: item.title.map(|s| s.content),
                link: item.links.first().map(|link| link.href.clone()),
                publication_date: item
                    .published
                    .or(item.updated)
                    .map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            })
            .collect::<Vec<FetchedFeedItem>>();

        let feed_type = match feed.feed_type {
            FeedType::JSON => "json",
            FeedType::Atom => "atom",
            FeedType::RSS0 | FeedType::RSS1 | FeedType::RSS2 => "rss",
        };

        FetchedFeed {
            title: feed.title.map_or_else(|| "".to_string(), |s| s.content),
            link: "".to_string(),
            feed_type: feed_type.to_string(),
            items: Some(items),
        }
    }
}
