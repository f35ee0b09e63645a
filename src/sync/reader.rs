use async_trait::async_trait;
use isahc::prelude::*;
use isahc::HttpClient;
use isahc::Request;
use thiserror::Error;

pub mod fetcher;

pub use fetcher::Fetcher;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
#[error("{msg}")]
pub struct FeedReaderError {
    pub msg: String,
}

/// A syndication item as the feed published it. Nothing here is validated yet.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct FetchedFeedItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub publication_date: Option<String>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FetchedFeed {
    pub title: String,
    pub link: String,
    pub feed_type: String,
    /// `None` when the document carried no item list at all.
    pub items: Option<Vec<FetchedFeedItem>>,
}

#[async_trait]
pub trait ReadFeed: Send + Sync {
    async fn read(&self, url: &str) -> Result<FetchedFeed, FeedReaderError>;
}

pub async fn read_url(client: &HttpClient, url: &str) -> Result<Vec<u8>, FeedReaderError> {
    let request = match Request::get(url).body(()) {
        Ok(request) => request,
        Err(_error) => {
            return Err(FeedReaderError {
                msg: format!("Invalid URL {url}"),
            })
        }
    };

    let mut response = client.send_async(request).await.map_err(|error| {
        let msg = format!("{error:?}");

        FeedReaderError { msg }
    })?;

    if !response.status().is_success() {
        return Err(FeedReaderError {
            msg: format!("{url} responded with {}", response.status()),
        });
    }

    response.bytes().await.map_err(|error| {
        let msg = format!("{error:?}");

        FeedReaderError { msg }
    })
}
