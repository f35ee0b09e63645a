use isahc::config::RedirectPolicy;
use isahc::prelude::*;
use isahc::HttpClient;
use std::time::Duration;

pub const USER_AGENT: &str = "pocket_feed_sync";

/// One client is shared by feed retrieval, delivery and the CI history lookup.
pub fn build(request_timeout_in_seconds: u64) -> Result<HttpClient, isahc::Error> {
    HttpClient::builder()
        .redirect_policy(RedirectPolicy::Limit(10))
        .timeout(Duration::from_secs(request_timeout_in_seconds))
        .default_header("User-Agent", USER_AGENT)
        .build()
}
