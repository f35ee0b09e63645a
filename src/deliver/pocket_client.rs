use super::{DeliveryError, DeliverySink};
use async_trait::async_trait;
use isahc::HttpClient;
use isahc::Request;
use serde::Serialize;

#[derive(Clone, Debug)]
pub struct PocketClient {
    pub api_url: String,
    pub consumer_key: String,
    pub access_token: String,
    pub http_client: HttpClient,
}

#[derive(Serialize, Debug)]
struct AddParams<'a> {
    url: &'a str,
    consumer_key: &'a str,
    access_token: &'a str,
}

impl PocketClient {
    pub fn new(
        api_url: String,
        consumer_key: String,
        access_token: String,
        http_client: HttpClient,
    ) -> Self {
        Self {
            api_url,
            consumer_key,
            access_token,
            http_client,
        }
    }
}

#[async_trait]
impl DeliverySink for PocketClient {
    async fn deliver(&self, url: &str) -> Result<(), DeliveryError> {
        let params = AddParams {
            url,
            consumer_key: &self.consumer_key,
            access_token: &self.access_token,
        };

        let json = serde_json::to_string(&params)?;
        let request = Request::post(&self.api_url)
            .header("Content-Type", "application/json; charset=UTF-8")
            .header("X-Accept", "application/json")
            .body(json)?;

        let response = self.http_client.send_async(request).await?;

        if response.status().is_success() {
            log::info!("Saved {} to pocket", url);

            Ok(())
        } else {
            Err(DeliveryError::Status {
                code: response.status().as_u16(),
                url: url.to_string(),
            })
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(error: serde_json::Error) -> Self {
        let msg = format!("{error:?}");

        DeliveryError::HttpError { msg }
    }
}

impl From<isahc::http::Error> for DeliveryError {
    fn from(error: isahc::http::Error) -> Self {
        let msg = format!("{error:?}");

        DeliveryError::HttpError { msg }
    }
}

impl From<isahc::Error> for DeliveryError {
    fn from(error: isahc::Error) -> Self {
        let msg = format!("{error:?}");

        DeliveryError::HttpError { msg }
    }
}
