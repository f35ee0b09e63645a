use async_trait::async_trait;
use thiserror::Error;

pub mod pending_deliveries;
pub mod pocket_client;

pub use pending_deliveries::{DeliveryFailure, PendingDeliveries};
pub use pocket_client::PocketClient;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum DeliveryError {
    #[error("cannot save article to pocket: {msg}")]
    HttpError { msg: String },
    #[error("pocket responded with {code} for {url}")]
    Status { code: u16, url: String },
    #[error("delivery task did not finish: {msg}")]
    Aborted { msg: String },
}

/// Hands a single link off to the save service.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, url: &str) -> Result<(), DeliveryError>;
}
