use super::{DeliveryError, DeliverySink};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeliveryFailure {
    pub url: String,
    pub error: DeliveryError,
}

/// Deliveries run in the background while the driver keeps reading feeds.
/// Nothing is dropped: `join` waits for every task and returns what failed.
pub struct PendingDeliveries {
    sink: Arc<dyn DeliverySink>,
    tasks: Vec<(String, JoinHandle<Result<(), DeliveryError>>)>,
}

impl PendingDeliveries {
    pub fn new(sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            sink,
            tasks: vec![],
        }
    }

    pub fn dispatch(&mut self, url: String) {
        let sink = self.sink.clone();
        let task_url = url.clone();

        let handle = tokio::spawn(async move {
            let result = sink.deliver(&task_url).await;

            if let Err(error) = &result {
                log::error!("Failed to deliver {}: {}", task_url, error);
            }

            result
        });

        self.tasks.push((url, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn join(self) -> Vec<DeliveryFailure> {
        let mut failures = vec![];

        for (url, handle) in self.tasks {
            let error = match handle.await {
                Ok(Ok(())) => continue,
                Ok(Err(error)) => error,
                Err(join_error) => DeliveryError::Aborted {
                    msg: format!("{join_error:?}"),
                },
            };

            failures.push(DeliveryFailure { url, error });
        }

        failures
    }
}
