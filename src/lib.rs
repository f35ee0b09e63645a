pub mod checkpoint;
pub mod config;
pub mod deliver;
pub mod github_client;
pub mod http_client;
pub mod job;
pub mod models;
pub mod sync;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use job::{JobError, SyncInvocation};
