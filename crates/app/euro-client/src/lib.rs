mod client;
mod error;

pub use client::{SyncClient, spawn_endpoint_follower};
pub use error::{ClientError, ClientResult};
