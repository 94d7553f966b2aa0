//! Inbound queue adapters

pub mod relay;

pub use relay::RelayQueueClient;
