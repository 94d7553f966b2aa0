//! Inbound event processing ports

pub mod ports;

pub use ports::{ChatNotifier, InboundQueue, TaskSink};
