//! Background workers

pub mod inbox_worker;

pub use inbox_worker::{InboxWorker, InboxWorkerConfig};
