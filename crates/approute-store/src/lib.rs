//! AppRoute File Store
//!
//! A concurrency-safe watch-and-cache store over local files. Callers
//! register certificate/secret files, poll point-in-time content snapshots,
//! and drain typed rotation/error channels to react to external changes.

pub mod file_store;

pub use file_store::{EVENT_CHANNEL_CAPACITY, FileStore};
