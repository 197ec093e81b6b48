//! SQLite-backed named cache stores.
//!
//! This module provides the persistent side of the offline cache:
//!
//! - Generation-versioned store names
//! - Request keys that ignore method and fragment
//! - Atomic, last-write-wins entry replacement
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod hash;
pub mod migrations;
pub mod names;
pub mod storage;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use names::StoreNames;
pub use storage::CacheStorage;
pub use stores::StoredEntry;
