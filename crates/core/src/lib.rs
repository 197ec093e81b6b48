//! Core types and shared functionality for the MotionMap offline cache.
//!
//! This crate provides:
//! - Named cache stores with a SQLite backend
//! - The request/response model the worker operates on
//! - Unified error types
//! - Layered configuration

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStorage, StoreNames, StoredEntry};
pub use config::AppConfig;
pub use error::Error;
pub use http::{Destination, Request, Response, ResponseType};
