//! Client side of the MotionMap offline cache.
//!
//! This crate provides the network fetch pipeline and the cache worker that
//! routes requests through it and the stores from `motionmap-core`.

pub mod fetch;
pub mod worker;

pub use fetch::{FetchClient, FetchConfig, Network, canonicalize};
pub use worker::{ControlAck, ControlMessage, Router, Strategy, Worker, WorkerConfig, WorkerState};
