//! The Vigil event processing network engine.
//!
//! The engine owns a directed graph from subjects to processing nodes and
//! drives delivery: incoming event lists are queued per (node, partition
//! key) so one node never sees two concurrent invocations for one key,
//! while distinct keys and distinct nodes proceed in parallel on the tokio
//! runtime. Node output re-enters the engine by enqueue-and-return;
//! terminal situations are forwarded to a [`vigil_core::notify::SituationSink`].

pub mod config;
pub mod engine;
pub mod processor;
pub mod sink;

pub mod error;

pub use config::{BackpressurePolicy, EngineConfig};
pub use engine::{IngestReport, NetworkEngine, RejectedEvent};
pub use error::{Error, Result};
