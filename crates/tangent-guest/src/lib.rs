//! 🪵 tangent-guest: the inside half of a log-processing plugin.
//!
//! 🎬 COLD OPEN: INT. WASM SANDBOX - ONE BATCH AT A TIME, FOREVER
//!
//! A host hands this crate a buffer of logs. This crate decodes them, runs each one through
//! a handler somebody else wrote, sorts the handler's outputs into per-sink buckets, and
//! hands the buckets back. Millions of times. Without the heap slowly eating the sandbox.
//!
//! ```text
//!   batch bytes ──▶ decoders ──▶ Record ──▶ Handler ──▶ Output{item, sinks}
//!                      ▲                                      │
//!                      │                                      ▼
//!                   pool ◀──── assembler ◀──── router (one bucket per Sink)
//!                                 │
//!                                 ▼
//!                      Vec<SinkOutput{sink, data}>
//! ```
//!
//! 🧠 Knowledge graph:
//! - `adapter`: the invocation loop (`process_logs`, `process_batch`, `process_stream`)
//! - `decoders` / `composers`: NDJSON and MessagePack in, NDJSON and MessagePack out
//! - `transforms`: the `Handler` / `BatchHandler` contracts and `Output`
//! - `sinks` / `router` / `assembler`: where outputs go and how they get there
//! - `pool`: every reusable buffer, record, and map, returned on every exit path
//! - `guest`: the `export_handler!` boundary, where errors become strings
//!
//! 🦆 The duck has processed four million batches. The duck's memory usage is flat.

pub mod adapter;
pub mod app_config;
pub mod assembler;
pub mod common;
pub(crate) mod composers;
pub(crate) mod decoders;
pub mod error;
pub mod guest;
pub mod pool;
pub(crate) mod router;
pub mod sinks;
pub mod telemetry;
pub mod transforms;
pub mod value;

pub use adapter::Adapter;
pub use app_config::{AdapterConfig, OutputEncoding, PoolConfig, StreamConfig, WireFormat, load_config};
pub use assembler::SinkOutput;
pub use common::{Record, RecordBatch};
pub use error::{AdapterError, DecodeError};
pub use guest::PluginMeta;
pub use pool::{PoolStats, PoolsSnapshot};
pub use sinks::{Sink, SinkSpec};
pub use transforms::{BatchHandler, FnHandler, Handler, Output, Passthrough, handler_fn};
pub use value::Value;
