//! 🔄 Transforms: the handler contracts, and the one handler we ship.
//!
//! 🎬 COLD OPEN: INT. SANDBOX - THE MIDDLE OF THE PIPELINE
//!
//! The decoder did its job. The router is waiting. In between sits somebody else's
//! business logic: mapping a syslog line to OCSF, dropping health checks, fanning
//! audit events out to three buckets. We don't know what it does. We don't WANT to
//! know. We only know its shape.
//!
//! ## Knowledge Graph 🧠
//! - `Handler`: per-record. `&Record` in, zero or more `Output`s out. Empty means "dropped", not "failed".
//! - `BatchHandler`: whole batch in, items out, every item to the default sink.
//! - `Output<T>`: an item plus where it goes. No sinks means the default sink.
//! - `FnHandler`: wrap a closure, skip the struct. Handy in tests and tiny plugins.
//! - Any `Err` from a handler fails the whole batch. The handler does not get a vote on that.
//!
//! ⚠️ The singularity will transform its own logs. Until then, implement `Handler`. 🦆

use crate::common::Record;
use crate::sinks::SinkSpec;
use anyhow::Result;
use serde::Serialize;
use std::marker::PhantomData;

pub mod passthrough;

pub use passthrough::Passthrough;

/// 📬 One output item and the sinks it should land in.
#[derive(Debug, Clone, PartialEq)]
pub struct Output<T> {
    pub item: T,
    /// Empty: route to the default sink. Repeats of the same sink are written once.
    pub sinks: Vec<SinkSpec>,
}

impl<T> Output<T> {
    /// 🏠 An output bound for the default sink.
    pub fn new(item: T) -> Self {
        Self {
            item,
            sinks: Vec::new(),
        }
    }

    /// ➕ Add a destination. Chain it for fan-out.
    pub fn to(mut self, sink: impl Into<SinkSpec>) -> Self {
        self.sinks.push(sink.into());
        self
    }

    pub fn routed<S: Into<SinkSpec>>(item: T, sinks: impl IntoIterator<Item = S>) -> Self {
        Self {
            item,
            sinks: sinks.into_iter().map(Into::into).collect(),
        }
    }
}

/// 🔄 Per-record transform.
///
/// The `&Record` is only valid for this call. It is a pooled scratch record and will be
/// wiped for the next line, so anything you keep must be copied out.
pub trait Handler {
    type Item: Serialize;

    fn process_log(&mut self, log: &Record) -> Result<Vec<Output<Self::Item>>>;
}

/// 📦 Whole-batch transform. The batch is fully decoded before this is called, so a
/// malformed line anywhere means the handler never runs.
pub trait BatchHandler {
    type Item: Serialize;

    fn process_logs(&mut self, logs: &[Record]) -> Result<Vec<Self::Item>>;
}

/// 🪄 A `Handler` made from a closure.
pub struct FnHandler<F, T> {
    f: F,
    _item: PhantomData<fn() -> T>,
}

/// 🪄 Turn `|log| -> Result<Vec<Output<T>>>` into a `Handler`.
pub fn handler_fn<F, T>(f: F) -> FnHandler<F, T>
where
    F: FnMut(&Record) -> Result<Vec<Output<T>>>,
    T: Serialize,
{
    FnHandler {
        f,
        _item: PhantomData,
    }
}

impl<F, T> Handler for FnHandler<F, T>
where
    F: FnMut(&Record) -> Result<Vec<Output<T>>>,
    T: Serialize,
{
    type Item = T;

    #[inline]
    fn process_log(&mut self, log: &Record) -> Result<Vec<Output<T>>> {
        (self.f)(log)
    }
}
