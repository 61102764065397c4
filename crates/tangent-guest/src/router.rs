//! 🧭 Router: one bucket per distinct sink, every output appended to every bucket it names.
//!
//! 🎬 *[a mail room. one clerk. an unknown number of pigeonholes, built on demand.]*
//! *[a letter arrives addressed to three places. the clerk photocopies it twice. nobody asks why.]*
//!
//! Per output:
//! 1. encode the item ONCE into a pooled scratch buffer
//! 2. resolve each sink spec (an unrecognized one fails the batch right here)
//! 3. find or create the bucket for that sink (structural equality, so independently
//!    built `Sink::s3("out")` values share one bucket)
//! 4. copy the encoded bytes onto the end of the bucket's buffer
//!
//! Every bucket gets its own copy of the bytes, byte-identical to every other copy.
//! A sink named twice in one output gets one copy, not two.
//!
//! 🧠 Knowledge graph:
//! - `BucketMap`: sink → bucket index + buckets in first-use order. Pooled, so the map's
//!   slots survive between invocations.
//! - `Router`: borrows a `BucketMap` and the buffer pool for one invocation. Its `Drop` hands
//!   every bucket buffer back to the pool, which makes cleanup the same on success and on error.
//! - Bucket buffers are detached from the buffer pool and released by hand in `Drop`.
//!   The map only stores them; it never returns them itself.

use crate::composers::{Composer, ComposerBackend};
use crate::error::{AdapterError, Result};
use crate::pool::{Pool, Pooled, Pools, Reset, Retain};
use crate::sinks::{Sink, SinkSpec};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use tracing::trace;

/// 🪣 One sink's accumulated output for this invocation.
#[derive(Debug)]
pub(crate) struct Bucket {
    pub(crate) sink: Sink,
    pub(crate) buf: Vec<u8>,
    pub(crate) records: usize,
    // -- sequence number of the last output written here; dedupes repeats within one output
    last_seq: u64,
}

/// 🗺️ Sink-keyed buckets. At most one bucket per structurally distinct sink.
#[derive(Debug, Default)]
pub(crate) struct BucketMap {
    index: HashMap<Sink, usize>,
    buckets: Vec<Bucket>,
}

impl BucketMap {
    /// ➕ Append `bytes` to `sink`'s bucket, creating it with a buffer from `fresh` on first use.
    /// Returns false if this output (`seq`) already wrote to that bucket.
    fn append(
        &mut self,
        sink: Cow<'_, Sink>,
        bytes: &[u8],
        seq: u64,
        fresh: impl FnOnce() -> Vec<u8>,
    ) -> bool {
        let slot = match self.index.get(&*sink) {
            Some(&slot) => slot,
            None => {
                let slot = self.buckets.len();
                trace!("🪣 New bucket #{slot} for sink '{sink}'");
                let sink = sink.into_owned();
                self.index.insert(sink.clone(), slot);
                self.buckets.push(Bucket {
                    sink,
                    buf: fresh(),
                    records: 0,
                    last_seq: 0,
                });
                slot
            }
        };

        let bucket = &mut self.buckets[slot];
        if bucket.last_seq == seq {
            return false;
        }
        bucket.last_seq = seq;
        bucket.buf.extend_from_slice(bytes);
        bucket.records += 1;
        true
    }

    pub(crate) fn buckets_mut(&mut self) -> &mut [Bucket] {
        &mut self.buckets
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }
}

impl Reset for BucketMap {
    fn reset(&mut self, retain: &Retain) {
        self.index.clear();
        self.buckets.clear();
        if self.index.capacity() > retain.entries {
            self.index.shrink_to(retain.entries);
        }
        if self.buckets.capacity() > retain.entries {
            self.buckets.shrink_to(retain.entries);
        }
    }
}

/// 🧭 Routes encoded outputs into buckets for the life of one invocation.
pub(crate) struct Router<'p> {
    buckets: Pooled<'p, BucketMap>,
    buffers: &'p Pool<Vec<u8>>,
    scratch: Pooled<'p, Vec<u8>>,
    composer: ComposerBackend,
    seq: u64,
}

impl<'p> Router<'p> {
    pub(crate) fn new(pools: &'p Pools, composer: ComposerBackend) -> Self {
        Self {
            buckets: pools.buckets.acquire(),
            buffers: &pools.buffers,
            scratch: pools.buffers.acquire(),
            composer,
            seq: 0,
        }
    }

    /// 📬 Encode `item` once and append it to every sink in `sinks` (default sink when empty).
    /// `index` is the input record this output came from, for error messages.
    pub(crate) fn route<T: Serialize + ?Sized>(
        &mut self,
        index: usize,
        item: &T,
        sinks: &[SinkSpec],
    ) -> Result<()> {
        self.seq += 1;
        self.scratch.clear();
        self.composer
            .compose_into(item, &mut self.scratch)
            .map_err(|cause| AdapterError::Encode { index, cause })?;

        let buffers = self.buffers;
        let fresh = || buffers.acquire().detach();
        if sinks.is_empty() {
            self.buckets
                .append(Cow::Owned(Sink::Default), &self.scratch, self.seq, fresh);
            return Ok(());
        }
        for spec in sinks {
            let sink = spec.resolve()?;
            self.buckets.append(sink, &self.scratch, self.seq, fresh);
        }
        Ok(())
    }

    pub(crate) fn bucket_map(&mut self) -> &mut BucketMap {
        &mut self.buckets
    }
}

impl Drop for Router<'_> {
    fn drop(&mut self) {
        // 🧺 bucket buffers go home before the (now empty) map does
        for bucket in self.buckets.buckets.drain(..) {
            self.buffers.release(bucket.buf);
        }
    }
}
