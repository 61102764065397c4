//! ♻️ Pools: the only state that survives between invocations.
//!
//! 🎬 *[a buffer is borrowed. a buffer is filled. a buffer is wiped and put back on the shelf.]*
//! *[millions of batches later, the shelf holds the same four buffers. nobody allocated. nobody leaked.]*
//!
//! Every reusable thing the adapter touches per batch (byte buffers, scratch records,
//! record batches, bucket maps) comes out of a `Pool` and goes back in when the
//! invocation ends, success or failure. The return trip is owned by `Pooled`'s `Drop`,
//! so an early `?` cannot skip it and a value cannot go back twice.
//!
//! 🧠 Knowledge graph:
//! - `Reset`: "wipe yourself, keep your capacity (within reason)". Called on every release.
//! - `Pool<T>`: idle list + factory + stats. `acquire` never fails, it allocates on a miss.
//! - `Pooled<'p, T>`: the borrow guard. Deref to `T`, return-on-drop.
//! - `Pools`: the adapter's set of pools, created once at module init.
//!
//! ⚠️ `RefCell` + `Cell` make every pool `!Sync`. One invocation at a time is the contract,
//! and the compiler enforces it. Sharing pools across threads would need a lock at
//! `acquire`/`release` and nowhere else.

use crate::app_config::PoolConfig;
use crate::common::{Record, RecordBatch};
use crate::router::BucketMap;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// 📐 How much capacity a released entry is allowed to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retain {
    /// Byte capacity ceiling for buffers.
    pub bytes: usize,
    /// Slot/key capacity ceiling for maps and record rows.
    pub entries: usize,
}

/// 🧽 Wipe the contents, keep the allocation (shrinking anything that grew past `retain`).
pub trait Reset {
    fn reset(&mut self, retain: &Retain);
}

impl Reset for Vec<u8> {
    fn reset(&mut self, retain: &Retain) {
        self.clear();
        if self.capacity() > retain.bytes {
            self.shrink_to(retain.bytes);
        }
    }
}

/// 📊 Counters for one pool. `Copy`, so a snapshot is just a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Entries ever allocated by the factory.
    pub created: usize,
    /// Entries currently borrowed.
    pub in_use: usize,
    /// Most entries ever borrowed at the same time.
    pub high_water: usize,
    /// Entries sitting on the shelf right now.
    pub idle: usize,
    /// Entries dropped on release because the shelf was full.
    pub discarded: usize,
}

/// ♻️ A non-reentrant object pool.
pub struct Pool<T: Reset + Default> {
    idle: RefCell<Vec<T>>,
    make: Box<dyn Fn() -> T>,
    max_idle: usize,
    retain: Retain,
    stats: Cell<PoolStats>,
}

impl<T: Reset + Default> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("max_idle", &self.max_idle)
            .field("retain", &self.retain)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T: Reset + Default> Pool<T> {
    pub fn new(max_idle: usize, retain: Retain, make: impl Fn() -> T + 'static) -> Self {
        Self {
            idle: RefCell::new(Vec::with_capacity(max_idle.min(64))),
            make: Box::new(make),
            max_idle,
            retain,
            stats: Cell::new(PoolStats::default()),
        }
    }

    /// 🎣 Borrow a reset entry. Falls back to the factory when the shelf is empty.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let mut stats = self.stats.get();
        let shelved = self.idle.borrow_mut().pop();
        let item = match shelved {
            Some(item) => item,
            None => {
                stats.created += 1;
                (self.make)()
            }
        };
        stats.in_use += 1;
        stats.high_water = stats.high_water.max(stats.in_use);
        self.stats.set(stats);
        Pooled {
            pool: self,
            item,
            on_loan: true,
        }
    }

    /// 🧺 Take back an entry that left via [`Pooled::detach`].
    /// Clears it first; drops it if the shelf is already full.
    pub fn release(&self, mut item: T) {
        item.reset(&self.retain);
        let mut stats = self.stats.get();
        stats.in_use = stats.in_use.saturating_sub(1);
        let mut idle = self.idle.borrow_mut();
        if idle.len() < self.max_idle {
            idle.push(item);
        } else {
            stats.discarded += 1;
        }
        self.stats.set(stats);
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = self.stats.get();
        stats.idle = self.idle.borrow().len();
        stats
    }
}

/// 🎟️ A borrowed pool entry. Goes home on drop.
pub struct Pooled<'p, T: Reset + Default> {
    pool: &'p Pool<T>,
    item: T,
    on_loan: bool,
}

impl<T: Reset + Default> Pooled<'_, T> {
    /// 🪂 Take the entry out of the guard. The caller now owes the pool a
    /// [`Pool::release`] for it.
    pub fn detach(mut self) -> T {
        self.on_loan = false;
        std::mem::take(&mut self.item)
    }
}

impl<T: Reset + Default> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.item
    }
}

impl<T: Reset + Default> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.item
    }
}

impl<T: Reset + Default> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if self.on_loan {
            self.pool.release(std::mem::take(&mut self.item));
        }
    }
}

impl<T: Reset + Default + fmt::Debug> fmt::Debug for Pooled<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pooled").field(&self.item).finish()
    }
}

// ===== The adapter's pool set =====

/// 🗄️ Every pool one adapter instance owns. Built once, lives as long as the module.
#[derive(Debug)]
pub struct Pools {
    pub(crate) buffers: Pool<Vec<u8>>,
    pub(crate) records: Pool<Record>,
    pub(crate) batches: Pool<RecordBatch>,
    pub(crate) buckets: Pool<BucketMap>,
}

/// 📸 A point-in-time read of every pool's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolsSnapshot {
    pub buffers: PoolStats,
    pub records: PoolStats,
    pub batches: PoolStats,
    pub buckets: PoolStats,
}

impl PoolsSnapshot {
    /// 🔢 Entries currently borrowed across all pools. Zero between invocations, or we leaked.
    pub fn in_use(&self) -> usize {
        self.buffers.in_use + self.records.in_use + self.batches.in_use + self.buckets.in_use
    }
}

impl Pools {
    pub fn new(config: &PoolConfig) -> Self {
        let retain = Retain {
            bytes: config.max_retained_bytes,
            entries: config.max_retained_entries,
        };
        let buffer_capacity = config.buffer_capacity;
        let record_capacity = config.record_capacity;
        Self {
            buffers: Pool::new(config.max_idle, retain, move || {
                Vec::with_capacity(buffer_capacity)
            }),
            records: Pool::new(config.max_idle, retain, move || {
                Record::with_capacity(record_capacity)
            }),
            batches: Pool::new(config.max_idle, retain, move || {
                RecordBatch::new(record_capacity)
            }),
            buckets: Pool::new(config.max_idle, retain, BucketMap::default),
        }
    }

    pub fn snapshot(&self) -> PoolsSnapshot {
        PoolsSnapshot {
            buffers: self.buffers.stats(),
            records: self.records.stats(),
            batches: self.batches.stats(),
            buckets: self.buckets.stats(),
        }
    }
}
