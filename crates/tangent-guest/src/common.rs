//! 📦 Records: the view a handler gets of one log line.
//!
//! 🎬 COLD OPEN: INT. SANDBOX - SOMEWHERE BETWEEN THE HOST AND THE HEAP
//!
//! A batch arrives. Thousands of lines. Each one gets decoded into the SAME
//! `Record`, handed to the handler for exactly one call, then wiped clean for
//! the next line. The record never leaves the loop. It is a hotel room, not a house.
//! The keys are returned at checkout. The towels are folded. The capacity stays.
//!
//! 🧠 Knowledge graph:
//! - `Record`: top-level field map + path accessors that return `None` instead of failing
//! - `RecordSeed`: fills an existing record in place (no per-line map allocation in steady state)
//! - `RecordBatch`: a reusable row of records for batch-mode handlers
//! - All three implement `Reset`, so the pools can recycle them

use crate::pool::{Reset, Retain};
use crate::value::Value;
use serde::de::{DeserializeSeed, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// 🎯 One decoded input entry: field name → value.
///
/// Lookups accept an exact top-level key first (`"source.name"` as a literal key
/// wins), then fall back to a dotted path with optional list indexes
/// (`"msg.tags[0]"`, `"a.b[1][2].c"`). A missing hop anywhere yields `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: HashMap::with_capacity(capacity),
        }
    }

    /// 🧪 Decode a single JSON object. Handy for handler unit tests.
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let mut record = Record::default();
        let mut de = serde_json::Deserializer::from_str(raw);
        RecordSeed(&mut record).deserialize(&mut de)?;
        de.end()?;
        Ok(record)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 🧹 Drop every field, keep the map's capacity.
    pub(crate) fn clear(&mut self) {
        self.fields.clear();
    }

    /// 🔍 Resolve a field path. Never fails, only shrugs (`None`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(v) = self.fields.get(path) {
            return Some(v);
        }

        let mut segments = path.split('.');
        let (key, indexes) = split_indexes(segments.next()?);
        let mut cur = walk_indexes(self.fields.get(key)?, indexes)?;
        for seg in segments {
            let (key, indexes) = split_indexes(seg);
            if !key.is_empty() {
                cur = cur.child(key)?;
            }
            cur = walk_indexes(cur, indexes)?;
        }
        Some(cur)
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    pub fn int(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(Value::as_i64)
    }

    pub fn uint(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(Value::as_u64)
    }

    pub fn float(&self, path: &str) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    pub fn bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }

    pub fn list(&self, path: &str) -> Option<&[Value]> {
        self.get(path).and_then(Value::as_list)
    }

    pub fn map(&self, path: &str) -> Option<&BTreeMap<String, Value>> {
        self.get(path).and_then(Value::as_map)
    }

    /// 📏 List length or string byte length at `path`.
    pub fn len(&self, path: &str) -> Option<usize> {
        self.get(path).and_then(Value::len)
    }

    /// 🔑 Keys of the map at `path`, sorted. An empty path means the top level.
    pub fn keys(&self, path: &str) -> Vec<&str> {
        if path.is_empty() {
            let mut keys: Vec<&str> = self.fields.keys().map(String::as_str).collect();
            keys.sort_unstable();
            return keys;
        }
        self.map(path)
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

// -- "tags[0][1]" → ("tags", "[0][1]")
fn split_indexes(seg: &str) -> (&str, &str) {
    match seg.find('[') {
        Some(i) => (&seg[..i], &seg[i..]),
        None => (seg, ""),
    }
}

fn walk_indexes<'v>(mut cur: &'v Value, mut rest: &str) -> Option<&'v Value> {
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let idx: usize = inner[..close].parse().ok()?;
        cur = cur.index(idx)?;
        rest = &inner[close + 1..];
    }
    Some(cur)
}

impl Reset for Record {
    fn reset(&mut self, retain: &Retain) {
        self.fields.clear();
        if self.fields.capacity() > retain.entries {
            self.fields.shrink_to(retain.entries);
        }
    }
}

/// 📤 Records serialize as a plain object with sorted keys, so output bytes
/// do not depend on hash order.
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(&String, &Value)> = self.fields.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        let mut map = ser.serialize_map(Some(entries.len()))?;
        for (k, v) in entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

// ===== In-place decoding =====

/// 🌱 Deserializes one map straight into an existing (already reset) record.
///
/// Anything that is not a map is rejected: a log line that decodes to `[1,2]`
/// or `"hello"` is not a record, it is a decode error.
pub(crate) struct RecordSeed<'r>(pub(crate) &'r mut Record);

impl<'de> DeserializeSeed<'de> for RecordSeed<'_> {
    type Value = ();

    fn deserialize<D: Deserializer<'de>>(self, d: D) -> Result<(), D::Error> {
        d.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for RecordSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a log record object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            let value = map.next_value::<Value>()?;
            self.0.fields.insert(key, value);
        }
        Ok(())
    }
}

// ===== Batch-mode scratch =====

/// 🧺 A reusable row of records for batch-mode handlers.
///
/// Slots past `len` are kept (already cleared) so their map capacity
/// survives into the next invocation.
#[derive(Debug, Default)]
pub struct RecordBatch {
    records: Vec<Record>,
    len: usize,
    record_capacity: usize,
}

impl RecordBatch {
    pub fn new(record_capacity: usize) -> Self {
        Self {
            records: Vec::new(),
            len: 0,
            record_capacity,
        }
    }

    /// 📥 Hand the next free slot to `fill`. The slot only counts if `fill` says
    /// it produced a record (`Ok(true)`); otherwise it is cleared and left for later.
    pub(crate) fn fill_next<E>(
        &mut self,
        fill: impl FnOnce(&mut Record) -> Result<bool, E>,
    ) -> Result<bool, E> {
        if self.len == self.records.len() {
            self.records.push(Record::with_capacity(self.record_capacity));
        }
        let slot = &mut self.records[self.len];
        match fill(slot) {
            Ok(true) => {
                self.len += 1;
                Ok(true)
            }
            other => {
                slot.clear();
                other
            }
        }
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Reset for RecordBatch {
    fn reset(&mut self, retain: &Retain) {
        for record in &mut self.records[..self.len] {
            record.reset(retain);
        }
        self.len = 0;
        self.records.truncate(retain.entries);
    }
}
