//! 🎬 *[a record leaves the handler. a bucket waits. somebody has to turn one into bytes for the other.]*
//!
//! 🎼 Composers: per-record output encoders.
//!
//! A composer writes ONE output item onto the end of a byte buffer, delimiter included.
//! It never clears the buffer and never reads it back. The router decides which buffer;
//! the composer decides what the bytes look like.
//!
//! 🧠 Knowledge graph:
//! - **NDJSON** (`NdjsonComposer`): compact JSON + `\n`. The default, and what hosts expect.
//! - **MessagePack** (`MsgPackComposer`): one self-framing value per item, nothing in between.
//! - Resolution: `ComposerBackend::from_config(OutputEncoding)`, same shape as the decoders.
//!
//! 🦆 (the duck composes in both formats. it refuses to say which it prefers.)

use anyhow::Result;
use serde::Serialize;

pub(crate) mod backend;
pub(crate) mod msgpack;
pub(crate) mod ndjson;

pub(crate) use backend::ComposerBackend;
pub(crate) use msgpack::MsgPackComposer;
pub(crate) use ndjson::NdjsonComposer;

/// 🎼 Appends one encoded item (plus whatever delimiter the format needs) to `buf`.
///
/// 💀 On error the tail of `buf` may hold a half-written item. Callers that care
/// write into a scratch buffer first.
pub(crate) trait Composer: std::fmt::Debug {
    fn compose_into<T: Serialize + ?Sized>(&self, item: &T, buf: &mut Vec<u8>) -> Result<()>;
}
