//! 🎭 **ComposerBackend**: the enum that picks a composer and then gets out of the way.
//!
//! 🧠 Knowledge graph:
//! - Resolution: `OutputEncoding` → `ComposerBackend::from_config()` → concrete composer
//! - Both composers are zero-sized, so cloning the backend is free.

use super::{Composer, MsgPackComposer, NdjsonComposer};
use crate::app_config::OutputEncoding;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub(crate) enum ComposerBackend {
    Ndjson(NdjsonComposer),
    MsgPack(MsgPackComposer),
}

impl ComposerBackend {
    /// 🔧 | OutputEncoding | Composer | Bytes per item |
    ///    |---|---|---|
    ///    | Ndjson | NdjsonComposer | `{json}\n` |
    ///    | MsgPack | MsgPackComposer | one msgpack value |
    pub(crate) fn from_config(encoding: OutputEncoding) -> Self {
        match encoding {
            OutputEncoding::Ndjson => Self::Ndjson(NdjsonComposer),
            OutputEncoding::MsgPack => Self::MsgPack(MsgPackComposer),
        }
    }
}

impl Composer for ComposerBackend {
    #[inline]
    fn compose_into<T: Serialize + ?Sized>(&self, item: &T, buf: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::Ndjson(c) => c.compose_into(item, buf),
            Self::MsgPack(c) => c.compose_into(item, buf),
        }
    }
}
