//! 📡 **NdjsonComposer**: compact JSON, one line per item.
//!
//! What's the DEAL with NDJSON? It's JSON but unfriendly. Every line is lonely.
//! No brackets to hold them. No commas to connect them. Just newlines. 🦆

use super::Composer;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct NdjsonComposer;

impl Composer for NdjsonComposer {
    #[inline]
    fn compose_into<T: Serialize + ?Sized>(&self, item: &T, buf: &mut Vec<u8>) -> Result<()> {
        serde_json::to_writer(&mut *buf, item)
            .context("💀 Output item refused to become JSON")?;
        // -- ✅ Trailing \n on every item, the last one included.
        buf.push(b'\n');
        Ok(())
    }
}
