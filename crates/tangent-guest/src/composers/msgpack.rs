//! 📦 **MsgPackComposer**: one MessagePack value per item, back to back.
//!
//! No delimiter. Every MessagePack value starts with a type/length header, so a reader
//! knows where it ends without help. Structs go out as maps (field names included),
//! which is what a map-decoding reader on the other side expects.

use super::Composer;
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MsgPackComposer;

impl Composer for MsgPackComposer {
    #[inline]
    fn compose_into<T: Serialize + ?Sized>(&self, item: &T, buf: &mut Vec<u8>) -> Result<()> {
        rmp_serde::encode::write_named(buf, item)
            .context("💀 Output item refused to become MessagePack")
    }
}
