//! 📥 Decoders: one batch buffer in, one record at a time out.
//!
//! 🎬 COLD OPEN: INT. HOST BOUNDARY - A BUFFER ARRIVES
//!
//! It is one contiguous slab of bytes. Somewhere in there are records. Maybe a
//! thousand. Maybe zero. Maybe one that is not JSON at all, and that one ruins it
//! for everybody.
//!
//! A decoder is a cursor over that slab. Each `decode_next` call finds the next record
//! boundary, fills the caller's scratch `Record` in place, and reports whether it found
//! one. Decoders never allocate a record and never hold one. The caller owns the scratch
//! record and reuses it, so steady-state decoding allocates only for the field values.
//!
//! 🧠 Knowledge graph:
//! - **NDJSON** (`NdjsonDecoder`): `memchr` for `\n`, blank lines skipped, trailing `\r` stripped
//! - **MessagePack** (`MsgPackDecoder`): back-to-back maps, each framed by its own header
//! - Resolution: `DecoderBackend::from_config(WireFormat, &[u8])`
//! - A malformed record is an `Err`, and the cursor is not meant to be resumed after one
//!
//! 🦆 The lazy sequence is lazy. It is also finite and non-restartable, like a Monday.

use crate::common::Record;
use crate::error::DecodeError;

pub(crate) mod backend;
pub(crate) mod msgpack;
pub(crate) mod ndjson;

pub(crate) use backend::DecoderBackend;
pub(crate) use msgpack::MsgPackDecoder;
pub(crate) use ndjson::NdjsonDecoder;

/// 📥 Pulls the next record out of the input.
pub(crate) trait Decoder {
    /// 🔄 Clear `into`, then fill it with the next record.
    ///
    /// `Ok(true)`: `into` holds a record. `Ok(false)`: input exhausted, `into` is empty.
    /// `Err`: the next record is malformed. `into` may hold a partial record; do not use it.
    fn decode_next(&mut self, into: &mut Record) -> Result<bool, DecodeError>;
}
