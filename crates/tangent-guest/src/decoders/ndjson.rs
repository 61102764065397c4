//! 📡 **NdjsonDecoder**: one JSON object per line.
//!
//! Lines are found with `memchr`, which is the fastest way to find a byte
//! without writing SIMD by hand and regretting it.
//!
//! Forgiving about whitespace, strict about everything else:
//! - blank / whitespace-only lines are skipped (they are not records, and not errors)
//! - a trailing `\r` is stripped, so CRLF batches decode the same as LF ones
//! - the last line does not need a `\n`
//! - a line that is valid JSON but not an object (`[1,2]`, `"hi"`, `null`) is a decode error

use super::Decoder;
use crate::common::{Record, RecordSeed};
use crate::error::DecodeError;
use memchr::memchr;
use serde::de::DeserializeSeed;

#[derive(Debug)]
pub(crate) struct NdjsonDecoder<'a> {
    rest: &'a [u8],
}

impl<'a> NdjsonDecoder<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { rest: input }
    }
}

impl Decoder for NdjsonDecoder<'_> {
    fn decode_next(&mut self, into: &mut Record) -> Result<bool, DecodeError> {
        into.clear();
        while !self.rest.is_empty() {
            let (line, rest) = match memchr(b'\n', self.rest) {
                Some(nl) => (&self.rest[..nl], &self.rest[nl + 1..]),
                None => (self.rest, &self.rest[self.rest.len()..]),
            };
            self.rest = rest;
            if decode_line(line, into)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// 🧾 Decode a single line (no `\n`) into an already-cleared record.
/// `Ok(false)` means the line was blank and nothing was decoded.
pub(crate) fn decode_line(line: &[u8], into: &mut Record) -> Result<bool, DecodeError> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(false);
    }
    let mut de = serde_json::Deserializer::from_slice(line);
    RecordSeed(into).deserialize(&mut de)?;
    // -- 💀 "{"a":1} {"b":2}" on one line is two objects pretending to be one record. No.
    de.end()?;
    Ok(true)
}
