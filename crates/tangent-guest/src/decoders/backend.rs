//! 🎭 **DecoderBackend**: picks the decoder for the configured wire format.
//!
//! Same trick as the composers: an enum over concrete decoders, one `match` per
//! call, everything monomorphized. The wire format is fixed per adapter, so the
//! branch predictor figures it out after about two records.

use super::{Decoder, MsgPackDecoder, NdjsonDecoder};
use crate::app_config::WireFormat;
use crate::common::Record;
use crate::error::DecodeError;

#[derive(Debug)]
pub(crate) enum DecoderBackend<'a> {
    Ndjson(NdjsonDecoder<'a>),
    MsgPack(MsgPackDecoder<'a>),
}

impl<'a> DecoderBackend<'a> {
    pub(crate) fn from_config(format: WireFormat, input: &'a [u8]) -> Self {
        match format {
            WireFormat::Ndjson => Self::Ndjson(NdjsonDecoder::new(input)),
            WireFormat::MsgPack => Self::MsgPack(MsgPackDecoder::new(input)),
        }
    }
}

impl Decoder for DecoderBackend<'_> {
    #[inline]
    fn decode_next(&mut self, into: &mut Record) -> Result<bool, DecodeError> {
        match self {
            Self::Ndjson(d) => d.decode_next(into),
            Self::MsgPack(d) => d.decode_next(into),
        }
    }
}
