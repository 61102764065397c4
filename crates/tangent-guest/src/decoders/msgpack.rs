//! 📦 **MsgPackDecoder**: concatenated MessagePack maps.
//!
//! No delimiter needed: each value starts with a type/length header, so the
//! deserializer consumes exactly one record's bytes and the cursor lands on the next.
//! The cursor is a `&[u8]` that the deserializer reads through and advances.

use super::Decoder;
use crate::common::{Record, RecordSeed};
use crate::error::DecodeError;
use serde::de::DeserializeSeed;

#[derive(Debug)]
pub(crate) struct MsgPackDecoder<'a> {
    rest: &'a [u8],
}

impl<'a> MsgPackDecoder<'a> {
    pub(crate) fn new(input: &'a [u8]) -> Self {
        Self { rest: input }
    }
}

impl Decoder for MsgPackDecoder<'_> {
    fn decode_next(&mut self, into: &mut Record) -> Result<bool, DecodeError> {
        into.clear();
        if self.rest.is_empty() {
            return Ok(false);
        }
        let mut de = rmp_serde::Deserializer::new(&mut self.rest);
        RecordSeed(into).deserialize(&mut de)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn packed(values: &[serde_json::Value]) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        for v in values {
            rmp_serde::encode::write_named(&mut buf, v)?;
        }
        Ok(buf)
    }

    #[test]
    fn the_one_where_framed_maps_come_out_one_at_a_time() -> anyhow::Result<()> {
        let input = packed(&[
            json!({"class_uid": 1001, "msg": {"tags": ["x", "y"]}}),
            json!({"class_uid": 1002}),
        ])?;
        let mut decoder = MsgPackDecoder::new(&input);
        let mut scratch = Record::default();

        assert!(decoder.decode_next(&mut scratch)?);
        assert_eq!(scratch.int("class_uid"), Some(1001));
        assert_eq!(scratch.str("msg.tags[1]"), Some("y"));

        assert!(decoder.decode_next(&mut scratch)?);
        assert_eq!(scratch.int("class_uid"), Some(1002));
        assert!(!scratch.has("msg"));

        assert!(!decoder.decode_next(&mut scratch)?);
        Ok(())
    }

    #[test]
    fn the_one_where_a_truncated_frame_is_a_decode_error() -> anyhow::Result<()> {
        let mut input = packed(&[json!({"a": "complete"}), json!({"b": "cut off mid-string"})])?;
        input.truncate(input.len() - 4);
        let mut decoder = MsgPackDecoder::new(&input);
        let mut scratch = Record::default();
        assert!(decoder.decode_next(&mut scratch)?);
        assert!(matches!(
            decoder.decode_next(&mut scratch),
            Err(DecodeError::MsgPack(_))
        ));
        Ok(())
    }

    #[test]
    fn the_one_where_a_bare_integer_is_not_a_record() -> anyhow::Result<()> {
        let input = packed(&[json!(42)])?;
        let mut scratch = Record::default();
        assert!(MsgPackDecoder::new(&input).decode_next(&mut scratch).is_err());
        Ok(())
    }
}
