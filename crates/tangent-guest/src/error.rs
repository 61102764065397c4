//! 💀 Errors: the one value the host sees when a batch goes sideways.
//!
//! Every failure inside an invocation is batch-fatal. There is no "mostly worked".
//! The host gets exactly one of these, rendered to a string at the boundary,
//! and zero buckets. It decides what to retry. We decide nothing. We just report.
//!
//! 🧠 Knowledge graph:
//! - `DecodeError`: the input bytes were not a record (NDJSON or MessagePack flavored sadness)
//! - `AdapterError`: the invocation-level taxonomy (decode, transform, unknown sink, encode, io)
//! - Handlers speak `anyhow`. We wrap what they say in `Transform` and keep the whole chain.

use thiserror::Error;

/// 🧱 A single input record refused to decode.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed MessagePack record: {0}")]
    MsgPack(#[from] rmp_serde::decode::Error),
}

/// 💀 Why an invocation failed. Always the whole batch, never a piece of it.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// 📥 Record `index` (0-based, in decode order) was malformed.
    #[error("failed to decode record {index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },

    /// 🔄 The handler returned an error for record `index`.
    /// In batch mode there is no single record to blame, so `index` is the batch size.
    #[error("handler failed on record {index}: {cause:#}")]
    Transform { index: usize, cause: anyhow::Error },

    /// 🧭 An output named a sink the router does not recognize.
    #[error("unknown sink '{spec}': {reason}")]
    UnknownSink { spec: String, reason: &'static str },

    /// 📤 An output item could not be serialized into its bucket.
    #[error("failed to encode output of record {index}: {cause:#}")]
    Encode { index: usize, cause: anyhow::Error },

    /// 🚰 Reading a streamed batch failed before it was fully consumed.
    #[error("failed to read input stream: {0}")]
    Io(#[from] std::io::Error),

    /// 🔁 The adapter was called while an invocation was already running.
    #[error("re-entrant invocation: the adapter is already processing a batch")]
    Reentrant,
}

pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_transform_errors_keep_their_whole_backstory() {
        let cause = anyhow::anyhow!("geoip lookup timed out").context("enriching record");
        let err = AdapterError::Transform { index: 3, cause };
        assert_eq!(
            err.to_string(),
            "handler failed on record 3: enriching record: geoip lookup timed out"
        );
    }

    #[test]
    fn the_one_where_decode_errors_name_the_guilty_record() {
        let json_err = serde_json::from_slice::<serde_json::Value>(b"{nope").unwrap_err();
        let err = AdapterError::Decode {
            index: 7,
            source: json_err.into(),
        };
        let rendered = err.to_string();
        assert!(rendered.starts_with("failed to decode record 7: malformed JSON record"), "{rendered}");
    }
}
