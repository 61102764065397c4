//! 📦 Assembler: router state in, the host's result list out.
//!
//! Called only on the success path. Each bucket becomes one `SinkOutput`, in the
//! order the buckets were first used. The payload is an exact-size copy of the
//! bucket buffer, because the buffer itself goes back to the pool the moment the
//! router drops (which is right after this returns). The host gets bytes it owns.
//! The pool keeps the capacity. Everybody wins.
//!
//! On failure nothing gets assembled. The router just drops, its buffers go home,
//! and the host sees the error and zero outputs.

use crate::router::Router;
use crate::sinks::Sink;
use tracing::trace;

/// 📤 One sink's finished payload for this invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkOutput {
    pub sink: Sink,
    /// Encoded records in arrival order, delimiters included.
    pub data: Vec<u8>,
}

/// 🎁 Package every bucket and consume the router (which returns its buffers to the pool).
pub(crate) fn assemble(mut router: Router<'_>) -> Vec<SinkOutput> {
    let map = router.bucket_map();
    let mut outputs = Vec::with_capacity(map.len());
    for bucket in map.buckets_mut() {
        trace!(
            "📦 Sink '{}': {} records, {} bytes",
            bucket.sink,
            bucket.records,
            bucket.buf.len()
        );
        outputs.push(SinkOutput {
            // -- the bucket is about to be drained; its sink can leave without a clone
            sink: std::mem::replace(&mut bucket.sink, Sink::Default),
            data: bucket.buf.as_slice().to_vec(),
        });
    }
    outputs
}
