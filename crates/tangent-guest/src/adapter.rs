//! 🚀 Adapter: one batch in, sink payloads out, pools back on the shelf.
//!
//! 🎬 COLD OPEN: INT. SANDBOX - INVOCATION #4,812,337
//!
//! The host hands over a buffer and blocks. Somewhere in the buffer are log lines.
//! The adapter borrows a scratch record, a bucket map, and a scratch buffer. It decodes,
//! calls the handler, routes, and repeats until the buffer runs dry. Then it packages the
//! buckets, returns everything it borrowed, and goes back to sleep until invocation
//! #4,812,338. It has done this four million times. It has allocated almost nothing since
//! invocation #3.
//!
//! ## Failure 💀
//! Any decode error, handler error, unknown sink, or encode error ends the invocation.
//! Whatever was already routed is thrown away. The host gets one error and zero outputs.
//! The borrowed pool entries go back exactly as they would have on success, because
//! every one of them is held by a guard that returns it on drop.
//!
//! ## Knowledge Graph 🧠
//! - `process_logs`: per-record `Handler`, whole buffer in memory
//! - `process_batch`: `BatchHandler`, whole batch decoded before the handler runs
//! - `process_stream`: per-record `Handler`, reads an `io::Read` in `chunk_size` pieces
//! - State that survives between calls: the handler, the pools, the config. Nothing else.

use crate::app_config::{AdapterConfig, WireFormat};
use crate::assembler::{SinkOutput, assemble};
use crate::common::Record;
use crate::composers::ComposerBackend;
use crate::decoders::{Decoder, DecoderBackend, NdjsonDecoder};
use crate::error::{AdapterError, Result};
use crate::pool::{Pools, PoolsSnapshot};
use crate::router::Router;
use crate::transforms::{BatchHandler, Handler};
use memchr::memrchr;
use std::io::{ErrorKind, Read};
use tracing::debug;

/// 🚀 A handler plus everything it needs to run batch after batch without allocating.
pub struct Adapter<H> {
    handler: H,
    pools: Pools,
    config: AdapterConfig,
    composer: ComposerBackend,
    invocations: u64,
}

impl<H> Adapter<H> {
    pub fn new(handler: H, config: AdapterConfig) -> Self {
        debug!(
            "🔧 Adapter ready: {:?} in, {:?} out, {} idle entries per pool",
            config.wire_format, config.output_encoding, config.pool.max_idle
        );
        Self {
            handler,
            pools: Pools::new(&config.pool),
            composer: ComposerBackend::from_config(config.output_encoding),
            config,
            invocations: 0,
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// 📊 Pool counters right now. Between invocations `in_use()` is zero, or something leaked.
    pub fn pool_stats(&self) -> PoolsSnapshot {
        self.pools.snapshot()
    }

    /// 🔢 Invocations started so far (empty batches included).
    pub fn invocations(&self) -> u64 {
        self.invocations
    }
}

impl<H: Handler> Adapter<H> {
    /// 🔄 Decode `input`, run every record through the handler, and return one payload per sink.
    pub fn process_logs(&mut self, input: &[u8]) -> Result<Vec<SinkOutput>> {
        self.invocations += 1;
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let Self {
            handler,
            pools,
            config,
            composer,
            invocations,
        } = self;
        run_slice(handler, pools, config.wire_format, *composer, input, *invocations)
    }

    /// 🚿 Like [`process_logs`](Self::process_logs), but pulls the batch from a reader.
    ///
    /// NDJSON is decoded as it arrives: each chunk's complete lines are processed right away
    /// and the unfinished tail is carried into the next chunk. MessagePack has no cheap way
    /// to find a record boundary, so the stream is read whole into a pooled buffer first.
    pub fn process_stream<R: Read>(&mut self, mut reader: R) -> Result<Vec<SinkOutput>> {
        self.invocations += 1;
        let Self {
            handler,
            pools,
            config,
            composer,
            invocations,
        } = self;

        if config.wire_format == WireFormat::MsgPack {
            let mut whole = pools.buffers.acquire();
            reader.read_to_end(&mut whole)?;
            if whole.is_empty() {
                return Ok(Vec::new());
            }
            return run_slice(handler, pools, WireFormat::MsgPack, *composer, &whole, *invocations);
        }

        let mut router = Router::new(pools, *composer);
        let mut record = pools.records.acquire();
        let mut carry = pools.buffers.acquire();
        let mut chunk = pools.buffers.acquire();
        chunk.resize(config.stream.chunk_size.max(1), 0);

        let mut decoded = 0;
        let pumped = pump_stream(
            &mut reader,
            &mut chunk,
            &mut carry,
            &mut record,
            handler,
            &mut router,
            &mut decoded,
        );
        settle(pumped, router, decoded, *invocations)
    }
}

impl<H: BatchHandler> Adapter<H> {
    /// 📦 Decode the entire batch, hand all of it to the handler at once, and route every
    /// returned item to the default sink.
    ///
    /// A batch with no records (empty, or nothing but blank lines) never reaches the handler.
    pub fn process_batch(&mut self, input: &[u8]) -> Result<Vec<SinkOutput>> {
        self.invocations += 1;
        if input.is_empty() {
            return Ok(Vec::new());
        }
        let Self {
            handler,
            pools,
            config,
            composer,
            invocations,
        } = self;

        let mut batch = pools.batches.acquire();
        let mut decoder = DecoderBackend::from_config(config.wire_format, input);
        loop {
            let index = batch.len();
            match batch.fill_next(|slot| decoder.decode_next(slot)) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(source) => {
                    debug!("💀 Invocation #{invocations} failed before the handler ran: record {index} is malformed");
                    return Err(AdapterError::Decode { index, source });
                }
            }
        }
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut router = Router::new(pools, *composer);
        let routed = route_batch(handler, batch.as_slice(), &mut router);
        settle(routed, router, batch.len(), *invocations)
    }
}

// ===== The loops =====

fn run_slice<H: Handler>(
    handler: &mut H,
    pools: &Pools,
    format: WireFormat,
    composer: ComposerBackend,
    input: &[u8],
    invocation: u64,
) -> Result<Vec<SinkOutput>> {
    let mut router = Router::new(pools, composer);
    let mut record = pools.records.acquire();
    let mut decoder = DecoderBackend::from_config(format, input);
    let mut decoded = 0;
    let pumped = pump(&mut decoder, &mut record, handler, &mut router, &mut decoded);
    settle(pumped, router, decoded, invocation)
}

/// 🔁 Decode → handle → route until the decoder runs dry. `next_index` counts records
/// across calls, so a stream's chunks share one numbering.
fn pump<D: Decoder, H: Handler>(
    decoder: &mut D,
    record: &mut Record,
    handler: &mut H,
    router: &mut Router<'_>,
    next_index: &mut usize,
) -> Result<()> {
    loop {
        let index = *next_index;
        match decoder.decode_next(record) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(source) => return Err(AdapterError::Decode { index, source }),
        }
        *next_index += 1;

        let outputs = handler
            .process_log(record)
            .map_err(|cause| AdapterError::Transform { index, cause })?;
        for output in &outputs {
            router.route(index, &output.item, &output.sinks)?;
        }
    }
}

fn pump_stream<R: Read, H: Handler>(
    reader: &mut R,
    chunk: &mut [u8],
    carry: &mut Vec<u8>,
    record: &mut Record,
    handler: &mut H,
    router: &mut Router<'_>,
    next_index: &mut usize,
) -> Result<()> {
    loop {
        let read = match reader.read(chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        let fresh = &chunk[..read];
        let Some(last_nl) = memrchr(b'\n', fresh) else {
            carry.extend_from_slice(fresh);
            continue;
        };
        carry.extend_from_slice(&fresh[..=last_nl]);
        pump(&mut NdjsonDecoder::new(carry), record, handler, router, next_index)?;
        carry.clear();
        carry.extend_from_slice(&fresh[last_nl + 1..]);
    }
    // -- 🧾 whatever is left never got its \n. It is still a line.
    pump(&mut NdjsonDecoder::new(carry), record, handler, router, next_index)
}

fn route_batch<H: BatchHandler>(
    handler: &mut H,
    logs: &[Record],
    router: &mut Router<'_>,
) -> Result<()> {
    let items = handler
        .process_logs(logs)
        .map_err(|cause| AdapterError::Transform {
            index: logs.len(),
            cause,
        })?;
    for (index, item) in items.iter().enumerate() {
        router.route(index, item, &[])?;
    }
    Ok(())
}

/// ⚖️ Success: package the buckets. Failure: log it and let the router drop (buffers go home).
fn settle(
    pumped: Result<()>,
    router: Router<'_>,
    decoded: usize,
    invocation: u64,
) -> Result<Vec<SinkOutput>> {
    match pumped {
        Ok(()) => {
            let outputs = assemble(router);
            debug!(
                "✅ Invocation #{invocation}: {decoded} records → {} sinks, {} bytes",
                outputs.len(),
                outputs.iter().map(|o| o.data.len()).sum::<usize>()
            );
            Ok(outputs)
        }
        Err(e) => {
            debug!("💀 Invocation #{invocation} failed after {decoded} records, discarding all output: {e}");
            Err(e)
        }
    }
}
