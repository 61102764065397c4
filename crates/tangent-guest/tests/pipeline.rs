//! 🧪 End-to-end: bytes in, sink payloads out, pools balanced, through the public API only.

use anyhow::Result;
use tangent_guest::{
    Adapter, AdapterConfig, AdapterError, BatchHandler, Handler, Output, OutputEncoding, Passthrough,
    PoolConfig, Record, Sink, SinkOutput, SinkSpec, Value, WireFormat, handler_fn,
};

fn ndjson_config() -> AdapterConfig {
    AdapterConfig::default()
}

fn payload_for<'a>(outputs: &'a [SinkOutput], sink: &Sink) -> Option<&'a [u8]> {
    outputs.iter().find(|o| &o.sink == sink).map(|o| o.data.as_slice())
}

/// 🎯 Sends every record to whatever sinks its `to` field lists (URI strings), default if none.
struct RouteByField;

impl Handler for RouteByField {
    type Item = Record;

    fn process_log(&mut self, log: &Record) -> Result<Vec<Output<Record>>> {
        let sinks: Vec<SinkSpec> = log
            .list("to")
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_str)
            .map(|uri| SinkSpec::from(uri.to_string()))
            .collect();
        Ok(vec![Output {
            item: log.clone(),
            sinks,
        }])
    }
}

/// 💣 Fails on the record whose `boom` field is true.
struct Landmine;

impl Handler for Landmine {
    type Item = Record;

    fn process_log(&mut self, log: &Record) -> Result<Vec<Output<Record>>> {
        if log.bool("boom") == Some(true) {
            anyhow::bail!("stepped on record {:?}", log.int("n"));
        }
        Ok(vec![Output::new(log.clone()).to(Sink::s3("out"))])
    }
}

#[test]
fn the_one_where_two_services_land_in_one_bucket_byte_for_byte() -> Result<()> {
    let mut adapter = Adapter::new(
        handler_fn(|log: &Record| Ok(vec![Output::new(log.clone()).to(Sink::s3("out"))])),
        ndjson_config(),
    );
    let outputs = adapter.process_logs(b"{\"service\":\"a\"}\n{\"service\":\"b\"}\n")?;
    assert_eq!(
        outputs,
        vec![SinkOutput {
            sink: Sink::S3 {
                name: "out".to_string(),
                key_prefix: None,
            },
            data: b"{\"service\":\"a\"}\n{\"service\":\"b\"}\n".to_vec(),
        }]
    );
    Ok(())
}

#[test]
fn the_one_where_fan_out_gives_each_sink_its_own_identical_copy() -> Result<()> {
    let mut adapter = Adapter::new(RouteByField, ndjson_config());
    let outputs = adapter.process_logs(
        b"{\"n\":1,\"to\":[\"s3://a\",\"file://b\"]}\n{\"n\":2,\"to\":[\"blackhole://c\"]}\n",
    )?;

    assert_eq!(outputs.len(), 3);
    let a = payload_for(&outputs, &Sink::s3("a")).expect("💀 bucket A missing");
    let b = payload_for(&outputs, &Sink::file("b")).expect("💀 bucket B missing");
    assert_eq!(a, b);
    assert!(a.starts_with(b"{\"n\":1,"));
    let c = payload_for(&outputs, &Sink::blackhole("c")).expect("💀 bucket C missing");
    assert!(!c.windows(5).any(|w| w == b"\"n\":1"), "record 1 only goes where it was sent");
    Ok(())
}

#[test]
fn the_one_where_equal_sinks_coalesce_and_keep_arrival_order() -> Result<()> {
    let mut adapter = Adapter::new(RouteByField, ndjson_config());
    let outputs = adapter.process_logs(
        b"{\"n\":1,\"to\":[\"s3://out/p\"]}\n\
          {\"n\":2,\"to\":[\"s3://out\"]}\n\
          {\"n\":3,\"to\":[\"s3://out/p\"]}\n\
          {\"n\":4,\"to\":[\"s3://out/p\"]}\n",
    )?;
    assert_eq!(outputs.len(), 2, "prefix is part of the key");
    let prefixed = payload_for(&outputs, &Sink::s3_with_prefix("out", "p")).expect("💀 prefixed bucket");
    let ns: Vec<i64> = std::str::from_utf8(prefixed)?
        .lines()
        .map(|l| Record::from_json(l).map(|r| r.int("n").unwrap_or(-1)))
        .collect::<Result<_>>()?;
    assert_eq!(ns, vec![1, 3, 4]);
    Ok(())
}

#[test]
fn the_one_where_no_sinks_means_only_the_default_bucket() -> Result<()> {
    let mut adapter = Adapter::new(RouteByField, ndjson_config());
    let outputs = adapter.process_logs(b"{\"n\":1}\n")?;
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].sink, Sink::Default);
    Ok(())
}

#[test]
fn the_one_where_one_bad_record_sinks_the_whole_batch() -> Result<()> {
    let mut adapter = Adapter::new(Landmine, ndjson_config());
    let result = adapter.process_logs(b"{\"n\":0}\n{\"n\":1}\n{\"n\":2,\"boom\":true}\n{\"n\":3}\n");
    match result {
        Err(AdapterError::Transform { index, cause }) => {
            assert_eq!(index, 2);
            assert!(cause.to_string().contains("stepped on record Some(2)"));
        }
        other => panic!("💀 expected a transform error, got {other:?}"),
    }
    assert_eq!(adapter.pool_stats().in_use(), 0, "failure returns everything too");

    let next = adapter.process_logs(b"{\"n\":9}\n")?;
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].data, b"{\"n\":9}\n", "nothing from the failed batch leaks into the next one");
    Ok(())
}

#[test]
fn the_one_where_malformed_input_and_unknown_sinks_are_batch_fatal() {
    let mut adapter = Adapter::new(RouteByField, ndjson_config());

    let decode = adapter.process_logs(b"{\"n\":1}\n\n{\"n\":\n");
    assert!(matches!(decode, Err(AdapterError::Decode { index: 1, .. })), "{decode:?}");

    let unknown = adapter.process_logs(b"{\"n\":1}\n{\"to\":[\"kafka://t\"]}\n");
    assert!(matches!(unknown, Err(AdapterError::UnknownSink { .. })), "{unknown:?}");

    assert_eq!(adapter.pool_stats().in_use(), 0);
}

#[test]
fn the_one_where_a_million_batches_later_nothing_new_was_allocated() -> Result<()> {
    let mut adapter = Adapter::new(RouteByField, ndjson_config());
    let batch = b"{\"to\":[\"s3://a\",\"s3://b\"]}\n{\"to\":[\"file://c\"]}\n{}\n";

    adapter.process_logs(batch)?;
    let warmed = adapter.pool_stats();
    for _ in 0..500 {
        adapter.process_logs(batch)?;
        let _ = adapter.process_logs(b"{\"to\":[\"nope\"]}\n");
    }
    let after = adapter.pool_stats();

    assert_eq!(after.in_use(), 0);
    assert_eq!(after.buffers.created, warmed.buffers.created, "buffers: high-water holds");
    assert_eq!(after.records.created, warmed.records.created);
    assert_eq!(after.buckets.created, warmed.buckets.created);
    assert_eq!(after.buffers.high_water, warmed.buffers.high_water);
    Ok(())
}

/// 🧨 A record that refuses to be written out when its `cursed` field is true.
struct Fragile(Record);

impl serde::Serialize for Fragile {
    fn serialize<S: serde::Serializer>(&self, ser: S) -> std::result::Result<S::Ok, S::Error> {
        if self.0.bool("cursed") == Some(true) {
            return Err(serde::ser::Error::custom("this record cannot be written down"));
        }
        self.0.serialize(ser)
    }
}

#[test]
fn the_one_where_an_output_that_cannot_be_encoded_fails_mid_batch() -> Result<()> {
    let mut adapter = Adapter::new(
        handler_fn(|log: &Record| Ok(vec![Output::new(Fragile(log.clone())).to(Sink::s3("out"))])),
        ndjson_config(),
    );
    let result = adapter.process_logs(b"{\"n\":0}\n{\"n\":1,\"cursed\":true}\n{\"n\":2}\n");
    match result {
        Err(AdapterError::Encode { index, cause }) => {
            assert_eq!(index, 1);
            assert!(cause.to_string().contains("cannot be written down"), "{cause}");
        }
        other => panic!("💀 expected an encode error, got {other:?}"),
    }
    assert_eq!(adapter.pool_stats().in_use(), 0);

    let next = adapter.process_logs(b"{\"n\":3}\n")?;
    assert_eq!(next, vec![SinkOutput { sink: Sink::s3("out"), data: b"{\"n\":3}\n".to_vec() }]);
    Ok(())
}

#[test]
fn the_one_where_a_64_bit_id_passes_through_untouched() -> Result<()> {
    let mut adapter = Adapter::new(Passthrough::default(), ndjson_config());
    let outputs = adapter.process_logs(b"{\"id\":18446744073709551615,\"t\":1e3,\"x\":1.0}\n")?;
    assert_eq!(outputs.len(), 1);
    assert_eq!(
        outputs[0].data,
        b"{\"id\":18446744073709551615,\"t\":1000.0,\"x\":1.0}\n"
    );
    Ok(())
}

#[test]
fn the_one_where_an_empty_batch_returns_immediately() -> Result<()> {
    let mut adapter = Adapter::new(Landmine, ndjson_config());
    assert!(adapter.process_logs(b"")?.is_empty());
    assert!(adapter.process_logs(b"\n \n")?.is_empty());
    assert_eq!(adapter.pool_stats().buffers.created, 1, "only the blank-line batch touched a pool");
    Ok(())
}

#[test]
fn the_one_where_msgpack_goes_in_and_comes_back_out() -> Result<()> {
    let mut input = Vec::new();
    rmp_serde::encode::write_named(&mut input, &serde_json::json!({"service": "a", "n": 1}))?;
    rmp_serde::encode::write_named(&mut input, &serde_json::json!({"service": "b", "n": 2}))?;

    let config = AdapterConfig {
        wire_format: WireFormat::MsgPack,
        output_encoding: OutputEncoding::MsgPack,
        ..AdapterConfig::default()
    };
    let mut adapter = Adapter::new(Passthrough::to(Sink::file("packed")), config);
    let outputs = adapter.process_logs(&input)?;
    assert_eq!(outputs.len(), 1);

    let mut rest = outputs[0].data.as_slice();
    let first: serde_json::Value = rmp_serde::from_read(&mut rest)?;
    let second: serde_json::Value = rmp_serde::from_read(&mut rest)?;
    assert!(rest.is_empty());
    assert_eq!(first, serde_json::json!({"n": 1, "service": "a"}));
    assert_eq!(second["service"], "b");
    Ok(())
}

#[test]
fn the_one_where_a_msgpack_stream_is_read_whole_then_decoded() -> Result<()> {
    let mut input = Vec::new();
    rmp_serde::encode::write_named(&mut input, &serde_json::json!({"service": "a"}))?;
    rmp_serde::encode::write_named(&mut input, &serde_json::json!({"service": "b"}))?;
    let config = AdapterConfig {
        wire_format: WireFormat::MsgPack,
        stream: tangent_guest::StreamConfig { chunk_size: 3 },
        ..AdapterConfig::default()
    };
    let mut adapter = Adapter::new(Passthrough::default(), config);

    let outputs = adapter.process_stream(&input[..])?;
    assert_eq!(
        outputs,
        vec![SinkOutput {
            sink: Sink::Default,
            data: b"{\"service\":\"a\"}\n{\"service\":\"b\"}\n".to_vec(),
        }]
    );
    assert!(adapter.process_stream(&b""[..])?.is_empty());

    // -- 0x81 promises a one-entry map and then delivers nothing
    let mut truncated = input.clone();
    truncated.push(0x81);
    let broken = adapter.process_stream(&truncated[..]);
    assert!(matches!(broken, Err(AdapterError::Decode { index: 2, .. })), "{broken:?}");
    assert_eq!(adapter.pool_stats().in_use(), 0);

    let again = adapter.process_stream(&input[..])?;
    assert_eq!(again, outputs);
    Ok(())
}

#[test]
fn the_one_where_the_stream_splits_lines_across_tiny_chunks() -> Result<()> {
    let config = AdapterConfig {
        stream: tangent_guest::StreamConfig { chunk_size: 5 },
        ..AdapterConfig::default()
    };
    let input = b"{\"service\":\"a\"}\r\n\n{\"service\":\"b\"}\n{\"service\":\"c\"}";
    let mut streamed = Adapter::new(Passthrough::default(), config);
    let mut whole = Adapter::new(Passthrough::default(), ndjson_config());

    let from_stream = streamed.process_stream(&input[..])?;
    let from_slice = whole.process_logs(input)?;
    assert_eq!(from_stream, from_slice);
    assert_eq!(
        from_stream[0].data,
        b"{\"service\":\"a\"}\n{\"service\":\"b\"}\n{\"service\":\"c\"}\n"
    );
    assert_eq!(streamed.pool_stats().in_use(), 0);
    Ok(())
}

#[test]
fn the_one_where_a_stream_error_mid_batch_counts_the_right_record() {
    let config = AdapterConfig {
        stream: tangent_guest::StreamConfig { chunk_size: 3 },
        ..AdapterConfig::default()
    };
    let mut adapter = Adapter::new(Passthrough::default(), config);
    let result = adapter.process_stream(&b"{}\n{}\n{oops}\n{}\n"[..]);
    assert!(matches!(result, Err(AdapterError::Decode { index: 2, .. })), "{result:?}");
}

/// 📦 Counts the batch it was given and emits one summary.
#[derive(Default)]
struct Summarize {
    calls: usize,
}

impl BatchHandler for Summarize {
    type Item = serde_json::Value;

    fn process_logs(&mut self, logs: &[Record]) -> Result<Vec<serde_json::Value>> {
        self.calls += 1;
        Ok(vec![serde_json::json!({"count": logs.len()})])
    }
}

#[test]
fn the_one_where_batch_mode_sees_everything_or_nothing() -> Result<()> {
    let mut adapter = Adapter::new(Summarize::default(), ndjson_config());

    let outputs = adapter.process_batch(b"{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n")?;
    assert_eq!(outputs, vec![SinkOutput { sink: Sink::Default, data: b"{\"count\":3}\n".to_vec() }]);

    let broken = adapter.process_batch(b"{\"a\":1}\nnot json\n");
    assert!(matches!(broken, Err(AdapterError::Decode { index: 1, .. })));
    assert_eq!(adapter.handler().calls, 1, "a malformed batch never reaches the handler");
    assert_eq!(adapter.pool_stats().in_use(), 0);
    Ok(())
}

/// 💣 Batch handler that gives up on any batch containing a `boom` record.
struct AllOrNothing;

impl BatchHandler for AllOrNothing {
    type Item = Record;

    fn process_logs(&mut self, logs: &[Record]) -> Result<Vec<Record>> {
        if logs.iter().any(|log| log.bool("boom") == Some(true)) {
            anyhow::bail!("refusing a batch of {} with a bomb in it", logs.len());
        }
        Ok(logs.to_vec())
    }
}

#[test]
fn the_one_where_a_batch_handler_failure_discards_the_batch() -> Result<()> {
    let mut adapter = Adapter::new(AllOrNothing, ndjson_config());
    let result = adapter.process_batch(b"{\"n\":1}\n{\"n\":2,\"boom\":true}\n{\"n\":3}\n");
    match result {
        Err(AdapterError::Transform { index, cause }) => {
            assert_eq!(index, 3, "batch failures report the batch size");
            assert!(cause.to_string().contains("batch of 3"), "{cause}");
        }
        other => panic!("💀 expected a transform error, got {other:?}"),
    }
    assert_eq!(adapter.pool_stats().in_use(), 0);

    let next = adapter.process_batch(b"{\"n\":4}\n{\"n\":5}\n")?;
    assert_eq!(next, vec![SinkOutput { sink: Sink::Default, data: b"{\"n\":4}\n{\"n\":5}\n".to_vec() }]);
    Ok(())
}

#[test]
fn the_one_where_tight_pool_limits_still_balance() -> Result<()> {
    let config = AdapterConfig {
        pool: PoolConfig {
            max_idle: 1,
            max_retained_bytes: 16,
            ..PoolConfig::default()
        },
        ..AdapterConfig::default()
    };
    let mut adapter = Adapter::new(RouteByField, config);
    adapter.process_logs(b"{\"to\":[\"s3://a\",\"s3://b\",\"s3://c\"],\"pad\":\"xxxxxxxxxxxxxxxxxxxxxxxx\"}\n")?;
    let stats = adapter.pool_stats();
    assert_eq!(stats.in_use(), 0);
    assert_eq!(stats.buffers.idle, 1);
    assert_eq!(stats.buffers.discarded, 3, "four buffers out, room for one on the shelf");
    Ok(())
}
