//! 🧭 Sinks: where an output record wants to go.
//!
//! 🎬 *[a record stands at the crossroads. four signs. one says "default". one says "s3".]*
//! *[one says "file". one says "blackhole", and it is not a metaphor.]*
//!
//! A `Sink` is the structural identity of one physical destination. Two sinks that
//! compare equal are the same bucket, no matter which record built them or how.
//! Every field that tells destinations apart (name, key prefix) is part of the key,
//! so `s3://logs` and `s3://logs/errors` never share a bucket.
//!
//! Handlers name a sink one of two ways:
//! - typed: `Sink::s3("out")`, checked by the compiler
//! - a URI string such as `"s3://out/2024/"`, usually lifted straight from plugin config.
//!   Strings are only checked when the router sees them, and a bad one fails the batch.
//!
//! 🧠 Knowledge graph:
//! - `Sink`: closed enum, exhaustive matches in the router. New kinds are a compile error, not a surprise.
//! - `SinkSpec`: what a handler hands over. Resolves to a `Sink` or an `UnknownSink` error.
//! - `Display` for `Sink` prints the URI form, and `SinkSpec::resolve` parses it back.

use crate::error::AdapterError;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;

/// 🎯 One physical output destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Sink {
    /// 🏠 The host's configured default. What you get when you say nothing.
    Default,
    /// 🪣 An object store target. `key_prefix` is sub-addressing, and part of the identity.
    S3 {
        name: String,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            deserialize_with = "non_empty_prefix"
        )]
        key_prefix: Option<String>,
    },
    /// 📁 A named file target.
    File { name: String },
    /// 🕳️ A named discard target. Writes succeed. Nothing is ever seen again.
    Blackhole { name: String },
}

impl Sink {
    pub fn s3(name: impl Into<String>) -> Self {
        Sink::S3 {
            name: name.into(),
            key_prefix: None,
        }
    }

    /// An empty prefix is no prefix: `s3_with_prefix("out", "") == s3("out")`.
    pub fn s3_with_prefix(name: impl Into<String>, key_prefix: impl Into<String>) -> Self {
        Sink::S3 {
            name: name.into(),
            key_prefix: Some(key_prefix.into()).filter(|p| !p.is_empty()),
        }
    }

    pub fn file(name: impl Into<String>) -> Self {
        Sink::File { name: name.into() }
    }

    pub fn blackhole(name: impl Into<String>) -> Self {
        Sink::Blackhole { name: name.into() }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Sink::Default => None,
            Sink::S3 { name, .. } | Sink::File { name } | Sink::Blackhole { name } => Some(name),
        }
    }
}

impl fmt::Display for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Default => f.write_str("default"),
            Sink::S3 {
                name,
                key_prefix: None,
            } => write!(f, "s3://{name}"),
            Sink::S3 {
                name,
                key_prefix: Some(prefix),
            } => write!(f, "s3://{name}/{prefix}"),
            Sink::File { name } => write!(f, "file://{name}"),
            Sink::Blackhole { name } => write!(f, "blackhole://{name}"),
        }
    }
}

fn non_empty_prefix<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.filter(|p| !p.is_empty()))
}

/// 🏷️ A sink as a handler names it. Typed, or a string that still has to prove itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    Typed(Sink),
    Uri(Cow<'static, str>),
}

impl SinkSpec {
    /// 🔍 Turn the spec into a concrete sink. Typed specs are borrowed as-is;
    /// URIs are parsed into an owned `Sink`.
    pub fn resolve(&self) -> Result<Cow<'_, Sink>, AdapterError> {
        match self {
            SinkSpec::Typed(sink) => Ok(Cow::Borrowed(sink)),
            SinkSpec::Uri(uri) => parse_sink_uri(uri).map(Cow::Owned),
        }
    }
}

impl From<Sink> for SinkSpec {
    fn from(sink: Sink) -> Self {
        SinkSpec::Typed(sink)
    }
}

impl From<&'static str> for SinkSpec {
    fn from(uri: &'static str) -> Self {
        SinkSpec::Uri(Cow::Borrowed(uri))
    }
}

impl From<String> for SinkSpec {
    fn from(uri: String) -> Self {
        SinkSpec::Uri(Cow::Owned(uri))
    }
}

fn unknown(uri: &str, reason: &'static str) -> AdapterError {
    AdapterError::UnknownSink {
        spec: uri.to_string(),
        reason,
    }
}

// 🧭 "default" | "<scheme>://<name>[/<prefix>]". Prefixes only mean something for s3.
fn parse_sink_uri(uri: &str) -> Result<Sink, AdapterError> {
    let trimmed = uri.trim();
    if trimmed.eq_ignore_ascii_case("default") {
        return Ok(Sink::Default);
    }

    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| unknown(uri, "expected 'default' or '<scheme>://<name>'"))?;

    match scheme.to_ascii_lowercase().as_str() {
        "s3" => {
            let (name, prefix) = match rest.split_once('/') {
                Some((name, prefix)) => (name, Some(prefix).filter(|p| !p.is_empty())),
                None => (rest, None),
            };
            if name.is_empty() {
                return Err(unknown(uri, "s3 sink needs a bucket name"));
            }
            Ok(Sink::S3 {
                name: name.to_string(),
                key_prefix: prefix.map(str::to_string),
            })
        }
        "file" if rest.is_empty() => Err(unknown(uri, "file sink needs a name")),
        "file" => Ok(Sink::file(rest)),
        "blackhole" if rest.is_empty() => Err(unknown(uri, "blackhole sink needs a name")),
        "blackhole" => Ok(Sink::blackhole(rest)),
        _ => Err(unknown(uri, "unrecognized sink scheme")),
    }
}
