//! 🔧 Adapter Configuration: the sacred TOML-to-struct pipeline, guest edition.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! Inside the sandbox. Nothing." (every plugin author at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Everything here has a default. A guest module that was handed zero config still
//! decodes NDJSON, still pools its buffers, still answers the host. Config only
//! moves the knobs.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// 📦 The AdapterConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AdapterConfig {
    /// 📥 How the host frames the batch. Fixed for the life of the adapter.
    #[serde(default)]
    pub wire_format: WireFormat,
    /// 📤 How each output record is written into its bucket.
    #[serde(default)]
    pub output_encoding: OutputEncoding,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    /// 🔔 `EnvFilter` directives (e.g. `"tangent_guest=debug"`). `None` keeps logging off.
    #[serde(default)]
    pub log_filter: Option<String>,
}

/// 📥 Input framing.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// One JSON object per line.
    #[default]
    Ndjson,
    /// Back-to-back MessagePack maps, each framed by its own type/length header.
    #[serde(alias = "messagepack")]
    MsgPack,
}

/// 📤 Output encoding for bucket payloads.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputEncoding {
    /// Compact JSON + `\n` per record.
    #[default]
    Ndjson,
    /// One MessagePack value per record, no delimiter (the encoding frames itself).
    #[serde(alias = "messagepack")]
    MsgPack,
}

/// ♻️ Pool sizing. The shelves, not the warehouse.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PoolConfig {
    /// Idle entries kept per pool. Extra returns are dropped.
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
    /// Initial capacity of a freshly allocated bucket buffer.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Released buffers bigger than this are shrunk back down to it.
    #[serde(default = "default_max_retained_bytes")]
    pub max_retained_bytes: usize,
    /// Released maps and record rows bigger than this many slots are shrunk.
    #[serde(default = "default_max_retained_entries")]
    pub max_retained_entries: usize,
    /// Initial key capacity of a scratch record.
    #[serde(default = "default_record_capacity")]
    pub record_capacity: usize,
}

// 📦 64 idle entries per pool. A batch that fans out to more than 64 sinks
// at once pays for it in allocations, and frankly deserves to.
fn default_max_idle() -> usize {
    64
}

fn default_buffer_capacity() -> usize {
    4 * 1024
}

// 🚰 8MB: one bucket may get big once. It does not get to stay big forever.
fn default_max_retained_bytes() -> usize {
    8 * 1024 * 1024
}

fn default_max_retained_entries() -> usize {
    4096
}

// 🗺️ 64 keys covers a typical OCSF-ish record without a rehash
fn default_record_capacity() -> usize {
    64
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: default_max_idle(),
            buffer_capacity: default_buffer_capacity(),
            max_retained_bytes: default_max_retained_bytes(),
            max_retained_entries: default_max_retained_entries(),
            record_capacity: default_record_capacity(),
        }
    }
}

/// 🚿 Stream ingestion knobs.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StreamConfig {
    /// Bytes requested per `read` call.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    256 * 1024
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of defaults.
///
/// 🔧 Merges `TANGENT_GUEST_*` environment variables with an optional TOML file.
/// Nested keys use a double underscore: `TANGENT_GUEST_POOL__MAX_IDLE=16`.
///   - `config_file_name` is None → env vars only.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable. The message names the file, because
/// "error: error" helps nobody.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AdapterConfig> {
    info!(
        "🔧 Loading adapter configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("TANGENT_GUEST_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse adapter configuration from file '{}' and environment variables (TANGENT_GUEST_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse adapter configuration from environment variables (TANGENT_GUEST_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}
