//! 🔌 Guest boundary: what the host actually calls.
//!
//! 🎬 *[the host knocks. it has a batch. it would like payloads back, or one error string.]*
//! *[it does not want a stack trace. it does not want a panic. it wants a `Result`.]*
//!
//! A plugin crate names its handler once with [`export_handler!`](crate::export_handler).
//! The macro builds a thread-local [`Adapter`] on first use (config from `TANGENT_GUEST_*`
//! env vars, falling back to defaults) and exports:
//! - `metadata() -> PluginMeta`
//! - `process_logs(&[u8]) -> Result<Vec<SinkOutput>, String>`
//! - `process_stream(impl Read) -> Result<Vec<SinkOutput>, String>`
//!
//! Errors are flattened into one human-readable string at this line and nowhere else.
//! A call that arrives while another is still running on the same adapter (a handler
//! calling back into its own plugin, say) gets a re-entrancy error instead of a
//! double-borrowed pool.

use crate::adapter::Adapter;
use crate::app_config::{AdapterConfig, load_config};
use crate::error::AdapterError;
use crate::telemetry::init_tracing;
use std::cell::RefCell;
use tracing::{debug, info, warn};

/// 🏷️ Who this plugin is, for the host's registry and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginMeta {
    pub name: &'static str,
    pub version: &'static str,
}

/// 🚀 Build the module's adapter: load config, maybe turn on logging, wrap the handler.
/// Never fails. A broken config is logged and replaced with defaults.
pub fn boot<H>(meta: &PluginMeta, handler: H) -> Adapter<H> {
    boot_from(meta, handler, load_config(None))
}

// 🔔 Logging comes up first, so everything said below has somewhere to go.
// "ready" is only an info line when this module installed the subscriber itself.
pub(crate) fn boot_from<H>(
    meta: &PluginMeta,
    handler: H,
    loaded: anyhow::Result<AdapterConfig>,
) -> Adapter<H> {
    let (config, unreadable) = match loaded {
        Ok(config) => (config, None),
        Err(e) => (AdapterConfig::default(), Some(e)),
    };
    let logging = config.log_filter.as_deref().map(init_tracing);

    if let Some(e) = unreadable {
        warn!("⚠️ {} ignoring unreadable config, using defaults: {e:#}", meta.name);
    }
    match logging {
        Some(Ok(())) => info!("🚀 {} v{} ready", meta.name, meta.version),
        Some(Err(e)) => warn!("⚠️ {} logging not initialized: {e:#}", meta.name),
        None => debug!("🚀 {} v{} ready", meta.name, meta.version),
    }
    Adapter::new(handler, config)
}

/// 🔒 Run `call` against the module's adapter, flattening every failure to a `String`.
pub fn invoke<H, T>(
    cell: &RefCell<Adapter<H>>,
    call: impl FnOnce(&mut Adapter<H>) -> crate::error::Result<T>,
) -> Result<T, String> {
    let mut adapter = cell
        .try_borrow_mut()
        .map_err(|_| AdapterError::Reentrant.to_string())?;
    call(&mut adapter).map_err(|e| e.to_string())
}

/// 🔌 Export a handler to the host.
///
/// ```ignore
/// tangent_guest::export_handler! {
///     name: "syslog-to-ocsf",
///     version: env!("CARGO_PKG_VERSION"),
///     handler: SyslogToOcsf = SyslogToOcsf::default(),
/// }
/// ```
#[macro_export]
macro_rules! export_handler {
    (
        name: $name:expr,
        version: $version:expr,
        handler: $handler_ty:ty = $handler:expr $(,)?
    ) => {
        const __TANGENT_GUEST_META: $crate::PluginMeta = $crate::PluginMeta {
            name: $name,
            version: $version,
        };

        ::std::thread_local! {
            static __TANGENT_GUEST_ADAPTER: ::std::cell::RefCell<$crate::Adapter<$handler_ty>> =
                ::std::cell::RefCell::new($crate::guest::boot(&__TANGENT_GUEST_META, $handler));
        }

        pub fn metadata() -> $crate::PluginMeta {
            __TANGENT_GUEST_META
        }

        pub fn process_logs(
            input: &[u8],
        ) -> ::std::result::Result<::std::vec::Vec<$crate::SinkOutput>, ::std::string::String> {
            __TANGENT_GUEST_ADAPTER
                .with(|cell| $crate::guest::invoke(cell, |adapter| adapter.process_logs(input)))
        }

        pub fn process_stream<R: ::std::io::Read>(
            reader: R,
        ) -> ::std::result::Result<::std::vec::Vec<$crate::SinkOutput>, ::std::string::String> {
            __TANGENT_GUEST_ADAPTER
                .with(|cell| $crate::guest::invoke(cell, |adapter| adapter.process_stream(reader)))
        }
    };
}
