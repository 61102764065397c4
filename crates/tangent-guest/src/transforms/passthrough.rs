//! 🚶 Passthrough: the "I changed nothing and took credit" of handlers.
//!
//! 🎬 COLD OPEN: INT. OFFICE - STANDUP MEETING - 9:03 AM
//!
//! "What did you do yesterday?"
//! "I passed logs through unchanged."
//! "Any blockers?"
//! "No. I am the blocker. I am become passthrough, destroyer of nothing."
//!
//! Every record goes back out as-is, to the default sink, or to a fixed sink if
//! you built it with one. Useful for smoke tests, benchmarks, and proving the
//! handler isn't the bottleneck (it isn't, Kevin, it's always the host).

use super::{BatchHandler, Handler, Output};
use crate::common::Record;
use crate::sinks::SinkSpec;
use anyhow::Result;

/// 🚶 Identity handler. Clones the record because the scratch one is about to be wiped.
#[derive(Debug, Clone, Default)]
pub struct Passthrough {
    sink: Option<SinkSpec>,
}

impl Passthrough {
    /// 🎯 Passthrough, but everything goes to `sink` instead of the default.
    pub fn to(sink: impl Into<SinkSpec>) -> Self {
        Self {
            sink: Some(sink.into()),
        }
    }
}

impl Handler for Passthrough {
    type Item = Record;

    fn process_log(&mut self, log: &Record) -> Result<Vec<Output<Record>>> {
        let output = Output::new(log.clone());
        Ok(vec![match &self.sink {
            Some(sink) => output.to(sink.clone()),
            None => output,
        }])
    }
}

impl BatchHandler for Passthrough {
    type Item = Record;

    fn process_logs(&mut self, logs: &[Record]) -> Result<Vec<Record>> {
        Ok(logs.to_vec())
    }
}
