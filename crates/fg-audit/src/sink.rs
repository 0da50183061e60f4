// sink.rs: Destinations for invocation events.
//
// The registry records every invocation to each configured sink. Sink
// errors are logged by the caller and never fail the invocation.

use std::path::Path;
use std::sync::Mutex;

use crate::error::AuditError;
use crate::event::InvocationEvent;
use crate::log::AuditLog;

pub trait InvocationSink: Send + Sync {
    fn record(&self, event: InvocationEvent) -> Result<(), AuditError>;
}

/// Writes events to a hash-chained [`AuditLog`].
///
/// The log is behind a mutex so concurrent invocations append whole lines
/// in a single chain order.
pub struct AuditSink {
    log: Mutex<AuditLog>,
}

impl AuditSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            log: Mutex::new(AuditLog::open(path)?),
        })
    }
}

impl InvocationSink for AuditSink {
    fn record(&self, mut event: InvocationEvent) -> Result<(), AuditError> {
        // A panic mid-append leaves at most a partial line; keep appending.
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        log.append(&mut event)
    }
}

/// Keeps events in memory. Handy for tests and dry runs.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<InvocationEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InvocationEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl InvocationSink for MemorySink {
    fn record(&self, event: InvocationEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
        Ok(())
    }
}
