//! An event side-channel for observing a rewrite session without coupling
//! callers to any particular UI or logging backend.
//!
//! An [`Executor`] may hold a [`TraceSink`] trait object and push
//! [`TraceEvent`]s to it as rewriting proceeds. The default sink is a
//! no-op.
//!
//! [`Executor`]: crate::executor::Executor

use std::cell::RefCell;
use std::rc::Rc;

/// A structural event emitted while rewriting, for an external observer.
#[derive(Debug, Clone)]
pub enum TraceEvent {
    /// A new rewrite frame was entered for the named subject (its printable form).
    Push { subject: String },
    /// The current rewrite frame concluded.
    Pop,
    /// A fresh atom was constructed during rewriting (e.g. by the Apply smart
    /// constructor or sequence normalization).
    NodeCreated { printed: String },
    /// A rule fired, rewriting `from` into `to`.
    RewriteStep { rule: String, from: String, to: String },
}

/// Sink for [`TraceEvent`]s. Implementations should be cheap; this is called
/// on every rewrite step when tracing is enabled.
pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// A trace sink that discards every event. The default for a fresh
/// [`Executor`](crate::executor::Executor).
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

/// An in-memory sink that records every event, useful in tests and the
/// `elision-bench` CLI.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for RecordingSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Ergonomic, shareable handle to a trace sink: a thin wrapper around
/// `Rc<RefCell<dyn TraceSink>>`.
#[derive(Clone)]
pub struct SharedTrace(Rc<RefCell<dyn TraceSink>>);

impl SharedTrace {
    pub fn new<T: TraceSink + 'static>(sink: T) -> Self {
        Self(Rc::new(RefCell::new(sink)))
    }

    pub fn null() -> Self {
        Self::new(NullSink)
    }

    pub fn emit(&self, event: TraceEvent) {
        self.0.borrow_mut().emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_captures_events() {
        let mut sink = RecordingSink::default();
        sink.emit(TraceEvent::Push {
            subject: "f(x)".into(),
        });
        sink.emit(TraceEvent::Pop);
        assert_eq!(sink.events.len(), 2);
    }

    #[test]
    fn null_sink_discards_events() {
        let trace = SharedTrace::null();
        trace.emit(TraceEvent::Pop);
    }
}
