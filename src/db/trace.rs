//! Per-transaction diagnostic context.
//!
//! Every [`TransContext`](crate::db::TransContext) carries a trace id and the
//! numeric id of the thread that created it. Both are attached as fields to
//! every log event the transaction emits.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Span, info_span};

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Numeric id of the current OS thread, unique for the life of the process.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Generate a random trace id for callers that have none.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    trace_id: String,
    thread_id: u64,
}

impl TraceContext {
    /// Build a context owned by the calling thread.
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            thread_id: current_thread_id(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Id of the thread that created the transaction.
    pub fn thread_id(&self) -> u64 {
        self.thread_id
    }

    /// A span carrying the trace fields, for instrumenting caller futures.
    pub fn span(&self) -> Span {
        info_span!("trans", trace_id = %self.trace_id, thread_id = self.thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_is_stable_within_thread() {
        assert_eq!(current_thread_id(), current_thread_id());
    }

    #[test]
    fn test_thread_ids_differ_across_threads() {
        let here = current_thread_id();
        let there = std::thread::spawn(current_thread_id).join().unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn test_trace_context_captures_caller() {
        let ctx = TraceContext::new("req-42");
        assert_eq!(ctx.trace_id(), "req-42");
        assert_eq!(ctx.thread_id(), current_thread_id());
    }

    #[test]
    fn test_new_trace_id_format() {
        let id = new_trace_id();
        assert_eq!(id.len(), 32);
        assert_ne!(id, new_trace_id());
    }
}
