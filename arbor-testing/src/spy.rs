// Call recording for handlers and hooks

use arbor_core::{Endpoint, Leaf, Reply, Signature, leaf_fn};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared call recorder.
///
/// Clones share one log, so a clone can be moved into a handler while the
/// test keeps the original.
#[derive(Clone, Default)]
pub struct Spy {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Spy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: &str) {
        self.calls.lock().push(call.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn was_called(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    pub fn never_called(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Recorded calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    /// Page without arguments that records `name` and answers `body`.
    pub fn page(&self, name: &'static str, body: &'static str) -> Leaf {
        let spy = self.clone();
        Endpoint::page(
            Signature::empty(),
            leaf_fn(move |_, _| {
                spy.record(name);
                Box::pin(async move { Ok(Reply::from(body)) })
            }),
        )
    }
}
