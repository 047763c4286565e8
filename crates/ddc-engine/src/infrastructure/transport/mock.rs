//! Scripted transport for tests.
//!
//! Plays the display's side of the conversation from a queue of canned
//! results, records every request, and counts overlapping calls so tests can
//! prove that the engine never re-enters a transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{BusHandle, I2cRequest, Transport, TransportError};

/// A request as seen by the transport, with the instant it arrived.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: I2cRequest,
    pub at: Instant,
}

struct Inner {
    bus: BusHandle,
    script: Mutex<VecDeque<Result<Vec<u8>, TransportError>>>,
    fallback: Mutex<Option<Result<Vec<u8>, TransportError>>>,
    recorded: Mutex<Vec<RecordedRequest>>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    hold: Mutex<Duration>,
}

/// A [`Transport`] that replays queued replies.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// engine owns another.
///
/// When the queue is empty a write succeeds with an empty reply and a read
/// returns the fallback (see [`ScriptedTransport::respond_always`]), or
/// [`TransportError::NoAcknowledge`] when no fallback is set.
#[derive(Clone)]
pub struct ScriptedTransport {
    inner: Arc<Inner>,
}

impl ScriptedTransport {
    pub fn new(bus: BusHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                script: Mutex::new(VecDeque::new()),
                fallback: Mutex::new(None),
                recorded: Mutex::new(Vec::new()),
                in_flight: AtomicBool::new(false),
                overlaps: AtomicUsize::new(0),
                hold: Mutex::new(Duration::ZERO),
            }),
        }
    }

    /// Queues a successful reply.
    pub fn push_reply(&self, bytes: Vec<u8>) {
        self.push(Ok(bytes));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.push(Err(error));
    }

    pub fn push(&self, result: Result<Vec<u8>, TransportError>) {
        self.inner
            .script
            .lock()
            .expect("lock poisoned")
            .push_back(result);
    }

    /// Answers every request with `result` once the queue is drained.
    pub fn respond_always(&self, result: Result<Vec<u8>, TransportError>) {
        *self.inner.fallback.lock().expect("lock poisoned") = Some(result);
    }

    /// Makes every call stay inside the transport for `hold`, widening the
    /// window in which an overlapping call would be caught.
    pub fn hold_each_call(&self, hold: Duration) {
        *self.inner.hold.lock().expect("lock poisoned") = hold;
    }

    /// Every request received so far, in arrival order.
    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.inner.recorded.lock().expect("lock poisoned").clone()
    }

    pub fn requests(&self) -> Vec<I2cRequest> {
        self.recorded().into_iter().map(|r| r.request).collect()
    }

    pub fn call_count(&self) -> usize {
        self.inner.recorded.lock().expect("lock poisoned").len()
    }

    /// Number of calls that started while another call was still running.
    pub fn overlap_count(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    fn next_result(&self, request: &I2cRequest) -> Result<Vec<u8>, TransportError> {
        if let Some(result) = self.inner.script.lock().expect("lock poisoned").pop_front() {
            return result;
        }
        if request.reply.is_none() {
            return Ok(Vec::new());
        }
        self.inner
            .fallback
            .lock()
            .expect("lock poisoned")
            .clone()
            .unwrap_or(Err(TransportError::NoAcknowledge(request.send_address)))
    }
}

impl Transport for ScriptedTransport {
    fn bus_handle(&self) -> BusHandle {
        self.inner.bus
    }

    fn send(&self, request: &I2cRequest) -> Result<Vec<u8>, TransportError> {
        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        self.inner
            .recorded
            .lock()
            .expect("lock poisoned")
            .push(RecordedRequest {
                request: request.clone(),
                at: Instant::now(),
            });

        let hold = *self.inner.hold.lock().expect("lock poisoned");
        if !hold.is_zero() {
            std::thread::sleep(hold);
        }

        let result = self.next_result(request);
        self.inner.in_flight.store(false, Ordering::SeqCst);
        result
    }
}
