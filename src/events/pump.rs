//! Push-style delivery for bus subscriptions.
//!
//! The fan-out is deliberately poll-based so publishers never block. Code
//! that wants a blocking receive, or an async stream of engine events
//! spanning every book, attaches a pump: a dedicated thread that drains one
//! subscription and forwards each event into a sink. Two channel flavors
//! are built in; arbitrary sinks (symbol demultiplexers, per-kind counters)
//! go through [`EventPump::spawn`] with a closure.
//!
//! Drop ordering matters only in one direction: when the receiving channel
//! is closed, the pump notices on its next forward and exits on its own.

use super::bus::Subscriber;
use super::event::EngineEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::debug;

const IDLE_POLL: Duration = Duration::from_micros(200);

/// A running bridge from one bus subscription to a sink.
pub struct EventPump {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EventPump {
    /// Drain `subscriber` on a dedicated thread, passing every event to
    /// `forward`. The pump exits when `forward` returns `false` (sink
    /// closed) or after [`EventPump::shutdown`] once the subscription is
    /// drained.
    pub fn spawn<F>(subscriber: Subscriber, mut forward: F) -> Self
    where
        F: FnMut(Arc<EngineEvent>) -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::Builder::new()
            .name("event-pump".to_string())
            .spawn(move || {
                debug!("event pump started");
                loop {
                    let mut forwarded = false;
                    while let Some(event) = subscriber.poll() {
                        forwarded = true;
                        if !forward(event) {
                            debug!("event pump sink closed");
                            return;
                        }
                    }
                    if flag.load(Ordering::Acquire) && subscriber.is_empty() {
                        break;
                    }
                    if !forwarded {
                        std::thread::park_timeout(IDLE_POLL);
                    }
                }
                debug!("event pump drained");
            })
            .expect("spawn event pump");
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Forward a subscription into a standard library mpsc channel, for
    /// consumers that want a blocking `recv` loop on their own thread.
    pub fn to_std_channel(
        subscriber: Subscriber,
    ) -> (Self, std::sync::mpsc::Receiver<Arc<EngineEvent>>) {
        let (sender, receiver) = std::sync::mpsc::channel();
        let pump = Self::spawn(subscriber, move |event| sender.send(event).is_ok());
        (pump, receiver)
    }

    /// Forward a subscription into a Tokio unbounded mpsc channel. Sending
    /// needs no runtime; only the receiving side is async.
    pub fn to_tokio_channel(
        subscriber: Subscriber,
    ) -> (Self, tokio::sync::mpsc::UnboundedReceiver<Arc<EngineEvent>>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let pump = Self::spawn(subscriber, move |event| sender.send(event).is_ok());
        (pump, receiver)
    }

    /// Drain whatever the subscription still holds, then stop the thread.
    pub fn shutdown(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
