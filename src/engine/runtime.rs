//! The dispatcher and matching worker threads.
//!
//! One dispatcher demultiplexes the shared MPSC ingress ring into per-symbol
//! SPSC rings, preserving FIFO order per (producer, symbol). Each symbol is
//! pinned to exactly one worker by symbol hash, keeping every book
//! single-writer. Idle threads back off spin, then yield, then park for a
//! low-microsecond poll; a worker never parks while one of its books has
//! pending intents.

use super::engine::{EngineCommand, MatchingEngine};
use super::lifecycle::EngineState;
use crate::orderbook::OrderBook;
use crate::ring::SpscRing;
use crossbeam::utils::Backoff;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace};

const PARK_POLL: Duration = Duration::from_micros(50);

pub(super) struct Runtime {
    dispatcher: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl Runtime {
    pub(super) fn start(engine: &Arc<MatchingEngine>) -> Runtime {
        let dispatcher_done = Arc::new(AtomicBool::new(false));

        let dispatcher = {
            let engine = Arc::clone(engine);
            let done = Arc::clone(&dispatcher_done);
            std::thread::Builder::new()
                .name("match-dispatch".to_string())
                .spawn(move || run_dispatcher(&engine, &done))
                .expect("spawn dispatcher")
        };

        let worker_count = engine.config.effective_workers();
        let workers = (0..worker_count)
            .map(|index| {
                let engine = Arc::clone(engine);
                let done = Arc::clone(&dispatcher_done);
                std::thread::Builder::new()
                    .name(format!("match-worker-{index}"))
                    .spawn(move || run_worker(&engine, index, worker_count, &done))
                    .expect("spawn worker")
            })
            .collect();

        Runtime {
            dispatcher,
            workers,
        }
    }

    pub(super) fn join(self) {
        let _ = self.dispatcher.join();
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn draining(engine: &MatchingEngine) -> bool {
    matches!(
        engine.lifecycle.state(),
        EngineState::Draining | EngineState::Stopped
    )
}

fn run_dispatcher(engine: &Arc<MatchingEngine>, done: &AtomicBool) {
    debug!("dispatcher started");
    let backoff = Backoff::new();
    loop {
        match engine.ingress.pop() {
            Some(command) => {
                backoff.reset();
                route(engine, command);
            }
            None => {
                if draining(engine) {
                    // An admission that raced the drain flip may still land
                    // its push; one grace pass catches it.
                    std::thread::sleep(Duration::from_millis(1));
                    match engine.ingress.pop() {
                        Some(command) => route(engine, command),
                        None => break,
                    }
                } else if backoff.is_completed() {
                    std::thread::park_timeout(PARK_POLL);
                } else {
                    backoff.snooze();
                }
            }
        }
    }
    done.store(true, Ordering::Release);
    debug!("dispatcher drained");
}

fn route(engine: &MatchingEngine, command: EngineCommand) {
    let Some(ring) = engine
        .symbol_rings
        .get(command.symbol())
        .map(|entry| entry.value().clone())
    else {
        // Admission verified the symbol; a miss here means the symbol was
        // removed mid-flight. Nothing to do but drop.
        trace!("dropping command for unregistered symbol {}", command.symbol());
        return;
    };
    let mut pending = command;
    loop {
        match ring.push(pending) {
            Ok(()) => return,
            Err(returned) => {
                pending = returned;
                std::thread::yield_now();
            }
        }
    }
}

struct OwnedSymbol {
    ring: Arc<SpscRing<EngineCommand>>,
    book: Arc<OrderBook>,
}

fn owned_symbols(engine: &MatchingEngine, index: usize, total: usize) -> Vec<OwnedSymbol> {
    engine
        .symbol_rings
        .iter()
        .filter(|entry| {
            let mut hasher = DefaultHasher::new();
            entry.key().hash(&mut hasher);
            hasher.finish() as usize % total == index
        })
        .filter_map(|entry| {
            engine.books.get(entry.key()).map(|book| OwnedSymbol {
                ring: entry.value().clone(),
                book: book.value().clone(),
            })
        })
        .collect()
}

fn run_worker(
    engine: &Arc<MatchingEngine>,
    index: usize,
    total: usize,
    dispatcher_done: &AtomicBool,
) {
    debug!("worker {} started", index);
    let mut owned = owned_symbols(engine, index, total);
    let mut seen_version = engine.rings_version.load(Ordering::Acquire);
    let expiry_interval_ns = engine.config.expiry_scan_interval_ms.saturating_mul(1_000_000);
    let mut last_expiry_ns = crate::utils::monotonic_nanos();
    let backoff = Backoff::new();

    loop {
        let version = engine.rings_version.load(Ordering::Acquire);
        if version != seen_version {
            owned = owned_symbols(engine, index, total);
            seen_version = version;
        }

        let mut did_work = false;
        for symbol in &owned {
            while let Some(command) = symbol.ring.pop() {
                did_work = true;
                process(engine, &symbol.book, command);
            }
        }

        // Housekeeping: expiry scan at the configured cadence.
        let now_ns = crate::utils::monotonic_nanos();
        if expiry_interval_ns > 0 && now_ns.saturating_sub(last_expiry_ns) >= expiry_interval_ns {
            for symbol in &owned {
                symbol.book.scan_expired(now_ns);
            }
            last_expiry_ns = now_ns;
        }

        if did_work {
            backoff.reset();
            continue;
        }
        if draining(engine)
            && dispatcher_done.load(Ordering::Acquire)
            && owned.iter().all(|symbol| symbol.ring.is_empty())
        {
            break;
        }
        if backoff.is_completed() {
            std::thread::park_timeout(PARK_POLL);
        } else {
            backoff.snooze();
        }
    }
    debug!("worker {} stopped", index);
}

fn process(engine: &MatchingEngine, book: &OrderBook, command: EngineCommand) {
    match command {
        EngineCommand::Submit(intent) => match book.submit(&intent) {
            Ok(outcome) => {
                engine.apply_fills(&outcome);
                trace!(
                    "intent {} reached {:?} ({} filled)",
                    intent.intent_id, outcome.state, outcome.executed_quantity
                );
            }
            Err(error) => {
                trace!("intent {} refused: {}", intent.intent_id, error);
                engine.report_book_error(&intent.symbol, &error);
            }
        },
        EngineCommand::Cancel {
            symbol, order_id, ..
        } => {
            if let Err(error) = book.cancel_order(order_id) {
                trace!("cancel {} on {} refused: {}", order_id, symbol, error);
                engine.report_book_error(&symbol, &error);
            }
        }
        EngineCommand::Modify {
            symbol,
            order_id,
            new_quantity,
            new_price,
        } => match book.modify_order(order_id, new_quantity, new_price) {
            Ok(crate::orderbook::ModifyOutcome::Replaced { outcome, .. }) => {
                engine.apply_fills(&outcome);
            }
            Ok(_) => {}
            Err(error) => {
                trace!("modify {} on {} refused: {}", order_id, symbol, error);
                engine.report_book_error(&symbol, &error);
            }
        },
    }
}
