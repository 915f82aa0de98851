//! The engine facade: admission, books, queues and event wiring.

use super::error::EngineError;
use super::lifecycle::{EngineState, Lifecycle};
use super::runtime::Runtime;
use crate::core::{EngineConfig, IntentId, OrderId, OrderIntent, OrderKind};
use crate::events::{EngineEvent, EventBus};
use crate::orderbook::{
    BookSnapshot, MatchOutcome, ModifyOutcome, OrderBook, OrderBookError,
};
use crate::ring::{MpscRing, SpscRing};
use crate::risk::{
    ActionTaken, BookView, BreakerConfig, RiskGate, RiskLimits, RiskRejection, Severity,
    Violation, ViolationKind,
};
use crate::utils::{current_time_millis, monotonic_nanos};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, trace, warn};

/// A command travelling through the ingress queues to a matching worker.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Run an admitted intent through matching.
    Submit(OrderIntent),
    /// Cancel a resting order or parked stop.
    Cancel {
        /// The order's symbol.
        symbol: String,
        /// The order to cancel.
        order_id: OrderId,
    },
    /// Modify a resting order.
    Modify {
        /// The order's symbol.
        symbol: String,
        /// The order to modify.
        order_id: OrderId,
        /// New total quantity, if changing.
        new_quantity: Option<u64>,
        /// New price, if changing.
        new_price: Option<u64>,
    },
}

impl EngineCommand {
    /// The symbol this command routes on.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            EngineCommand::Submit(intent) => &intent.symbol,
            EngineCommand::Cancel { symbol, .. } | EngineCommand::Modify { symbol, .. } => symbol,
        }
    }
}

/// The handle returned for an admitted intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Engine-assigned intent id.
    pub intent_id: IntentId,
    /// Admission sequence across the whole engine.
    pub sequence: u64,
}

#[derive(Debug, Clone)]
pub(super) enum IdempotentOutcome {
    Accepted(IntentId),
    Rejected(RiskRejection),
}

/// The matching engine: per-symbol single-writer books behind lock-free
/// ingress queues, a synchronous risk gate in the admission path, and a
/// typed event fan-out.
///
/// Two ingress styles are supported. [`MatchingEngine::enqueue_intent`] is
/// the production path: admission runs on the caller thread, matching on
/// the symbol's worker. [`MatchingEngine::submit_intent`] runs matching
/// inline and is for embedders that drive one symbol from one thread; do
/// not mix it with started workers on the same symbol.
pub struct MatchingEngine {
    pub(super) config: EngineConfig,
    pub(super) books: DashMap<String, Arc<OrderBook>>,
    pub(super) symbol_rings: DashMap<String, Arc<SpscRing<EngineCommand>>>,
    pub(super) rings_version: AtomicU64,
    pub(super) ingress: Arc<MpscRing<EngineCommand>>,
    pub(super) gate: Arc<RiskGate>,
    pub(super) bus: Arc<EventBus>,
    pub(super) lifecycle: Arc<Lifecycle>,
    next_intent_id: AtomicU64,
    admission_seq: AtomicU64,
    idempotency: DashMap<String, IdempotentOutcome>,
    runtime: Mutex<Option<Runtime>>,
}

impl MatchingEngine {
    /// Create an engine from configuration.
    ///
    /// # Errors
    /// [`EngineError::Ring`] when `ring_capacity` is not a power of two.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let bus = Arc::new(EventBus::new());
        let violation_bus = Arc::clone(&bus);
        let gate = Arc::new(
            RiskGate::new(
                config.limits.clone(),
                BreakerConfig {
                    enabled: config.enable_circuit_breakers,
                    price_change_threshold_bps: config.price_change_threshold_bps,
                    volume_threshold: config.volume_threshold,
                    volatility_threshold_bps: config.volatility_threshold_bps,
                    cooldown_ms: config.circuit_cooldown_ms,
                },
                config.auto_stop_on_violation,
            )
            .with_violation_listener(Arc::new(move |violation| {
                violation_bus.publish(EngineEvent::Violation(violation.clone()));
            })),
        );
        let ingress = Arc::new(MpscRing::with_capacity(config.ring_capacity)?);

        Ok(Self {
            config,
            books: DashMap::new(),
            symbol_rings: DashMap::new(),
            rings_version: AtomicU64::new(0),
            ingress,
            gate,
            bus,
            lifecycle: Arc::new(Lifecycle::new()),
            next_intent_id: AtomicU64::new(0),
            admission_seq: AtomicU64::new(0),
            idempotency: DashMap::new(),
            runtime: Mutex::new(None),
        })
    }

    /// Register a symbol: creates its book, wires the book's listeners into
    /// the fan-out and allocates its worker queue. Idempotent.
    ///
    /// # Errors
    /// [`EngineError::Ring`] when the configured ring capacity is invalid.
    pub fn add_symbol(&self, symbol: &str) -> Result<(), EngineError> {
        if self.books.contains_key(symbol) {
            return Ok(());
        }

        let delta_bus = Arc::clone(&self.bus);
        let trade_bus = Arc::clone(&self.bus);
        let book = OrderBook::with_config(
            symbol,
            self.config.tick_size,
            self.config.lot_size,
            self.config.self_trade_policy,
        )
        .with_delta_listener(Arc::new(move |delta| {
            delta_bus.publish(EngineEvent::BookDelta(delta.clone()));
        }))
        .with_trade_listener(Arc::new(move |trade| {
            trade_bus.publish(EngineEvent::Trade(trade.clone()));
        }));

        let ring = Arc::new(SpscRing::with_capacity(self.config.ring_capacity)?);
        self.books.insert(symbol.to_string(), Arc::new(book));
        self.symbol_rings.insert(symbol.to_string(), ring);
        self.rings_version.fetch_add(1, Ordering::Release);
        info!("registered symbol {}", symbol);
        Ok(())
    }

    /// The book for a symbol.
    #[must_use]
    pub fn book(&self, symbol: &str) -> Option<Arc<OrderBook>> {
        self.books.get(symbol).map(|entry| entry.value().clone())
    }

    /// The event fan-out.
    #[must_use]
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// The risk gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<RiskGate> {
        &self.gate
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.lifecycle.state()
    }

    /// Admit an intent and run matching inline on the caller's thread.
    ///
    /// # Errors
    /// Risk refusals, halts, matcher refusals, or `ShuttingDown`. An
    /// invariant violation is never surfaced here; the caller sees the
    /// frozen-book refusal while the violation itself goes out as a fatal
    /// event.
    pub fn submit_intent(&self, mut intent: OrderIntent) -> Result<MatchOutcome, EngineError> {
        self.admit(&mut intent)?;
        let book = self
            .books
            .get(&intent.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(intent.symbol.clone()))?
            .clone();
        match book.submit(&intent) {
            Ok(outcome) => {
                self.apply_fills(&outcome);
                Ok(outcome)
            }
            Err(error) => Err(self.shield_fatal(&intent.symbol, error)),
        }
    }

    /// Admit an intent and queue it for its symbol's matching worker.
    ///
    /// # Errors
    /// Risk refusals, `BackPressure` on a full ingress ring, halts, or
    /// `ShuttingDown`.
    pub fn enqueue_intent(&self, mut intent: OrderIntent) -> Result<Admission, EngineError> {
        let admission = self.admit(&mut intent)?;
        let client_order_id = intent.client_order_id.clone();
        if self.ingress.push(EngineCommand::Submit(intent)).is_err() {
            // Undo the idempotency record so the client may retry.
            if !client_order_id.is_empty() {
                self.idempotency.remove(&client_order_id);
            }
            self.publish_matcher_violation_kind(
                ViolationKind::BackPressure,
                None,
                self.ingress.len() as f64,
                self.ingress.capacity() as f64,
            );
            return Err(EngineError::BackPressure);
        }
        Ok(admission)
    }

    /// Cancel a resting order inline.
    ///
    /// # Errors
    /// `UnknownSymbol`, `OrderNotFound`, or a frozen book.
    pub fn cancel_order(&self, symbol: &str, order_id: OrderId) -> Result<u64, EngineError> {
        let book = self
            .books
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))?
            .clone();
        book.cancel_order(order_id)
            .map_err(|error| self.shield_fatal(symbol, error))
    }

    /// Queue a cancel for the symbol's matching worker.
    ///
    /// # Errors
    /// `ShuttingDown`, `UnknownSymbol` or `BackPressure`.
    pub fn enqueue_cancel(&self, symbol: &str, order_id: OrderId) -> Result<(), EngineError> {
        if !self.lifecycle.is_accepting() {
            return Err(EngineError::ShuttingDown);
        }
        if !self.books.contains_key(symbol) {
            return Err(EngineError::UnknownSymbol(symbol.to_string()));
        }
        self.ingress
            .push(EngineCommand::Cancel {
                symbol: symbol.to_string(),
                order_id,
            })
            .map_err(|_| EngineError::BackPressure)
    }

    /// Modify a resting order inline.
    ///
    /// # Errors
    /// See [`OrderBook::modify_order`].
    pub fn modify_order(
        &self,
        symbol: &str,
        order_id: OrderId,
        new_quantity: Option<u64>,
        new_price: Option<u64>,
    ) -> Result<ModifyOutcome, EngineError> {
        let book = self
            .books
            .get(symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))?
            .clone();
        let outcome = book
            .modify_order(order_id, new_quantity, new_price)
            .map_err(|error| self.shield_fatal(symbol, error))?;
        if let ModifyOutcome::Replaced { outcome, .. } = &outcome {
            self.apply_fills(outcome);
        }
        Ok(outcome)
    }

    /// Take a depth snapshot of one symbol.
    ///
    /// # Errors
    /// `UnknownSymbol`.
    pub fn snapshot(&self, symbol: &str, depth: usize) -> Result<BookSnapshot, EngineError> {
        self.books
            .get(symbol)
            .map(|book| book.snapshot(depth))
            .ok_or_else(|| EngineError::UnknownSymbol(symbol.to_string()))
    }

    /// Atomically swap the limits table and publish a limit-update event.
    pub fn update_limits(&self, limits: RiskLimits) {
        self.gate.update_limits(limits.clone());
        self.bus.publish(EngineEvent::LimitUpdate {
            limits,
            timestamp_ms: current_time_millis(),
        });
    }

    /// Engage or release the emergency stop and publish the event.
    pub fn set_emergency_stop(&self, engaged: bool) {
        self.gate.set_emergency_stop(engaged);
        self.bus.publish(EngineEvent::EmergencyStop {
            engaged,
            timestamp_ms: current_time_millis(),
        });
    }

    /// Apply a realized P&L delta from post-trade; drawdown breaches may
    /// engage the emergency stop when configured.
    pub fn on_pnl_update(&self, realized_delta: f64) {
        let stopped_before = self.gate.is_emergency_stopped();
        self.gate.on_pnl_update(realized_delta);
        if !stopped_before && self.gate.is_emergency_stopped() {
            self.bus.publish(EngineEvent::EmergencyStop {
                engaged: true,
                timestamp_ms: current_time_millis(),
            });
        }
    }

    /// Publish a risk metrics snapshot to subscribers.
    pub fn publish_risk_metrics(&self) {
        let positions = self.gate.positions();
        self.bus.publish(EngineEvent::RiskMetricsUpdate {
            gross_exposure: positions.gross_exposure(),
            daily_realized_pnl: positions.daily_realized_pnl(),
            timestamp_ms: current_time_millis(),
        });
    }

    /// Start the dispatcher and the matching workers.
    ///
    /// Takes the shared handle because the spawned threads hold their own
    /// references to the engine.
    pub fn start(engine: &Arc<Self>) {
        let mut runtime = engine.runtime.lock();
        if runtime.is_some() {
            return;
        }
        engine.lifecycle.advance(EngineState::Running);
        *runtime = Some(Runtime::start(engine));
        info!(
            "engine running with {} workers",
            engine.config.effective_workers()
        );
    }

    /// Cooperative shutdown: stop admitting, finish every queued intent,
    /// then stop the workers. Ingress after this returns `ShuttingDown`.
    pub fn shutdown(&self) {
        self.lifecycle.advance(EngineState::Draining);
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.join();
        }
        self.lifecycle.advance(EngineState::Stopped);
        info!("engine stopped");
    }

    // ------------------------------------------------------------------
    // Internals shared with the runtime.
    // ------------------------------------------------------------------

    fn admit(&self, intent: &mut OrderIntent) -> Result<Admission, EngineError> {
        if !self.lifecycle.is_accepting() {
            return Err(EngineError::ShuttingDown);
        }
        let book = self
            .books
            .get(&intent.symbol)
            .ok_or_else(|| EngineError::UnknownSymbol(intent.symbol.clone()))?
            .clone();
        if book.is_frozen() {
            return Err(OrderBookError::Frozen {
                symbol: intent.symbol.clone(),
            }
            .into());
        }

        // Idempotent replay: a rejected client order id replays its
        // rejection, an accepted one is a duplicate.
        if !intent.client_order_id.is_empty()
            && let Some(existing) = self.idempotency.get(&intent.client_order_id)
        {
            return Err(match existing.value() {
                IdempotentOutcome::Accepted(original) => {
                    trace!(
                        "client order id {} already accepted as {}",
                        intent.client_order_id, original
                    );
                    EngineError::DuplicateIntent(intent.client_order_id.clone())
                }
                IdempotentOutcome::Rejected(rejection) => EngineError::Risk(rejection.clone()),
            });
        }

        let view = Self::book_view(&book, intent);
        if let Err(rejection) = self.gate.check(intent, view) {
            if !intent.client_order_id.is_empty() {
                self.idempotency.insert(
                    intent.client_order_id.clone(),
                    IdempotentOutcome::Rejected(rejection.clone()),
                );
            }
            return Err(rejection.into());
        }

        let intent_id = IntentId(self.next_intent_id.fetch_add(1, Ordering::Relaxed) + 1);
        intent.intent_id = intent_id;
        intent.arrival_ns = monotonic_nanos();
        if !intent.client_order_id.is_empty() {
            self.idempotency.insert(
                intent.client_order_id.clone(),
                IdempotentOutcome::Accepted(intent_id),
            );
        }
        let sequence = self.admission_seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Admission { intent_id, sequence })
    }

    fn book_view(book: &OrderBook, intent: &OrderIntent) -> BookView {
        let opposite = book.best_quote(intent.side.opposite());
        let crossing = match intent.kind {
            OrderKind::Market | OrderKind::IocPeg => opposite.is_some(),
            OrderKind::Limit => opposite
                .map(|quote| intent.side.crosses(intent.limit_price, quote.price))
                .unwrap_or(false),
            OrderKind::Stop | OrderKind::StopLimit => false,
        };
        BookView {
            mark_price: book
                .last_trade()
                .map(|(price, _)| price)
                .or_else(|| book.mid_price().map(|mid| mid as u64)),
            opposite_visible: opposite.map(|quote| quote.quantity).unwrap_or(0),
            crossing,
        }
    }

    /// Feed the gate every fill an outcome produced.
    pub(super) fn apply_fills(&self, outcome: &MatchOutcome) {
        for trade in &outcome.trades {
            self.gate
                .on_fill(&trade.symbol, trade.aggressor_side, trade.quantity, trade.price);
        }
    }

    /// Publish the event for a book-level failure and decide what ingress
    /// sees. An invariant violation goes out as a fatal event only; the
    /// caller gets the frozen-book refusal in its place. Everything else
    /// passes through unchanged.
    pub(super) fn shield_fatal(&self, symbol: &str, error: OrderBookError) -> EngineError {
        self.report_book_error(symbol, &error);
        match error {
            OrderBookError::InvariantViolation { .. } => OrderBookError::Frozen {
                symbol: symbol.to_string(),
            }
            .into(),
            other => other.into(),
        }
    }

    /// Publish the event for a book-level failure: invariant violations go
    /// out as fatal events, recoverable refusals as violation records.
    pub(super) fn report_book_error(&self, symbol: &str, error: &OrderBookError) {
        match error {
            OrderBookError::InvariantViolation { detail } => {
                warn!("fatal on {}: {}", symbol, detail);
                self.bus.publish(EngineEvent::Fatal {
                    symbol: symbol.to_string(),
                    detail: error.to_string(),
                    timestamp_ms: current_time_millis(),
                });
            }
            OrderBookError::Frozen { .. } => {
                warn!("{} refused an operation: book is frozen", symbol);
            }
            OrderBookError::FokUnfillable {
                requested,
                available,
            } => self.publish_matcher_violation_kind(
                ViolationKind::FokUnfillable,
                Some(symbol),
                *requested as f64,
                *available as f64,
            ),
            OrderBookError::SelfTradeBlocked { .. } => self.publish_matcher_violation_kind(
                ViolationKind::SelfTradeBlocked,
                Some(symbol),
                1.0,
                0.0,
            ),
            OrderBookError::InvalidTick { price, tick_size } => self
                .publish_matcher_violation_kind(
                    ViolationKind::InvalidIntent,
                    Some(symbol),
                    *price as f64,
                    *tick_size as f64,
                ),
            OrderBookError::InvalidLot { quantity, lot_size } => self
                .publish_matcher_violation_kind(
                    ViolationKind::InvalidIntent,
                    Some(symbol),
                    *quantity as f64,
                    *lot_size as f64,
                ),
            _ => {}
        }
    }

    fn publish_matcher_violation_kind(
        &self,
        kind: ViolationKind,
        symbol: Option<&str>,
        observed: f64,
        limit: f64,
    ) {
        self.bus.publish(EngineEvent::Violation(Violation {
            kind,
            severity: Severity::Warning,
            symbol: symbol.map(str::to_string),
            observed,
            limit,
            action: ActionTaken::Rejected,
            timestamp_ms: current_time_millis(),
        }));
    }
}
