//! Laws from the matching contract: cancel idempotency, FOK atomicity,
//! IOC never resting, and snapshot-plus-delta reconstruction.

use matchcore_rs::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

fn recording_book() -> (OrderBook, Arc<Mutex<Vec<BookDelta>>>) {
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deltas);
    let book = OrderBook::new("LAW").with_delta_listener(Arc::new(move |delta: &BookDelta| {
        sink.lock().unwrap().push(delta.clone());
    }));
    (book, deltas)
}

#[test]
fn law_cancel_idempotent() {
    let (book, _) = recording_book();
    let order_id = book
        .add_limit_order(IntentId(1), Side::Buy, 99, 5, TimeInForce::Gtc)
        .unwrap()
        .order_id
        .unwrap();

    assert_eq!(book.cancel_order(order_id).unwrap(), 5);
    let seq_after_first = book.sequence();

    for _ in 0..3 {
        assert_eq!(
            book.cancel_order(order_id).unwrap_err(),
            OrderBookError::OrderNotFound(order_id)
        );
        assert_eq!(book.sequence(), seq_after_first);
        assert_eq!(book.order_count(), 0);
    }
}

#[test]
fn law_fok_all_or_nothing() {
    // Failure side: zero deltas (scenario_fok_unfillable). Success side:
    // every delta for the intent is a trade and they sum to its quantity.
    let (book, deltas) = recording_book();
    book.add_limit_order(IntentId(1), Side::Sell, 100, 3, TimeInForce::Gtc)
        .unwrap();
    book.add_limit_order(IntentId(2), Side::Sell, 101, 4, TimeInForce::Gtc)
        .unwrap();
    let before = deltas.lock().unwrap().len();

    let outcome = book
        .add_limit_order(IntentId(3), Side::Buy, 101, 7, TimeInForce::Fok)
        .unwrap();
    assert_eq!(outcome.state, IntentState::Filled);

    let deltas = deltas.lock().unwrap();
    let for_intent = &deltas[before..];
    assert!(for_intent.iter().all(|d| d.kind == DeltaKind::Trade));
    let total: u64 = for_intent.iter().map(|d| d.quantity).sum();
    assert_eq!(total, 7);
}

#[test]
fn law_ioc_never_adds() {
    let (book, deltas) = recording_book();
    book.add_limit_order(IntentId(1), Side::Sell, 100, 2, TimeInForce::Gtc)
        .unwrap();
    let before = deltas.lock().unwrap().len();

    // Partially fillable and completely unfillable IOC intents.
    book.add_limit_order(IntentId(2), Side::Buy, 100, 9, TimeInForce::Ioc)
        .unwrap();
    book.add_limit_order(IntentId(3), Side::Buy, 90, 5, TimeInForce::Ioc)
        .unwrap();

    let deltas = deltas.lock().unwrap();
    assert!(deltas[before..].iter().all(|d| d.kind != DeltaKind::Add));
}

/// Replays deltas with `seq > S` on top of the snapshot at `S` and compares
/// the result against a fresh snapshot.
#[derive(Default)]
struct ReplayState {
    // order id -> (side, price, remaining)
    orders: HashMap<OrderId, (Side, u64, u64)>,
}

impl ReplayState {
    fn seed(snapshot: &BookSnapshot, deltas: &[BookDelta]) -> Self {
        // Rebuild per-order state for orders alive at the snapshot from the
        // delta history up to the snapshot's seq.
        let mut state = ReplayState::default();
        for delta in deltas.iter().filter(|d| d.seq <= snapshot.seq) {
            state.apply(delta);
        }
        state
    }

    fn apply(&mut self, delta: &BookDelta) {
        match delta.kind {
            DeltaKind::Add => {
                let order_id = delta.order_id.expect("add carries an order id");
                self.orders
                    .insert(order_id, (delta.side.unwrap(), delta.price, delta.quantity));
            }
            DeltaKind::Trade => {
                let order_id = delta.order_id.expect("trade carries the passive order id");
                if let Some((_, _, remaining)) = self.orders.get_mut(&order_id) {
                    *remaining = remaining.saturating_sub(delta.quantity);
                    if *remaining == 0 {
                        self.orders.remove(&order_id);
                    }
                }
            }
            DeltaKind::Modify => {
                let order_id = delta.order_id.expect("modify carries an order id");
                if let Some((_, _, remaining)) = self.orders.get_mut(&order_id) {
                    *remaining = delta.quantity;
                }
            }
            DeltaKind::Delete => {
                let order_id = delta.order_id.expect("delete carries an order id");
                self.orders.remove(&order_id);
            }
        }
    }

    fn levels(&self, side: Side) -> HashMap<u64, u64> {
        let mut levels: HashMap<u64, u64> = HashMap::new();
        for (order_side, price, remaining) in self.orders.values() {
            if *order_side == side && *remaining > 0 {
                *levels.entry(*price).or_default() += *remaining;
            }
        }
        levels
    }
}

fn snapshot_levels(levels: &[LevelSnapshot]) -> HashMap<u64, u64> {
    levels.iter().map(|l| (l.price, l.quantity)).collect()
}

#[test]
fn law_snapshot_plus_deltas_reconstructs_state() {
    let (book, deltas) = recording_book();

    // A first batch of activity, then a snapshot at S.
    book.add_limit_order(IntentId(1), Side::Sell, 102, 5, TimeInForce::Gtc)
        .unwrap();
    book.add_limit_order(IntentId(2), Side::Sell, 103, 7, TimeInForce::Gtc)
        .unwrap();
    book.add_limit_order(IntentId(3), Side::Buy, 100, 4, TimeInForce::Gtc)
        .unwrap();
    let snapshot_s = book.snapshot(64);

    // More activity after S: fills, a cancel, a reduce, a new level.
    let bid = book
        .add_limit_order(IntentId(4), Side::Buy, 101, 6, TimeInForce::Gtc)
        .unwrap()
        .order_id
        .unwrap();
    book.add_limit_order(IntentId(5), Side::Buy, 102, 3, TimeInForce::Gtc)
        .unwrap();
    book.modify_order(bid, Some(2), None).unwrap();
    book.add_limit_order(IntentId(6), Side::Sell, 100, 2, TimeInForce::Gtc)
        .unwrap();

    let fresh = book.snapshot(64);
    let history = deltas.lock().unwrap();

    let mut replayed = ReplayState::seed(&snapshot_s, &history);
    for delta in history.iter().filter(|d| d.seq > snapshot_s.seq) {
        replayed.apply(delta);
    }

    assert_eq!(replayed.levels(Side::Buy), snapshot_levels(&fresh.bids));
    assert_eq!(replayed.levels(Side::Sell), snapshot_levels(&fresh.asks));
}
