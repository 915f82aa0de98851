//! End-to-end matching and risk scenarios on an empty book with
//! tick = 1 and lot = 1.

use matchcore_rs::prelude::*;
use std::sync::{Arc, Mutex};

fn recording_book() -> (OrderBook, Arc<Mutex<Vec<BookDelta>>>) {
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&deltas);
    let book = OrderBook::new("BTC/USD").with_delta_listener(Arc::new(move |delta: &BookDelta| {
        sink.lock().unwrap().push(delta.clone());
    }));
    (book, deltas)
}

#[test]
fn scenario_basic_cross() {
    let (book, _) = recording_book();

    // SELL 10 @ 100 rests as order A.
    let a = book
        .add_limit_order(IntentId(1), Side::Sell, 100, 10, TimeInForce::Gtc)
        .unwrap();
    let a_id = a.order_id.unwrap();

    // BUY 4 @ 100 is the aggressor B.
    let b = book
        .add_limit_order(IntentId(2), Side::Buy, 100, 4, TimeInForce::Gtc)
        .unwrap();

    assert_eq!(b.trades.len(), 1);
    let trade = &b.trades[0];
    assert_eq!(trade.price, 100);
    assert_eq!(trade.quantity, 4);
    assert_eq!(trade.passive_order_id, a_id);
    assert_eq!(trade.aggressor_intent_id, IntentId(2));

    // A remains with 6 at level 100; no bid rests.
    let ask = book.best_quote(Side::Sell).unwrap();
    assert_eq!((ask.price, ask.quantity), (100, 6));
    assert!(book.best_quote(Side::Buy).is_none());
}

#[test]
fn scenario_price_time_priority() {
    let (book, _) = recording_book();

    let a = book
        .add_limit_order(IntentId(1), Side::Sell, 101, 5, TimeInForce::Gtc)
        .unwrap()
        .order_id
        .unwrap();
    let b = book
        .add_limit_order(IntentId(2), Side::Sell, 101, 5, TimeInForce::Gtc)
        .unwrap()
        .order_id
        .unwrap();

    let aggressor = book
        .add_limit_order(IntentId(3), Side::Buy, 101, 8, TimeInForce::Gtc)
        .unwrap();

    assert_eq!(aggressor.trades.len(), 2);
    assert_eq!(
        (aggressor.trades[0].price, aggressor.trades[0].quantity),
        (101, 5)
    );
    assert_eq!(aggressor.trades[0].passive_order_id, a);
    assert_eq!(
        (aggressor.trades[1].price, aggressor.trades[1].quantity),
        (101, 3)
    );
    assert_eq!(aggressor.trades[1].passive_order_id, b);

    // B remains with 2 at 101.
    let ask = book.best_quote(Side::Sell).unwrap();
    assert_eq!((ask.price, ask.quantity), (101, 2));
}

#[test]
fn scenario_market_walks_levels() {
    let (book, _) = recording_book();

    book.add_limit_order(IntentId(1), Side::Sell, 100, 4, TimeInForce::Gtc)
        .unwrap();
    book.add_limit_order(IntentId(2), Side::Sell, 101, 6, TimeInForce::Gtc)
        .unwrap();

    let outcome = book
        .submit_market_order(IntentId(3), Side::Buy, 7)
        .unwrap();

    assert_eq!(outcome.trades.len(), 2);
    assert_eq!((outcome.trades[0].price, outcome.trades[0].quantity), (100, 4));
    assert_eq!((outcome.trades[1].price, outcome.trades[1].quantity), (101, 3));

    let ask = book.best_quote(Side::Sell).unwrap();
    assert_eq!((ask.price, ask.quantity), (101, 3));
}

#[test]
fn scenario_fok_unfillable() {
    let (book, deltas) = recording_book();

    book.add_limit_order(IntentId(1), Side::Sell, 100, 3, TimeInForce::Gtc)
        .unwrap();
    let deltas_before = deltas.lock().unwrap().len();
    let seq_before = book.sequence();

    let result = book.add_limit_order(IntentId(2), Side::Buy, 100, 5, TimeInForce::Fok);

    assert_eq!(
        result.unwrap_err(),
        OrderBookError::FokUnfillable {
            requested: 5,
            available: 3
        }
    );
    // Zero deltas; book unchanged.
    assert_eq!(deltas.lock().unwrap().len(), deltas_before);
    assert_eq!(book.sequence(), seq_before);
    let ask = book.best_quote(Side::Sell).unwrap();
    assert_eq!((ask.price, ask.quantity), (100, 3));
}

#[test]
fn scenario_ioc_partial() {
    let (book, deltas) = recording_book();

    book.add_limit_order(IntentId(1), Side::Sell, 100, 3, TimeInForce::Gtc)
        .unwrap();

    let outcome = book
        .add_limit_order(IntentId(2), Side::Buy, 100, 5, TimeInForce::Ioc)
        .unwrap();

    assert_eq!(outcome.trades.len(), 1);
    assert_eq!((outcome.trades[0].price, outcome.trades[0].quantity), (100, 3));
    assert_eq!(outcome.remaining_quantity, 2);
    assert_eq!(outcome.state, IntentState::Canceled);

    // No Add delta was emitted for the aggressor.
    let deltas = deltas.lock().unwrap();
    let adds_after_seed: Vec<_> = deltas
        .iter()
        .skip(1)
        .filter(|d| d.kind == DeltaKind::Add)
        .collect();
    assert!(adds_after_seed.is_empty());
    assert!(book.best_quote(Side::Buy).is_none());
}

#[test]
fn scenario_risk_gate_rejects_on_position() {
    let config = EngineConfig {
        limits: RiskLimits {
            max_position: 10,
            ..Default::default()
        },
        ..Default::default()
    };
    let engine = MatchingEngine::new(config).unwrap();
    engine.add_symbol("BTC/USD").unwrap();
    let violations = engine.bus().subscribe(EventKind::Violation, 16);

    // Current position: 8.
    engine.gate().on_fill("BTC/USD", Side::Buy, 8, 100);

    let intent = OrderIntent::limit("BTC/USD", Side::Buy, 100, 3, TimeInForce::Gtc);
    let result = engine.submit_intent(intent);

    assert!(matches!(
        result,
        Err(EngineError::Risk(RiskRejection::Position {
            projected: 11,
            limit: 10,
            ..
        }))
    ));
    // Nothing reached the book.
    assert!(engine.book("BTC/USD").unwrap().best_quote(Side::Buy).is_none());

    // The violation event carries observed 11 against limit 10.
    let events = violations.drain();
    assert_eq!(events.len(), 1);
    match events[0].as_ref() {
        EngineEvent::Violation(violation) => {
            assert_eq!(violation.kind, ViolationKind::Position);
            assert_eq!(violation.observed, 11.0);
            assert_eq!(violation.limit, 10.0);
        }
        other => panic!("expected violation, got {other:?}"),
    }
}
