//! Property-based tests for the book invariants.
//!
//! Random intent streams must preserve: an uncrossed resting book,
//! conservation of quantity, gapless monotonic sequence numbers, and
//! index/ladder agreement.

use matchcore_rs::prelude::*;
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
enum Action {
    Limit {
        side: Side,
        price: u64,
        quantity: u64,
        tif: TimeInForce,
    },
    Market {
        side: Side,
        quantity: u64,
    },
    CancelNth(usize),
}

fn side_strategy() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell)]
}

fn tif_strategy() -> impl Strategy<Value = TimeInForce> {
    prop_oneof![
        Just(TimeInForce::Gtc),
        Just(TimeInForce::Ioc),
        Just(TimeInForce::Fok),
    ]
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (side_strategy(), 90u64..=110, 1u64..=50, tif_strategy()).prop_map(
            |(side, price, quantity, tif)| Action::Limit {
                side,
                price,
                quantity,
                tif
            }
        ),
        (side_strategy(), 1u64..=30).prop_map(|(side, quantity)| Action::Market {
            side,
            quantity
        }),
        (0usize..=40).prop_map(Action::CancelNth),
    ]
}

fn check_invariants(book: &OrderBook, resting: &[OrderId]) {
    // No crossed resting book.
    if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
        assert!(bid < ask, "crossed book: {bid} >= {ask}");
    }
    // Index/ladder agreement: every indexed order is reachable and has
    // positive remaining quantity.
    for order_id in resting {
        if let Some(order) = book.get_order(*order_id) {
            assert!(order.remaining() > 0, "indexed order with zero remaining");
        }
    }
    // Level aggregates match the snapshot sums.
    let snapshot = book.snapshot(1_000);
    for level in snapshot.bids.iter().chain(snapshot.asks.iter()) {
        assert!(level.quantity > 0, "empty level in snapshot");
        assert!(level.order_count > 0);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn random_streams_preserve_invariants(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let seqs = Arc::new(Mutex::new(Vec::<u64>::new()));
        let sink = Arc::clone(&seqs);
        let book = OrderBook::new("PROP").with_delta_listener(Arc::new(move |delta: &BookDelta| {
            sink.lock().unwrap().push(delta.seq);
        }));

        let mut resting: Vec<OrderId> = Vec::new();
        let mut submitted: u64 = 0;
        let mut intent_id = 0u64;

        for action in actions {
            match action {
                Action::Limit { side, price, quantity, tif } => {
                    intent_id += 1;
                    submitted += quantity;
                    match book.add_limit_order(IntentId(intent_id), side, price, quantity, tif) {
                        Ok(outcome) => {
                            // Conservation per intent: executed + remaining = quantity.
                            prop_assert_eq!(
                                outcome.executed_quantity + outcome.remaining_quantity,
                                quantity
                            );
                            if let Some(order_id) = outcome.order_id {
                                resting.push(order_id);
                            }
                        }
                        Err(OrderBookError::FokUnfillable { .. }) => {}
                        Err(error) => prop_assert!(false, "unexpected error: {error}"),
                    }
                }
                Action::Market { side, quantity } => {
                    intent_id += 1;
                    submitted += quantity;
                    let outcome = book
                        .submit_market_order(IntentId(intent_id), side, quantity)
                        .expect("market orders never refuse");
                    prop_assert_eq!(
                        outcome.executed_quantity + outcome.remaining_quantity,
                        quantity
                    );
                }
                Action::CancelNth(n) => {
                    if !resting.is_empty() {
                        let order_id = resting[n % resting.len()];
                        // Cancelling an already-gone order must refuse cleanly.
                        let _ = book.cancel_order(order_id);
                    }
                }
            }
            check_invariants(&book, &resting);
        }

        // Cumulative volume never exceeds what was submitted.
        prop_assert!(book.cumulative_volume() <= submitted);

        // Sequence numbers are strictly increasing with no gaps.
        let seqs = seqs.lock().unwrap();
        for window in seqs.windows(2) {
            prop_assert_eq!(window[1], window[0] + 1);
        }
    }

    #[test]
    fn price_time_priority_holds_within_level(
        quantities in prop::collection::vec(1u64..=20, 2..6),
        aggressor_extra in 0u64..=10,
    ) {
        let book = OrderBook::new("PROP");
        let mut ids = Vec::new();
        for (i, quantity) in quantities.iter().enumerate() {
            let outcome = book
                .add_limit_order(IntentId(i as u64 + 1), Side::Sell, 100, *quantity, TimeInForce::Gtc)
                .unwrap();
            ids.push(outcome.order_id.unwrap());
        }

        // Take out everything but part of the last order.
        let total: u64 = quantities.iter().sum();
        let take = total.saturating_sub(aggressor_extra.min(quantities[quantities.len() - 1].saturating_sub(1)));
        let outcome = book
            .submit_market_order(IntentId(999), Side::Buy, take)
            .unwrap();

        // Fills arrive in the order the resting orders were created.
        let mut filled_order: Vec<OrderId> = Vec::new();
        for trade in &outcome.trades {
            if filled_order.last() != Some(&trade.passive_order_id) {
                filled_order.push(trade.passive_order_id);
            }
        }
        let expected: Vec<OrderId> = ids.iter().take(filled_order.len()).copied().collect();
        prop_assert_eq!(filled_order, expected);
    }
}
