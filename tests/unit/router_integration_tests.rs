//! Router-to-engine integration: planned children re-enter the ordinary
//! admission path.

use matchcore_rs::prelude::*;
use matchcore_rs::router::{FeeSchedule, VenueQuote};
use std::sync::Arc;

fn venue(id: &str, ask_price: u64, ask_size: u64, reliability: f64) -> VenueDescriptor {
    VenueDescriptor {
        venue_id: id.to_string(),
        kind: VenueKind::LitExchange,
        connected: true,
        quote: Some(VenueQuote {
            bid_price: ask_price.saturating_sub(2),
            bid_size: ask_size,
            ask_price,
            ask_size,
            updated_ms: 1_000,
        }),
        reliability,
        fill_rate: 0.9,
        avg_latency_us: 200,
        min_order_size: 1,
        max_order_size: 1_000_000,
        tick_size: 1,
        fees: FeeSchedule::new(-1, 4),
        hidden_liquidity: 0,
    }
}

#[test]
fn test_plan_reports_cost_and_fees_inputs() {
    let sor = SmartOrderRouter::new(RouterConfig::default());
    let parent = OrderIntent::limit("BTC/USD", Side::Buy, 105, 60, TimeInForce::Gtc);
    let venues = [venue("a", 100, 40, 0.95), venue("b", 101, 40, 0.95)];

    let plan = sor.plan(&parent, &venues, 2_000).unwrap();
    assert!(plan.approved || plan.expected_impact_bps > sor.config().max_market_impact_bps);
    assert_eq!(plan.allocated_quantity(), 60);
    assert_eq!(plan.expected_cost, 40 * 100 + 20 * 101);
    let average = plan.average_expected_price().unwrap();
    assert!(average > 100.0 && average < 101.0);

    // Venue fees are available per allocation for cost attribution.
    let taker_fee = venues[0].fees.calculate_fee(40 * 100, false);
    assert_eq!(taker_fee, (40 * 100) * 4 / 10_000);
}

#[test]
fn test_children_flow_through_engine_admission() {
    let engine = Arc::new(MatchingEngine::new(EngineConfig::default()).unwrap());
    engine.add_symbol("BTC/USD").unwrap();
    // Liquidity resting on our own book mirrors the venue's displayed size.
    engine
        .submit_intent(OrderIntent::limit(
            "BTC/USD",
            Side::Sell,
            100,
            50,
            TimeInForce::Gtc,
        ))
        .unwrap();

    let sor = SmartOrderRouter::new(RouterConfig::default());
    let parent = OrderIntent::limit("BTC/USD", Side::Buy, 105, 30, TimeInForce::Gtc)
        .with_client("strat-1", "parent-1");
    let plan = sor
        .plan(&parent, &[venue("self", 100, 50_000, 0.99)], 2_000)
        .unwrap();
    assert!(plan.approved);

    for (index, child) in plan.allocations.iter().enumerate() {
        let mut intent = OrderIntent::limit(
            &parent.symbol,
            parent.side,
            child.expected_price,
            child.quantity,
            child.tif,
        );
        intent.client_id = parent.client_id.clone();
        intent.client_order_id = format!("{}-{}", parent.client_order_id, index);
        let outcome = engine.submit_intent(intent).unwrap();
        assert_eq!(outcome.executed_quantity, child.quantity);
    }

    assert_eq!(engine.gate().positions().net_position("BTC/USD"), 30);
}

#[test]
fn test_unapproved_plan_is_rejected_upstream() {
    let sor = SmartOrderRouter::new(RouterConfig {
        max_market_impact_bps: 5.0,
        ..Default::default()
    });
    let parent = OrderIntent::limit("BTC/USD", Side::Buy, 105, 50, TimeInForce::Gtc);
    let plan = sor.plan(&parent, &[venue("thin", 100, 50, 0.95)], 2_000).unwrap();

    assert!(!plan.approved);
    // The caller must treat an unapproved plan as a refusal; nothing in the
    // plan is sendable.
    assert!(plan.expected_impact_bps > 5.0);
}
