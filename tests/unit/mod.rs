//! Integration test suites, compiled as a single test target.

mod engine_tests;
mod invariant_props;
mod law_tests;
mod ring_fanout_tests;
mod router_integration_tests;
mod scenario_tests;
