//! Smart order routing: split a parent order across venues under a chosen
//! execution algorithm, using current top-of-book data and per-venue fee,
//! reliability and latency characteristics.

mod allocator;
mod fees;
mod plan;
mod venue;

pub use allocator::{RouterConfig, RouterError, RoutingAlgorithm, SmartOrderRouter};
pub use fees::FeeSchedule;
pub use plan::{ChildAllocation, RoutePlan};
pub use venue::{VenueDescriptor, VenueKind, VenueQuote};
