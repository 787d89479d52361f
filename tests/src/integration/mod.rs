//! Integration scenarios.

pub mod concurrency;
pub mod interchange;
pub mod pruning;
pub mod signing_flows;
