//! # Slashing Protection Metrics
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qs-01-slashing-protection = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `slashing_protection_permitted_total{duty}` - signing requests permitted
//! - `slashing_protection_prevented_total{duty,reason}` - signing requests denied
//! - `slashing_protection_pruned_records_total{duty}` - records deleted by pruning

use shared_types::DutyKind;

use crate::domain::decision::DenialReason;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
use prometheus::{register_int_counter_vec, IntCounterVec};

#[cfg(feature = "metrics")]
lazy_static! {
    /// Permitted signing requests, labeled by duty kind
    pub static ref SIGNING_PERMITTED: IntCounterVec = register_int_counter_vec!(
        "slashing_protection_permitted_total",
        "Total number of signing requests permitted by slashing protection",
        &["duty"]
    )
    .expect("Failed to create SIGNING_PERMITTED metric");

    /// Denied signing requests, labeled by duty kind and reason
    pub static ref SIGNING_PREVENTED: IntCounterVec = register_int_counter_vec!(
        "slashing_protection_prevented_total",
        "Total number of signing requests prevented by slashing protection",
        &["duty", "reason"]
    )
    .expect("Failed to create SIGNING_PREVENTED metric");

    /// Records removed by pruning, labeled by duty kind
    pub static ref RECORDS_PRUNED: IntCounterVec = register_int_counter_vec!(
        "slashing_protection_pruned_records_total",
        "Total number of signed records deleted by pruning",
        &["duty"]
    )
    .expect("Failed to create RECORDS_PRUNED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

#[cfg(feature = "metrics")]
pub fn record_permitted(kind: DutyKind) {
    SIGNING_PERMITTED.with_label_values(&[kind.as_str()]).inc();
}

#[cfg(feature = "metrics")]
pub fn record_prevented(kind: DutyKind, reason: DenialReason) {
    SIGNING_PREVENTED
        .with_label_values(&[kind.as_str(), reason.as_str()])
        .inc();
}

#[cfg(feature = "metrics")]
pub fn record_pruned(kind: DutyKind, count: u64) {
    RECORDS_PRUNED.with_label_values(&[kind.as_str()]).inc_by(count);
}

// =============================================================================
// NO-OP IMPLEMENTATIONS (when metrics feature disabled)
// =============================================================================

#[cfg(not(feature = "metrics"))]
pub fn record_permitted(_kind: DutyKind) {}

#[cfg(not(feature = "metrics"))]
pub fn record_prevented(_kind: DutyKind, _reason: DenialReason) {}

#[cfg(not(feature = "metrics"))]
pub fn record_pruned(_kind: DutyKind, _count: u64) {}
