//! # Signing Decisions
//!
//! The slashing rules, as pure functions over already-loaded state.
//!
//! ## Block Rules (evaluated in order)
//!
//! 1. Below the slot watermark → deny
//! 2. A block already at this slot → permit only if the roots match
//! 3. Otherwise → insert and permit
//!
//! ## Attestation Rules (evaluated in order)
//!
//! 1. `source > target` → deny
//! 2. Below either epoch watermark → deny
//! 3. An attestation already at this target → permit only if the roots match
//! 4. An existing attestation surrounds the candidate → deny
//! 5. The candidate surrounds an existing attestation → deny
//! 6. Otherwise → insert and permit
//!
//! Reference: Casper FFG slashing conditions (double vote, surround vote) and
//! the proposer double-propose condition.

use std::fmt;

use shared_types::{Epoch, SigningRoot, Slot};

use super::entities::SigningWatermark;

/// Outcome of a slashing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningDecision {
    /// Safe to sign. The duty has been recorded.
    Permit,
    /// Unsafe to sign. Nothing was recorded.
    Deny(DenialReason),
}

impl SigningDecision {
    pub fn is_permitted(&self) -> bool {
        matches!(self, SigningDecision::Permit)
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            SigningDecision::Permit => None,
            SigningDecision::Deny(reason) => Some(*reason),
        }
    }
}

/// Why a signing request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialReason {
    /// Slot or epoch strictly below the validator's watermark.
    BelowWatermark,
    /// A different block was already signed at this slot.
    DoubleBlockProposal,
    /// A different attestation was already signed for this target epoch.
    DoubleVote,
    /// The candidate would surround an existing attestation.
    SurroundingVote,
    /// An existing attestation surrounds the candidate.
    SurroundedVote,
    /// Attestation source epoch is after its target epoch.
    SourceAfterTarget,
}

impl DenialReason {
    /// Stable snake_case label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::BelowWatermark => "below_watermark",
            DenialReason::DoubleBlockProposal => "double_block_proposal",
            DenialReason::DoubleVote => "double_vote",
            DenialReason::SurroundingVote => "surrounding_vote",
            DenialReason::SurroundedVote => "surrounded_vote",
            DenialReason::SourceAfterTarget => "source_after_target",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block rule 1.
pub fn check_block_floor(watermark: Option<&SigningWatermark>, slot: Slot) -> Option<DenialReason> {
    watermark
        .filter(|w| w.is_block_below(slot))
        .map(|_| DenialReason::BelowWatermark)
}

/// Attestation rules 1 and 2.
pub fn check_attestation_floor(
    watermark: Option<&SigningWatermark>,
    source_epoch: Epoch,
    target_epoch: Epoch,
) -> Option<DenialReason> {
    if source_epoch > target_epoch {
        return Some(DenialReason::SourceAfterTarget);
    }
    watermark
        .filter(|w| w.is_attestation_below(source_epoch, target_epoch))
        .map(|_| DenialReason::BelowWatermark)
}

/// Block rule 2 / attestation rule 3: re-signing identical data is allowed.
pub fn resolve_existing(
    existing: &SigningRoot,
    candidate: &SigningRoot,
    on_conflict: DenialReason,
) -> SigningDecision {
    if existing == candidate {
        SigningDecision::Permit
    } else {
        SigningDecision::Deny(on_conflict)
    }
}
