//! # Quantum-Signer Test Suite
//!
//! Cross-crate scenarios for the slashing protection engine and its runtime.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Keys, roots and engine constructors
//! └── integration/
//!     ├── signing_flows.rs  # Block and attestation rules end to end
//!     ├── pruning.rs        # Retention, monotonicity, isolation
//!     ├── concurrency.rs    # Racing decisions and prunes
//!     └── interchange.rs    # Export over durable backends
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qs-tests
//! cargo test -p qs-tests integration::pruning::
//! cargo bench -p qs-tests
//! ```

pub mod fixtures;
pub mod integration;
