//! Concrete adapters wired by the runtime.

pub mod storage;
