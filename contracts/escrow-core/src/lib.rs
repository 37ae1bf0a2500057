#![no_std]
//! Building blocks shared by the bounty and program escrow contracts.
//!
//! Everything here is a plain function over `&Env` that returns
//! `Result<_, CoreError>`; each contract converts `CoreError` into its own
//! `#[contracterror]` enum so the helpers compose with `?`.

pub mod asset;
pub mod batch;
pub mod error;
pub mod fee;
pub mod pause;
pub mod rbac;
pub mod reentrancy_guard;
pub mod storage;
pub mod upgrade;

pub use error::CoreError;

/// Payload version carried by every audit event the escrow contracts emit.
pub const EVENT_VERSION: u32 = 1;
