//! Shared pieces of the validate-then-commit batch pattern.

use soroban_sdk::{log, Env};

use crate::CoreError;

/// Upper bound on items accepted by a single batch call.
pub const MAX_BATCH_SIZE: u32 = 20;

pub fn check_size(len: u32) -> Result<(), CoreError> {
    if len == 0 || len > MAX_BATCH_SIZE {
        return Err(CoreError::InvalidBatchSize);
    }
    Ok(())
}

/// The first item a batch plan refused, with the cause.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Rejected<E> {
    pub index: u32,
    pub error: E,
}

impl<E: Copy + Into<u32>> Rejected<E> {
    pub fn at(index: u32, error: E) -> Self {
        Self { index, error }
    }

    /// Logs the rejection and hands back the error for the caller to return.
    /// The index only survives in builds with debug assertions; contracts
    /// expose it to callers through their dry-run checks.
    pub fn log(self, env: &Env) -> E {
        let code: u32 = self.error.into();
        log!(env, "batch item rejected", self.index, code);
        self.error
    }
}
