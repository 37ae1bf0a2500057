//! Reentrancy protection for fund-moving entry points.
//!
//! A flag in instance storage marks that a protected call is in progress.
//! The guard clears the flag when dropped, so every early `return Err(..)`
//! releases it without extra bookkeeping. A panic rolls the whole
//! invocation back, flag included.

use soroban_sdk::{contracttype, Env};

use crate::CoreError;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum GuardKey {
    Entered,
}

pub struct ReentrancyGuard {
    env: Env,
}

impl ReentrancyGuard {
    pub fn acquire(env: &Env) -> Result<Self, CoreError> {
        if is_active(env) {
            return Err(CoreError::Reentrancy);
        }
        env.storage().instance().set(&GuardKey::Entered, &true);
        Ok(Self { env: env.clone() })
    }
}

impl Drop for ReentrancyGuard {
    fn drop(&mut self) {
        self.env.storage().instance().remove(&GuardKey::Entered);
    }
}

pub fn is_active(env: &Env) -> bool {
    env.storage().instance().has(&GuardKey::Entered)
}
