//! Admin-configured bounds on deposits and payouts.

use soroban_sdk::{contracttype, Env};

use crate::{DataKey, Error};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AmountLimits {
    pub min_lock_amount: i128,
    pub max_lock_amount: i128,
    pub min_payout: i128,
    pub max_payout: i128,
}

impl AmountLimits {
    /// In effect until an Admin sets limits.
    pub fn unbounded() -> Self {
        Self {
            min_lock_amount: 1,
            max_lock_amount: i128::MAX,
            min_payout: 1,
            max_payout: i128::MAX,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let bounds = [
            self.min_lock_amount,
            self.max_lock_amount,
            self.min_payout,
            self.max_payout,
        ];
        if bounds.iter().any(|b| *b < 0) {
            return Err(Error::InvalidAmount);
        }
        if self.min_lock_amount > self.max_lock_amount || self.min_payout > self.max_payout {
            return Err(Error::InvalidAmount);
        }
        Ok(())
    }

    pub fn check_lock(&self, amount: i128) -> Result<(), Error> {
        within(amount, self.min_lock_amount, self.max_lock_amount)
    }

    /// Applies to the gross amount of direct payouts and schedules.
    pub fn check_payout(&self, amount: i128) -> Result<(), Error> {
        within(amount, self.min_payout, self.max_payout)
    }
}

fn within(amount: i128, min: i128, max: i128) -> Result<(), Error> {
    if amount < min || amount > max {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

pub fn get(env: &Env) -> AmountLimits {
    env.storage()
        .instance()
        .get(&DataKey::AmountLimits)
        .unwrap_or_else(AmountLimits::unbounded)
}

pub fn set(env: &Env, limits: &AmountLimits) {
    env.storage().instance().set(&DataKey::AmountLimits, limits);
}
