//! Protocol fee policy.
//!
//! ## Rounding
//!
//! Fees round down: `fee = floor(gross * fee_rate / BASIS_POINTS)`. Any
//! remainder stays with the recipient, and `net + fee == gross` holds for
//! every split. A product that does not fit in `i128` is rejected rather
//! than wrapped or clamped.

use soroban_sdk::{contracttype, symbol_short, token, Address, Env};

use crate::{rbac, CoreError, EVENT_VERSION};

/// Basis-point denominator (1 bp = 0.01%).
pub const BASIS_POINTS: i128 = 10_000;

/// Default ceiling on `fee_rate` (50%).
pub const MAX_FEE_RATE: i128 = 5_000;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfig {
    pub fee_enabled: bool,
    pub fee_rate: i128,
    pub max_fee_rate: i128,
    pub fee_recipient: Address,
}

impl FeeConfig {
    pub fn disabled(fee_recipient: Address) -> Self {
        Self {
            fee_enabled: false,
            fee_rate: 0,
            max_fee_rate: MAX_FEE_RATE,
            fee_recipient,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_fee_rate < 0 || self.max_fee_rate > BASIS_POINTS {
            return Err(CoreError::InvalidFeeRate);
        }
        if self.fee_rate < 0 || self.fee_rate > self.max_fee_rate {
            return Err(CoreError::InvalidFeeRate);
        }
        Ok(())
    }

    /// Splits `gross` under this configuration. Disabled fees take nothing.
    pub fn split(&self, gross: i128) -> Result<FeeSplit, CoreError> {
        if !self.fee_enabled {
            return Ok(FeeSplit { fee: 0, net: gross });
        }
        split(gross, self.fee_rate)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FeeSplit {
    pub fee: i128,
    pub net: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum FeeKey {
    Config,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeeConfigUpdated {
    pub version: u32,
    pub fee_enabled: bool,
    pub fee_rate: i128,
    pub max_fee_rate: i128,
    pub fee_recipient: Address,
    pub timestamp: u64,
}

/// `floor(gross * fee_rate / BASIS_POINTS)`, or `None` when the product
/// overflows or an input is negative.
pub fn calculate_fee(gross: i128, fee_rate: i128) -> Option<i128> {
    if gross < 0 || fee_rate < 0 {
        return None;
    }
    if gross == 0 || fee_rate == 0 {
        return Some(0);
    }
    gross
        .checked_mul(fee_rate)
        .map(|scaled| scaled / BASIS_POINTS)
}

pub fn split(gross: i128, fee_rate: i128) -> Result<FeeSplit, CoreError> {
    let fee = calculate_fee(gross, fee_rate).ok_or(CoreError::ArithmeticOverflow)?;
    let net = gross
        .checked_sub(fee)
        .ok_or(CoreError::ArithmeticOverflow)?;
    Ok(FeeSplit { fee, net })
}

pub fn init_config(env: &Env, fee_recipient: &Address) {
    env.storage()
        .instance()
        .set(&FeeKey::Config, &FeeConfig::disabled(fee_recipient.clone()));
}

pub fn get_config(env: &Env) -> Result<FeeConfig, CoreError> {
    env.storage()
        .instance()
        .get(&FeeKey::Config)
        .ok_or(CoreError::NotInitialized)
}

/// Admin-only partial update. Arguments left as `None` keep their value;
/// the merged configuration is validated as a whole before it is stored.
pub fn update_config(
    env: &Env,
    caller: &Address,
    fee_rate: Option<i128>,
    max_fee_rate: Option<i128>,
    fee_recipient: Option<Address>,
    fee_enabled: Option<bool>,
) -> Result<FeeConfig, CoreError> {
    rbac::require_admin(env, caller)?;

    let mut config = get_config(env)?;
    if let Some(rate) = fee_rate {
        config.fee_rate = rate;
    }
    if let Some(max) = max_fee_rate {
        config.max_fee_rate = max;
    }
    if let Some(recipient) = fee_recipient {
        config.fee_recipient = recipient;
    }
    if let Some(enabled) = fee_enabled {
        config.fee_enabled = enabled;
    }
    config.validate()?;

    env.storage().instance().set(&FeeKey::Config, &config);
    env.events().publish(
        (symbol_short!("fee_cfg"),),
        FeeConfigUpdated {
            version: EVENT_VERSION,
            fee_enabled: config.fee_enabled,
            fee_rate: config.fee_rate,
            max_fee_rate: config.max_fee_rate,
            fee_recipient: config.fee_recipient.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(config)
}

/// Pays `gross` out of custody: `net` to `recipient`, `fee` to the fee
/// recipient. Callers must have committed their bookkeeping first.
pub fn disburse(
    env: &Env,
    token: &Address,
    recipient: &Address,
    gross: i128,
) -> Result<FeeSplit, CoreError> {
    let config = get_config(env)?;
    let split = config.split(gross)?;

    let client = token::Client::new(env, token);
    let custody = env.current_contract_address();
    if split.net > 0 {
        client.transfer(&custody, recipient, &split.net);
    }
    if split.fee > 0 {
        client.transfer(&custody, &config.fee_recipient, &split.fee);
    }
    Ok(split)
}
