//! Contract-wide circuit breaker.
//!
//! Pausers and Admins may halt the contract; only an Admin may resume it.
//! While paused every fund-moving entry point fails with
//! [`CoreError::Paused`]; read queries keep working.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::{rbac, CoreError, EVENT_VERSION};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum PauseKey {
    Paused,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseStateChanged {
    pub version: u32,
    pub paused: bool,
    pub caller: Address,
    pub timestamp: u64,
}

pub fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&PauseKey::Paused)
        .unwrap_or(false)
}

pub fn ensure_not_paused(env: &Env) -> Result<(), CoreError> {
    if is_paused(env) {
        return Err(CoreError::Paused);
    }
    Ok(())
}

pub fn pause(env: &Env, caller: &Address) -> Result<(), CoreError> {
    if !rbac::can_pause(env, caller) {
        return Err(CoreError::Unauthorized);
    }
    caller.require_auth();
    set_paused(env, caller, true);
    Ok(())
}

pub fn unpause(env: &Env, caller: &Address) -> Result<(), CoreError> {
    rbac::require_admin(env, caller)?;
    set_paused(env, caller, false);
    Ok(())
}

fn set_paused(env: &Env, caller: &Address, paused: bool) {
    env.storage().instance().set(&PauseKey::Paused, &paused);

    let topic = if paused {
        symbol_short!("pause")
    } else {
        symbol_short!("unpause")
    };
    env.events().publish(
        (topic,),
        PauseStateChanged {
            version: EVENT_VERSION,
            paused,
            caller: caller.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}
