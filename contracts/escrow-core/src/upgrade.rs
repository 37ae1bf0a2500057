//! Code version tracking, state migrations and WASM upgrades.
//!
//! The usual sequence after shipping new code is `upgrade(new_wasm_hash)`
//! followed by `migrate(target_version, migration_hash)`. Each contract
//! supplies its own per-version step function; this module handles
//! authorization, ordering and bookkeeping.

use soroban_sdk::{contracttype, log, symbol_short, Address, BytesN, Env};

use crate::{rbac, CoreError, EVENT_VERSION};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum UpgradeKey {
    Version,
    PreviousVersion,
    MigrationState,
}

/// Record of the most recent completed migration.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MigrationState {
    pub from_version: u32,
    pub to_version: u32,
    pub migrated_at: u64,
    pub migration_hash: BytesN<32>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Migrated {
    pub version: u32,
    pub from_version: u32,
    pub to_version: u32,
    pub migration_hash: BytesN<32>,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Upgraded {
    pub version: u32,
    pub previous_version: u32,
    pub new_wasm_hash: BytesN<32>,
    pub timestamp: u64,
}

pub fn init_version(env: &Env, version: u32) {
    env.storage().instance().set(&UpgradeKey::Version, &version);
}

pub fn get_version(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&UpgradeKey::Version)
        .unwrap_or(0)
}

pub fn get_previous_version(env: &Env) -> Option<u32> {
    env.storage().instance().get(&UpgradeKey::PreviousVersion)
}

pub fn get_migration_state(env: &Env) -> Option<MigrationState> {
    env.storage().instance().get(&UpgradeKey::MigrationState)
}

/// Walks the stored version up to `target_version`, calling `step` once
/// for every intermediate version.
///
/// Migrating to the current version is a no-op so a retried transaction
/// cannot run the steps twice. Moving backwards fails with
/// `InvalidVersion`, as does any version `step` does not know.
pub fn migrate<F>(
    env: &Env,
    caller: &Address,
    target_version: u32,
    migration_hash: BytesN<32>,
    step: F,
) -> Result<(), CoreError>
where
    F: Fn(&Env, u32) -> Result<(), CoreError>,
{
    rbac::require_admin(env, caller)?;

    let current = get_version(env);
    if target_version == current {
        return Ok(());
    }
    if target_version < current {
        return Err(CoreError::InvalidVersion);
    }

    let mut version = current;
    while version < target_version {
        let next = version + 1;
        step(env, next)?;
        version = next;
    }

    let now = env.ledger().timestamp();
    env.storage()
        .instance()
        .set(&UpgradeKey::Version, &target_version);
    env.storage().instance().set(
        &UpgradeKey::MigrationState,
        &MigrationState {
            from_version: current,
            to_version: target_version,
            migrated_at: now,
            migration_hash: migration_hash.clone(),
        },
    );

    log!(env, "migrated", current, target_version);
    env.events().publish(
        (symbol_short!("migrate"),),
        Migrated {
            version: EVENT_VERSION,
            from_version: current,
            to_version: target_version,
            migration_hash,
            timestamp: now,
        },
    );
    Ok(())
}

/// Swaps the contract code. Storage is untouched; call `migrate` afterwards
/// if the new code expects a different layout.
pub fn upgrade(env: &Env, caller: &Address, new_wasm_hash: BytesN<32>) -> Result<(), CoreError> {
    rbac::require_admin(env, caller)?;

    let previous_version = get_version(env);
    env.storage()
        .instance()
        .set(&UpgradeKey::PreviousVersion, &previous_version);

    env.events().publish(
        (symbol_short!("upgrade"),),
        Upgraded {
            version: EVENT_VERSION,
            previous_version,
            new_wasm_hash: new_wasm_hash.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
    env.deployer().update_current_contract_wasm(new_wasm_hash);
    Ok(())
}
