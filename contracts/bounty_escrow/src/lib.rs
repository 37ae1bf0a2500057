//! # Bounty Escrow Contract
//!
//! Holds funds against a caller-chosen bounty id until they are released
//! to a contributor or returned to the depositor.
//!
//! ## Lifecycle
//!
//! 1. `init(admin, token)`: one-time setup; `admin` becomes the first Admin.
//! 2. `lock_funds`: depositor moves `amount` into custody under a new id.
//! 3. `release_funds`: an Operator or Admin pays the remaining balance to a
//!    recipient, minus the protocol fee when fees are enabled.
//!    `partial_release` pays part of it; the escrow stays open until the
//!    balance reaches zero.
//! 4. `refund`: once the deadline has passed (or immediately, on the Admin
//!    override path) some or all of the remaining balance goes back to the
//!    depositor.
//!
//! Every fund-moving entry point checks the pause flag, holds the
//! reentrancy guard, commits its bookkeeping and only then calls the token.
//! Batch variants validate every item before mutating anything; the first
//! failing item rejects the whole batch.

#![no_std]

mod escrow;
mod events;
mod invariants;

#[cfg(test)]
mod test_batch;
#[cfg(test)]
mod test_rbac;

pub use escrow::{Escrow, EscrowStatus, RefundRecord};
pub use escrow_core::fee::FeeConfig;
pub use escrow_core::rbac::Role;
pub use escrow_core::upgrade::MigrationState;

use escrow_core::batch::{self, Rejected};
use escrow_core::reentrancy_guard::ReentrancyGuard;
use escrow_core::{asset, fee, pause, rbac, storage, upgrade, CoreError, EVENT_VERSION};
use events::{
    emit_batch_completed, emit_funds_locked, emit_funds_refunded, emit_funds_released,
    emit_initialized, BatchCompleted, EscrowInitialized, FundsLocked, FundsRefunded,
    FundsReleased,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, BytesN,
    Env, Vec,
};

/// Code version written at `init`.
pub const VERSION: u32 = 1;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotFound = 3,
    AlreadyExists = 4,
    InvalidState = 5,
    InvalidAmount = 6,
    InvalidDeadline = 7,
    Unauthorized = 8,
    Paused = 9,
    ArithmeticOverflow = 10,
    InvalidFeeRate = 11,
    InvalidBatchSize = 12,
    DuplicateId = 13,
    LastAdmin = 14,
    InvalidToken = 15,
    InvalidVersion = 16,
    Reentrancy = 17,
}

impl From<Error> for u32 {
    fn from(err: Error) -> Self {
        err as u32
    }
}

impl From<CoreError> for Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotInitialized => Error::NotInitialized,
            CoreError::Unauthorized => Error::Unauthorized,
            CoreError::Paused => Error::Paused,
            CoreError::LastAdmin => Error::LastAdmin,
            CoreError::InvalidFeeRate => Error::InvalidFeeRate,
            CoreError::InvalidBatchSize => Error::InvalidBatchSize,
            CoreError::ArithmeticOverflow => Error::ArithmeticOverflow,
            CoreError::InvalidToken => Error::InvalidToken,
            CoreError::InvalidVersion => Error::InvalidVersion,
            CoreError::Reentrancy => Error::Reentrancy,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    Config,
    Escrow(u64),
    EscrowCount,
    /// Page `n` of the lock-order id index.
    EscrowIndex(u32),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub admin: Address,
    pub token: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LockFundsItem {
    pub bounty_id: u64,
    pub depositor: Address,
    pub amount: i128,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseFundsItem {
    pub bounty_id: u64,
    pub recipient: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundItem {
    pub bounty_id: u64,
    pub amount: i128,
}

/// First rejected item of a batch: its position and the `Error` code the
/// real call would fail with.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchFailure {
    pub index: u32,
    pub error: u32,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundEligibility {
    pub can_refund: bool,
    pub deadline_passed: bool,
    pub remaining_amount: i128,
    pub status: EscrowStatus,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvariantReport {
    pub healthy: bool,
    pub checked: u32,
    pub failed_ids: Vec<u64>,
    pub active_remaining: i128,
    pub custodial_balance: i128,
}

impl From<Rejected<Error>> for BatchFailure {
    fn from(rejected: Rejected<Error>) -> Self {
        Self {
            index: rejected.index,
            error: rejected.error.into(),
        }
    }
}

#[contract]
pub struct BountyEscrowContract;

#[contractimpl]
impl BountyEscrowContract {
    // ========================================================================
    // Setup
    // ========================================================================

    pub fn init(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Config) {
            return Err(Error::AlreadyInitialized);
        }
        asset::validate_token(&token)?;
        admin.require_auth();

        env.storage().instance().set(
            &DataKey::Config,
            &Config {
                admin: admin.clone(),
                token: token.clone(),
            },
        );
        rbac::bootstrap(&env, &admin);
        fee::init_config(&env, &admin);
        upgrade::init_version(&env, VERSION);
        storage::bump_instance(&env);

        emit_initialized(
            &env,
            EscrowInitialized {
                version: EVENT_VERSION,
                admin,
                token,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(())
    }

    pub fn get_config(env: Env) -> Result<Config, Error> {
        load_config(&env)
    }

    // ========================================================================
    // Escrow lifecycle
    // ========================================================================

    pub fn lock_funds(
        env: Env,
        depositor: Address,
        bounty_id: u64,
        amount: i128,
        deadline: u64,
    ) -> Result<(), Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        depositor.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        if deadline <= env.ledger().timestamp() {
            return Err(Error::InvalidDeadline);
        }
        if env.storage().persistent().has(&DataKey::Escrow(bounty_id)) {
            return Err(Error::AlreadyExists);
        }

        // EFFECTS: record exists before the token moves.
        let escrow = Escrow::new(&env, depositor.clone(), amount, deadline);
        invariants::assert_escrow(&escrow);
        save_escrow(&env, bounty_id, &escrow);
        index_escrow(&env, bounty_id)?;

        // INTERACTION
        token::Client::new(&env, &config.token).transfer(
            &depositor,
            &env.current_contract_address(),
            &amount,
        );

        emit_funds_locked(
            &env,
            FundsLocked {
                version: EVENT_VERSION,
                bounty_id,
                depositor,
                amount,
                deadline,
            },
        );
        Ok(())
    }

    /// Pays the whole remaining balance of `bounty_id` to `recipient`.
    /// Requires an Operator or Admin; returns the net amount received.
    pub fn release_funds(
        env: Env,
        caller: Address,
        bounty_id: u64,
        recipient: Address,
    ) -> Result<i128, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        rbac::require_operator(&env, &caller)?;

        let mut escrow = load_escrow(&env, bounty_id)?;
        let gross = escrow.release()?;
        invariants::assert_escrow(&escrow);
        save_escrow(&env, bounty_id, &escrow);

        let split = fee::disburse(&env, &config.token, &recipient, gross)?;

        emit_funds_released(
            &env,
            FundsReleased {
                version: EVENT_VERSION,
                bounty_id,
                recipient,
                net_amount: split.net,
                fee: split.fee,
                remaining_amount: 0,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(split.net)
    }

    /// Pays `amount` out of the remaining balance of `bounty_id`; the fee
    /// applies to `amount`. The escrow becomes Released once nothing
    /// remains. Requires an Operator or Admin; returns the net amount.
    pub fn partial_release(
        env: Env,
        caller: Address,
        bounty_id: u64,
        recipient: Address,
        amount: i128,
    ) -> Result<i128, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        rbac::require_operator(&env, &caller)?;

        let mut escrow = load_escrow(&env, bounty_id)?;
        let gross = escrow.release_partial(amount)?;
        invariants::assert_escrow(&escrow);
        save_escrow(&env, bounty_id, &escrow);

        let split = fee::disburse(&env, &config.token, &recipient, gross)?;

        emit_funds_released(
            &env,
            FundsReleased {
                version: EVENT_VERSION,
                bounty_id,
                recipient,
                net_amount: split.net,
                fee: split.fee,
                remaining_amount: escrow.remaining_amount,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(split.net)
    }

    /// Returns `amount` to the depositor.
    ///
    /// Without `admin_override` the deadline must have passed and `caller`
    /// must be the depositor, an Operator or an Admin. With it, `caller`
    /// must be an Admin and the deadline is ignored.
    pub fn refund(
        env: Env,
        caller: Address,
        bounty_id: u64,
        amount: i128,
        admin_override: bool,
    ) -> Result<(), Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        authorize_refund_caller(&env, &caller, admin_override)?;

        let mut escrow = load_escrow(&env, bounty_id)?;
        if !may_refund(&env, &caller, &escrow, admin_override) {
            return Err(Error::Unauthorized);
        }
        let record = escrow.refund(amount, env.ledger().timestamp(), admin_override)?;
        invariants::assert_escrow(&escrow);
        save_escrow(&env, bounty_id, &escrow);

        token::Client::new(&env, &config.token).transfer(
            &env.current_contract_address(),
            &record.recipient,
            &record.amount,
        );

        emit_funds_refunded(
            &env,
            FundsRefunded {
                version: EVENT_VERSION,
                bounty_id,
                amount: record.amount,
                recipient: record.recipient,
                remaining_amount: escrow.remaining_amount,
                admin_override,
                timestamp: record.timestamp,
            },
        );
        Ok(())
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    /// Locks every item or none. Returns the number of escrows created.
    ///
    /// A rejected batch returns only the error. The failing index goes to
    /// `log!`, which release builds compile out; `check_batch_lock` reports it.
    pub fn batch_lock_funds(env: Env, items: Vec<LockFundsItem>) -> Result<u32, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        batch::check_size(items.len())?;

        let total = plan_lock(&env, &items).map_err(|r| r.log(&env))?;

        // Each distinct depositor authorizes once.
        let mut seen: Vec<Address> = Vec::new(&env);
        for item in items.iter() {
            if !seen.contains(&item.depositor) {
                item.depositor.require_auth();
                seen.push_back(item.depositor.clone());
            }
        }

        for item in items.iter() {
            let escrow = Escrow::new(&env, item.depositor.clone(), item.amount, item.deadline);
            invariants::assert_escrow(&escrow);
            save_escrow(&env, item.bounty_id, &escrow);
            index_escrow(&env, item.bounty_id)?;
        }

        let client = token::Client::new(&env, &config.token);
        let custody = env.current_contract_address();
        for item in items.iter() {
            client.transfer(&item.depositor, &custody, &item.amount);
            emit_funds_locked(
                &env,
                FundsLocked {
                    version: EVENT_VERSION,
                    bounty_id: item.bounty_id,
                    depositor: item.depositor.clone(),
                    amount: item.amount,
                    deadline: item.deadline,
                },
            );
        }

        emit_batch_completed(
            &env,
            BatchCompleted {
                version: EVENT_VERSION,
                kind: symbol_short!("lock"),
                count: items.len(),
                total_amount: total,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(items.len())
    }

    /// Releases every item or none. Returns the number of escrows released.
    ///
    /// A rejected batch returns only the error. The failing index goes to
    /// `log!`, which release builds compile out; `check_batch_release` reports it.
    pub fn batch_release_funds(
        env: Env,
        caller: Address,
        items: Vec<ReleaseFundsItem>,
    ) -> Result<u32, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        rbac::require_operator(&env, &caller)?;
        batch::check_size(items.len())?;

        let planned = plan_release(&env, &items).map_err(|r| r.log(&env))?;

        let mut total: i128 = 0;
        for (item, (escrow, gross)) in items.iter().zip(planned.iter()) {
            save_escrow(&env, item.bounty_id, &escrow);
            total = total
                .checked_add(gross)
                .ok_or(Error::ArithmeticOverflow)?;
        }

        for (item, (_, gross)) in items.iter().zip(planned.iter()) {
            let split = fee::disburse(&env, &config.token, &item.recipient, gross)?;
            emit_funds_released(
                &env,
                FundsReleased {
                    version: EVENT_VERSION,
                    bounty_id: item.bounty_id,
                    recipient: item.recipient.clone(),
                    net_amount: split.net,
                    fee: split.fee,
                    remaining_amount: 0,
                    timestamp: env.ledger().timestamp(),
                },
            );
        }

        emit_batch_completed(
            &env,
            BatchCompleted {
                version: EVENT_VERSION,
                kind: symbol_short!("release"),
                count: items.len(),
                total_amount: total,
                timestamp: env.ledger().timestamp(),
            },
        );
        Ok(items.len())
    }

    /// Refunds every item or none, under the same rules as `refund`.
    ///
    /// A rejected batch returns only the error. The failing index goes to
    /// `log!`, which release builds compile out; `check_batch_refund` reports it.
    pub fn batch_refund(
        env: Env,
        caller: Address,
        items: Vec<RefundItem>,
        admin_override: bool,
    ) -> Result<u32, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        authorize_refund_caller(&env, &caller, admin_override)?;
        batch::check_size(items.len())?;

        let planned =
            plan_refund(&env, &caller, &items, admin_override).map_err(|r| r.log(&env))?;

        let mut total: i128 = 0;
        for (item, escrow) in items.iter().zip(planned.iter()) {
            save_escrow(&env, item.bounty_id, &escrow);
            total = total
                .checked_add(item.amount)
                .ok_or(Error::ArithmeticOverflow)?;
        }

        let client = token::Client::new(&env, &config.token);
        let custody = env.current_contract_address();
        let now = env.ledger().timestamp();
        for (item, escrow) in items.iter().zip(planned.iter()) {
            client.transfer(&custody, &escrow.depositor, &item.amount);
            emit_funds_refunded(
                &env,
                FundsRefunded {
                    version: EVENT_VERSION,
                    bounty_id: item.bounty_id,
                    amount: item.amount,
                    recipient: escrow.depositor.clone(),
                    remaining_amount: escrow.remaining_amount,
                    admin_override,
                    timestamp: now,
                },
            );
        }

        emit_batch_completed(
            &env,
            BatchCompleted {
                version: EVENT_VERSION,
                kind: symbol_short!("refund"),
                count: items.len(),
                total_amount: total,
                timestamp: now,
            },
        );
        Ok(items.len())
    }

    /// Dry run of `batch_lock_funds`: the first item that would be
    /// rejected, or `None` when the batch would succeed. Batch-level
    /// problems (size, pause) are returned as `Err`.
    pub fn check_batch_lock(
        env: Env,
        items: Vec<LockFundsItem>,
    ) -> Result<Option<BatchFailure>, Error> {
        load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        batch::check_size(items.len())?;
        Ok(plan_lock(&env, &items).err().map(BatchFailure::from))
    }

    pub fn check_batch_release(
        env: Env,
        caller: Address,
        items: Vec<ReleaseFundsItem>,
    ) -> Result<Option<BatchFailure>, Error> {
        load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        if !rbac::is_operator(&env, &caller) {
            return Err(Error::Unauthorized);
        }
        batch::check_size(items.len())?;
        Ok(plan_release(&env, &items).err().map(BatchFailure::from))
    }

    pub fn check_batch_refund(
        env: Env,
        caller: Address,
        items: Vec<RefundItem>,
        admin_override: bool,
    ) -> Result<Option<BatchFailure>, Error> {
        load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        if admin_override && !rbac::is_admin(&env, &caller) {
            return Err(Error::Unauthorized);
        }
        batch::check_size(items.len())?;
        Ok(plan_refund(&env, &caller, &items, admin_override)
            .err()
            .map(BatchFailure::from))
    }

    // ========================================================================
    // Roles & pause
    // ========================================================================

    pub fn grant_role(env: Env, caller: Address, target: Address, role: Role) -> Result<(), Error> {
        load_config(&env)?;
        rbac::grant_role(&env, &caller, &target, role)?;
        Ok(())
    }

    pub fn revoke_role(env: Env, caller: Address, target: Address) -> Result<(), Error> {
        load_config(&env)?;
        rbac::revoke_role(&env, &caller, &target)?;
        Ok(())
    }

    pub fn has_role(env: Env, target: Address, role: Role) -> bool {
        rbac::has_role(&env, &target, role)
    }

    pub fn get_role(env: Env, target: Address) -> Option<Role> {
        rbac::get_role(&env, &target)
    }

    pub fn pause_contract(env: Env, caller: Address) -> Result<(), Error> {
        load_config(&env)?;
        pause::pause(&env, &caller)?;
        Ok(())
    }

    pub fn unpause_contract(env: Env, caller: Address) -> Result<(), Error> {
        load_config(&env)?;
        pause::unpause(&env, &caller)?;
        Ok(())
    }

    pub fn is_paused(env: Env) -> bool {
        pause::is_paused(&env)
    }

    // ========================================================================
    // Fees
    // ========================================================================

    pub fn update_fee_config(
        env: Env,
        caller: Address,
        fee_rate: Option<i128>,
        max_fee_rate: Option<i128>,
        fee_recipient: Option<Address>,
        fee_enabled: Option<bool>,
    ) -> Result<FeeConfig, Error> {
        load_config(&env)?;
        let config =
            fee::update_config(&env, &caller, fee_rate, max_fee_rate, fee_recipient, fee_enabled)?;
        Ok(config)
    }

    pub fn get_fee_config(env: Env) -> Result<FeeConfig, Error> {
        Ok(fee::get_config(&env)?)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_escrow_info(env: Env, bounty_id: u64) -> Result<Escrow, Error> {
        load_escrow(&env, bounty_id)
    }

    pub fn get_refund_history(env: Env, bounty_id: u64) -> Result<Vec<RefundRecord>, Error> {
        Ok(load_escrow(&env, bounty_id)?.refund_history)
    }

    pub fn get_refund_eligibility(env: Env, bounty_id: u64) -> Result<RefundEligibility, Error> {
        let escrow = load_escrow(&env, bounty_id)?;
        let deadline_passed = env.ledger().timestamp() >= escrow.deadline;
        Ok(RefundEligibility {
            can_refund: deadline_passed && !escrow.status.is_terminal(),
            deadline_passed,
            remaining_amount: escrow.remaining_amount,
            status: escrow.status,
        })
    }

    /// Token balance held by this contract.
    pub fn get_balance(env: Env) -> Result<i128, Error> {
        let config = load_config(&env)?;
        Ok(token::Client::new(&env, &config.token).balance(&env.current_contract_address()))
    }

    /// Every id in lock order. Reads one entry per index page; large
    /// deployments should walk `get_escrow_ids_page` instead.
    pub fn get_escrow_ids(env: Env) -> Vec<u64> {
        escrow_index(&env)
    }

    pub fn get_escrow_count(env: Env) -> u32 {
        escrow_count(&env)
    }

    /// Up to `INDEX_PAGE_SIZE` ids; empty past the last page.
    pub fn get_escrow_ids_page(env: Env, page: u32) -> Vec<u64> {
        escrow_index_page(&env, page)
    }

    pub fn verify_state(env: Env, bounty_id: u64) -> Result<bool, Error> {
        Ok(invariants::check_escrow(&load_escrow(&env, bounty_id)?))
    }

    /// Checks every record, then compares the balance still owed on active
    /// escrows against what the contract actually holds.
    pub fn verify_all_invariants(env: Env) -> Result<InvariantReport, Error> {
        let config = load_config(&env)?;
        let custodial_balance =
            token::Client::new(&env, &config.token).balance(&env.current_contract_address());

        let mut failed_ids = Vec::new(&env);
        let mut checked: u32 = 0;
        let mut active_remaining: i128 = 0;
        let mut overflowed = false;
        for bounty_id in escrow_index(&env).iter() {
            let escrow = match read_escrow(&env, bounty_id) {
                Some(escrow) => escrow,
                None => {
                    failed_ids.push_back(bounty_id);
                    continue;
                }
            };
            checked += 1;
            if !invariants::check_escrow(&escrow) {
                failed_ids.push_back(bounty_id);
            }
            if !escrow.status.is_terminal() {
                match active_remaining.checked_add(escrow.remaining_amount) {
                    Some(sum) => active_remaining = sum,
                    None => overflowed = true,
                }
            }
        }

        Ok(InvariantReport {
            healthy: failed_ids.is_empty() && !overflowed && active_remaining <= custodial_balance,
            checked,
            failed_ids,
            active_remaining,
            custodial_balance,
        })
    }

    // ========================================================================
    // Versioning & upgrades
    // ========================================================================

    pub fn get_version(env: Env) -> u32 {
        upgrade::get_version(&env)
    }

    pub fn get_previous_version(env: Env) -> Option<u32> {
        upgrade::get_previous_version(&env)
    }

    pub fn get_migration_state(env: Env) -> Option<MigrationState> {
        upgrade::get_migration_state(&env)
    }

    pub fn migrate(
        env: Env,
        caller: Address,
        target_version: u32,
        migration_hash: BytesN<32>,
    ) -> Result<(), Error> {
        load_config(&env)?;
        upgrade::migrate(&env, &caller, target_version, migration_hash, migration_step)?;
        Ok(())
    }

    pub fn upgrade(env: Env, caller: Address, new_wasm_hash: BytesN<32>) -> Result<(), Error> {
        load_config(&env)?;
        upgrade::upgrade(&env, &caller, new_wasm_hash)?;
        Ok(())
    }
}

// ============================================================================
// Storage helpers
// ============================================================================

fn load_config(env: &Env) -> Result<Config, Error> {
    let config = env
        .storage()
        .instance()
        .get(&DataKey::Config)
        .ok_or(Error::NotInitialized)?;
    storage::bump_instance(env);
    Ok(config)
}

fn read_escrow(env: &Env, bounty_id: u64) -> Option<Escrow> {
    env.storage().persistent().get(&DataKey::Escrow(bounty_id))
}

fn load_escrow(env: &Env, bounty_id: u64) -> Result<Escrow, Error> {
    read_escrow(env, bounty_id).ok_or(Error::NotFound)
}

fn save_escrow(env: &Env, bounty_id: u64, escrow: &Escrow) {
    let key = DataKey::Escrow(bounty_id);
    env.storage().persistent().set(&key, escrow);
    storage::bump_persistent(env, &key);
}

fn escrow_count(env: &Env) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::EscrowCount)
        .unwrap_or(0)
}

fn escrow_index_page(env: &Env, page: u32) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::EscrowIndex(page))
        .unwrap_or_else(|| Vec::new(env))
}

fn escrow_index(env: &Env) -> Vec<u64> {
    let mut ids = Vec::new(env);
    for page in 0..storage::index_pages(escrow_count(env)) {
        ids.append(&escrow_index_page(env, page));
    }
    ids
}

fn index_escrow(env: &Env, bounty_id: u64) -> Result<(), Error> {
    let count = escrow_count(env);
    let next = count.checked_add(1).ok_or(Error::ArithmeticOverflow)?;
    let page = storage::index_page(count);
    let mut ids = escrow_index_page(env, page);
    ids.push_back(bounty_id);
    env.storage().persistent().set(&DataKey::EscrowIndex(page), &ids);
    storage::bump_persistent(env, &DataKey::EscrowIndex(page));
    env.storage().persistent().set(&DataKey::EscrowCount, &next);
    storage::bump_persistent(env, &DataKey::EscrowCount);
    Ok(())
}

/// v2 refreshes the TTL of every escrow record and the index.
fn migration_step(env: &Env, next_version: u32) -> Result<(), CoreError> {
    match next_version {
        2 => {
            for bounty_id in escrow_index(env).iter() {
                let key = DataKey::Escrow(bounty_id);
                if env.storage().persistent().has(&key) {
                    storage::bump_persistent(env, &key);
                }
            }
            for page in 0..storage::index_pages(escrow_count(env)) {
                storage::bump_persistent(env, &DataKey::EscrowIndex(page));
            }
            if env.storage().persistent().has(&DataKey::EscrowCount) {
                storage::bump_persistent(env, &DataKey::EscrowCount);
            }
            Ok(())
        }
        _ => Err(CoreError::InvalidVersion),
    }
}

// ============================================================================
// Authorization & batch planning
// ============================================================================

fn authorize_refund_caller(env: &Env, caller: &Address, admin_override: bool) -> Result<(), Error> {
    if admin_override {
        rbac::require_admin(env, caller)?;
    } else {
        caller.require_auth();
    }
    Ok(())
}

fn may_refund(env: &Env, caller: &Address, escrow: &Escrow, admin_override: bool) -> bool {
    admin_override || *caller == escrow.depositor || rbac::is_operator(env, caller)
}

/// Validates a lock batch without touching storage; returns the total.
fn plan_lock(env: &Env, items: &Vec<LockFundsItem>) -> Result<i128, Rejected<Error>> {
    let now = env.ledger().timestamp();
    let mut ids: Vec<u64> = Vec::new(env);
    let mut total: i128 = 0;

    for (index, item) in (0u32..).zip(items.iter()) {
        if item.amount <= 0 {
            return Err(Rejected::at(index, Error::InvalidAmount));
        }
        if item.deadline <= now {
            return Err(Rejected::at(index, Error::InvalidDeadline));
        }
        if ids.contains(&item.bounty_id) {
            return Err(Rejected::at(index, Error::DuplicateId));
        }
        if env
            .storage()
            .persistent()
            .has(&DataKey::Escrow(item.bounty_id))
        {
            return Err(Rejected::at(index, Error::AlreadyExists));
        }
        total = total
            .checked_add(item.amount)
            .ok_or(Rejected::at(index, Error::ArithmeticOverflow))?;
        ids.push_back(item.bounty_id);
    }
    Ok(total)
}

/// Applies each release to an in-memory copy; nothing is persisted.
fn plan_release(
    env: &Env,
    items: &Vec<ReleaseFundsItem>,
) -> Result<Vec<(Escrow, i128)>, Rejected<Error>> {
    let mut ids: Vec<u64> = Vec::new(env);
    let mut planned = Vec::new(env);

    for (index, item) in (0u32..).zip(items.iter()) {
        if ids.contains(&item.bounty_id) {
            return Err(Rejected::at(index, Error::DuplicateId));
        }
        let mut escrow = read_escrow(env, item.bounty_id)
            .ok_or(Rejected::at(index, Error::NotFound))?;
        let gross = escrow
            .release()
            .map_err(|error| Rejected::at(index, error))?;
        invariants::assert_escrow(&escrow);
        planned.push_back((escrow, gross));
        ids.push_back(item.bounty_id);
    }
    Ok(planned)
}

fn plan_refund(
    env: &Env,
    caller: &Address,
    items: &Vec<RefundItem>,
    admin_override: bool,
) -> Result<Vec<Escrow>, Rejected<Error>> {
    let now = env.ledger().timestamp();
    let mut ids: Vec<u64> = Vec::new(env);
    let mut planned = Vec::new(env);

    for (index, item) in (0u32..).zip(items.iter()) {
        if ids.contains(&item.bounty_id) {
            return Err(Rejected::at(index, Error::DuplicateId));
        }
        let mut escrow = read_escrow(env, item.bounty_id)
            .ok_or(Rejected::at(index, Error::NotFound))?;
        if !may_refund(env, caller, &escrow, admin_override) {
            return Err(Rejected::at(index, Error::Unauthorized));
        }
        escrow
            .refund(item.amount, now, admin_override)
            .map_err(|error| Rejected::at(index, error))?;
        invariants::assert_escrow(&escrow);
        planned.push_back(escrow);
        ids.push_back(item.bounty_id);
    }
    Ok(planned)
}
