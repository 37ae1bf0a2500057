//! # Program Escrow Contract
//!
//! Pooled funding for programs (hackathons, grant rounds) identified by a
//! string id. Funds come in through `lock_program_funds` and leave through
//! either:
//!
//! - direct payouts (`single_payout`, `batch_payout`) made by an Operator
//!   or Admin from the balance not reserved by schedules, or
//! - release schedules: an Operator reserves an amount for a recipient with
//!   a release time; once that time is reached anyone may trigger it.
//!
//! A program created with a deadline can be expired by anyone once the
//! deadline passes; its unreserved balance goes back to the depositor.
//! Admins may bound deposit and payout sizes with `update_amount_limits`.
//!
//! For every program `remaining_balance = total_funds - Σ outflows`, where
//! outflows (payouts and expiry refunds) are recorded gross of protocol
//! fees.

#![no_std]

mod events;
mod limits;
mod program;

#[cfg(test)]
mod test_schedules;

pub use escrow_core::fee::FeeConfig;
pub use escrow_core::rbac::Role;
pub use escrow_core::upgrade::MigrationState;
pub use limits::AmountLimits;
pub use program::{OutflowKind, PayoutRecord, ProgramData, ReleaseSchedule};

use escrow_core::batch::{self, Rejected};
use escrow_core::reentrancy_guard::ReentrancyGuard;
use escrow_core::{asset, fee, pause, rbac, storage, upgrade, CoreError, EVENT_VERSION};
use events::{
    emit_amount_limits_updated, emit_batch_payout, emit_initialized, emit_payout,
    emit_program_expired, emit_program_funded, emit_schedule_created, emit_schedule_released,
    AmountLimitsUpdated, BatchPayout, ContractInitialized, Payout, ProgramExpired,
    ProgramFunded, ScheduleCreated, ScheduleReleased,
};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, token, Address, BytesN, Env, String,
    Vec,
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
    Program(String),
    Schedule(String, u64),
    ProgramCount,
    /// Page `n` of the creation-order id index.
    ProgramIndex(u32),
    AmountLimits,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub admin: Address,
    pub token: Address,
}

#[contract]
pub struct ProgramEscrowContract;

#[contractimpl]
impl ProgramEscrowContract {
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
            ContractInitialized {
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
    // Funding
    // ========================================================================

    /// Creates the program on its first deposit; later deposits top it up.
    ///
    /// `deadline` is fixed at creation and must lie in the future. A top-up
    /// passes `None` or the stored deadline; anything else is
    /// `InvalidDeadline`.
    pub fn lock_program_funds(
        env: Env,
        depositor: Address,
        program_id: String,
        amount: i128,
        deadline: Option<u64>,
    ) -> Result<ProgramData, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        depositor.require_auth();
        limits::get(&env).check_lock(amount)?;

        let now = env.ledger().timestamp();
        let mut program = match read_program(&env, &program_id) {
            Some(program) => {
                if deadline.is_some() && deadline != program.deadline {
                    return Err(Error::InvalidDeadline);
                }
                program
            }
            None => {
                if matches!(deadline, Some(at) if at <= now) {
                    return Err(Error::InvalidDeadline);
                }
                index_program(&env, &program_id)?;
                ProgramData::new(&env, program_id.clone(), depositor.clone(), deadline, now)
            }
        };
        program.fund(amount, now)?;
        program::assert_program(&program);
        save_program(&env, &program);

        token::Client::new(&env, &config.token).transfer(
            &depositor,
            &env.current_contract_address(),
            &amount,
        );

        emit_program_funded(
            &env,
            ProgramFunded {
                version: EVENT_VERSION,
                program_id,
                depositor,
                amount,
                total_funds: program.total_funds,
                remaining_balance: program.remaining_balance,
            },
        );
        Ok(program)
    }

    // ========================================================================
    // Release schedules
    // ========================================================================

    /// Reserves `amount` for `recipient`, releasable from `release_timestamp`.
    pub fn create_release_schedule(
        env: Env,
        caller: Address,
        program_id: String,
        recipient: Address,
        amount: i128,
        release_timestamp: u64,
    ) -> Result<u64, Error> {
        load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        rbac::require_operator(&env, &caller)?;
        limits::get(&env).check_payout(amount)?;

        let mut program = load_program(&env, &program_id)?;
        if release_timestamp <= env.ledger().timestamp() {
            return Err(Error::InvalidDeadline);
        }
        let schedule_id = program.reserve(amount)?;
        program::assert_program(&program);

        let schedule = ReleaseSchedule {
            schedule_id,
            recipient: recipient.clone(),
            amount,
            release_timestamp,
            released: false,
            released_at: None,
        };
        save_schedule(&env, &program_id, &schedule);
        save_program(&env, &program);

        emit_schedule_created(
            &env,
            ScheduleCreated {
                version: EVENT_VERSION,
                program_id,
                schedule_id,
                recipient,
                amount,
                release_timestamp,
            },
        );
        Ok(schedule_id)
    }

    /// Pays out a due schedule. Anyone may call this; the recipient was
    /// fixed when the schedule was created. Returns the net amount paid.
    pub fn release_schedule(env: Env, program_id: String, schedule_id: u64) -> Result<i128, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;

        let mut program = load_program(&env, &program_id)?;
        let mut schedule = load_schedule(&env, &program_id, schedule_id)?;
        let now = env.ledger().timestamp();
        program.settle(&mut schedule, now)?;
        program::assert_program(&program);

        save_schedule(&env, &program_id, &schedule);
        save_program(&env, &program);

        let split = fee::disburse(&env, &config.token, &schedule.recipient, schedule.amount)?;
        emit_schedule_released(
            &env,
            ScheduleReleased {
                version: EVENT_VERSION,
                program_id,
                schedule_id,
                recipient: schedule.recipient,
                net_amount: split.net,
                fee: split.fee,
                timestamp: now,
            },
        );
        Ok(split.net)
    }

    /// Releases every listed schedule or none. Returns the gross total,
    /// which always equals the drop in `remaining_balance`.
    ///
    /// A rejected batch returns only the error. The failing index goes to
    /// `log!`, which release builds compile out; `get_due_schedules` lists
    /// the ids that can be released now.
    pub fn batch_release_schedules(
        env: Env,
        program_id: String,
        schedule_ids: Vec<u64>,
    ) -> Result<i128, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        batch::check_size(schedule_ids.len())?;

        let mut program = load_program(&env, &program_id)?;
        let before = program.remaining_balance;
        let now = env.ledger().timestamp();

        let mut settled: Vec<ReleaseSchedule> = Vec::new(&env);
        let mut seen: Vec<u64> = Vec::new(&env);
        for (index, schedule_id) in (0u32..).zip(schedule_ids.iter()) {
            let planned = plan_schedule(&env, &program_id, &mut program, &seen, schedule_id, now)
                .map_err(|error| Rejected::at(index, error).log(&env))?;
            settled.push_back(planned);
            seen.push_back(schedule_id);
        }
        program::assert_program(&program);

        for schedule in settled.iter() {
            save_schedule(&env, &program_id, &schedule);
        }
        save_program(&env, &program);

        let total = before
            .checked_sub(program.remaining_balance)
            .ok_or(Error::ArithmeticOverflow)?;
        for schedule in settled.iter() {
            let split = fee::disburse(&env, &config.token, &schedule.recipient, schedule.amount)?;
            emit_schedule_released(
                &env,
                ScheduleReleased {
                    version: EVENT_VERSION,
                    program_id: program_id.clone(),
                    schedule_id: schedule.schedule_id,
                    recipient: schedule.recipient.clone(),
                    net_amount: split.net,
                    fee: split.fee,
                    timestamp: now,
                },
            );
        }
        Ok(total)
    }

    // ========================================================================
    // Direct payouts
    // ========================================================================

    pub fn single_payout(
        env: Env,
        caller: Address,
        program_id: String,
        recipient: Address,
        amount: i128,
    ) -> Result<ProgramData, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        rbac::require_operator(&env, &caller)?;
        limits::get(&env).check_payout(amount)?;

        let mut program = load_program(&env, &program_id)?;
        program.pay(recipient.clone(), amount, env.ledger().timestamp())?;
        program::assert_program(&program);
        save_program(&env, &program);

        let split = fee::disburse(&env, &config.token, &recipient, amount)?;
        emit_payout(
            &env,
            Payout {
                version: EVENT_VERSION,
                program_id,
                recipient,
                net_amount: split.net,
                fee: split.fee,
                remaining_balance: program.remaining_balance,
            },
        );
        Ok(program)
    }

    /// Pays `amounts[i]` to `recipients[i]` for every `i`, or nothing.
    ///
    /// A rejected batch returns only the error; the failing index goes to
    /// `log!`, which release builds compile out.
    pub fn batch_payout(
        env: Env,
        caller: Address,
        program_id: String,
        recipients: Vec<Address>,
        amounts: Vec<i128>,
    ) -> Result<ProgramData, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;
        rbac::require_operator(&env, &caller)?;
        if recipients.len() != amounts.len() {
            return Err(Error::InvalidBatchSize);
        }
        batch::check_size(recipients.len())?;

        let limits = limits::get(&env);
        let mut program = load_program(&env, &program_id)?;
        let before = program.remaining_balance;
        let now = env.ledger().timestamp();
        for (index, (recipient, amount)) in (0u32..).zip(recipients.iter().zip(amounts.iter())) {
            limits
                .check_payout(amount)
                .and_then(|_| program.pay(recipient, amount, now))
                .map_err(|error| Rejected::at(index, error).log(&env))?;
        }
        program::assert_program(&program);
        save_program(&env, &program);

        for (recipient, amount) in recipients.iter().zip(amounts.iter()) {
            let split = fee::disburse(&env, &config.token, &recipient, amount)?;
            emit_payout(
                &env,
                Payout {
                    version: EVENT_VERSION,
                    program_id: program_id.clone(),
                    recipient,
                    net_amount: split.net,
                    fee: split.fee,
                    remaining_balance: program.remaining_balance,
                },
            );
        }

        emit_batch_payout(
            &env,
            BatchPayout {
                version: EVENT_VERSION,
                program_id,
                count: recipients.len(),
                total_amount: before - program.remaining_balance,
                remaining_balance: program.remaining_balance,
            },
        );
        Ok(program)
    }

    // ========================================================================
    // Expiry & limits
    // ========================================================================

    /// Returns the unreserved balance of a program to its depositor once the
    /// program deadline has passed. Anyone may call this; pending schedules
    /// keep their funds. Returns the amount refunded.
    pub fn expire_program(env: Env, program_id: String) -> Result<i128, Error> {
        let config = load_config(&env)?;
        pause::ensure_not_paused(&env)?;
        let _guard = ReentrancyGuard::acquire(&env)?;

        let mut program = load_program(&env, &program_id)?;
        let now = env.ledger().timestamp();
        let refunded = program.expire(now)?;
        program::assert_program(&program);
        save_program(&env, &program);

        token::Client::new(&env, &config.token).transfer(
            &env.current_contract_address(),
            &program.depositor,
            &refunded,
        );

        emit_program_expired(
            &env,
            ProgramExpired {
                version: EVENT_VERSION,
                program_id,
                depositor: program.depositor,
                refunded,
                remaining_balance: program.remaining_balance,
                timestamp: now,
            },
        );
        Ok(refunded)
    }

    /// Admin only. Bounds apply to new deposits, schedules and payouts.
    pub fn update_amount_limits(
        env: Env,
        caller: Address,
        min_lock_amount: i128,
        max_lock_amount: i128,
        min_payout: i128,
        max_payout: i128,
    ) -> Result<AmountLimits, Error> {
        load_config(&env)?;
        rbac::require_admin(&env, &caller)?;

        let limits = AmountLimits {
            min_lock_amount,
            max_lock_amount,
            min_payout,
            max_payout,
        };
        limits.validate()?;
        limits::set(&env, &limits);

        emit_amount_limits_updated(
            &env,
            AmountLimitsUpdated {
                version: EVENT_VERSION,
                limits: limits.clone(),
                updated_by: caller,
            },
        );
        Ok(limits)
    }

    pub fn get_amount_limits(env: Env) -> AmountLimits {
        limits::get(&env)
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

    pub fn get_program(env: Env, program_id: String) -> Result<ProgramData, Error> {
        load_program(&env, &program_id)
    }

    /// Every program id in creation order, read page by page.
    pub fn get_program_ids(env: Env) -> Vec<String> {
        program_index(&env)
    }

    pub fn get_program_count(env: Env) -> u32 {
        program_count(&env)
    }

    pub fn get_program_ids_page(env: Env, page: u32) -> Vec<String> {
        program_index_page(&env, page)
    }

    pub fn get_schedule(
        env: Env,
        program_id: String,
        schedule_id: u64,
    ) -> Result<ReleaseSchedule, Error> {
        load_schedule(&env, &program_id, schedule_id)
    }

    pub fn get_schedules(env: Env, program_id: String) -> Result<Vec<ReleaseSchedule>, Error> {
        let program = load_program(&env, &program_id)?;
        let mut schedules = Vec::new(&env);
        for schedule_id in 0..program.next_schedule_id {
            schedules.push_back(load_schedule(&env, &program_id, schedule_id)?);
        }
        Ok(schedules)
    }

    /// Unreleased schedules whose release time has been reached, in id
    /// order. These are the ids `batch_release_schedules` will accept.
    pub fn get_due_schedules(env: Env, program_id: String) -> Result<Vec<ReleaseSchedule>, Error> {
        let program = load_program(&env, &program_id)?;
        let now = env.ledger().timestamp();
        let mut due = Vec::new(&env);
        for schedule_id in 0..program.next_schedule_id {
            let schedule = load_schedule(&env, &program_id, schedule_id)?;
            if !schedule.released && schedule.release_timestamp <= now {
                due.push_back(schedule);
            }
        }
        Ok(due)
    }

    pub fn get_pending_total(env: Env, program_id: String) -> Result<i128, Error> {
        Ok(load_program(&env, &program_id)?.pending_schedules)
    }

    pub fn get_payout_history(env: Env, program_id: String) -> Result<Vec<PayoutRecord>, Error> {
        Ok(load_program(&env, &program_id)?.payout_history)
    }

    /// Token balance held by this contract across all programs.
    pub fn get_balance(env: Env) -> Result<i128, Error> {
        let config = load_config(&env)?;
        Ok(token::Client::new(&env, &config.token).balance(&env.current_contract_address()))
    }

    /// Re-derives the program's accounting, including the pending total
    /// from its stored schedules.
    pub fn verify_program(env: Env, program_id: String) -> Result<bool, Error> {
        let program = load_program(&env, &program_id)?;
        if program::violation(&program).is_some() {
            return Ok(false);
        }

        let mut pending: i128 = 0;
        for schedule_id in 0..program.next_schedule_id {
            let schedule = match read_schedule(&env, &program_id, schedule_id) {
                Some(schedule) => schedule,
                None => return Ok(false),
            };
            if !schedule.released {
                pending = match pending.checked_add(schedule.amount) {
                    Some(sum) => sum,
                    None => return Ok(false),
                };
            }
        }
        Ok(pending == program.pending_schedules)
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

fn read_program(env: &Env, program_id: &String) -> Option<ProgramData> {
    env.storage()
        .persistent()
        .get(&DataKey::Program(program_id.clone()))
}

fn load_program(env: &Env, program_id: &String) -> Result<ProgramData, Error> {
    read_program(env, program_id).ok_or(Error::NotFound)
}

fn save_program(env: &Env, program: &ProgramData) {
    let key = DataKey::Program(program.program_id.clone());
    env.storage().persistent().set(&key, program);
    storage::bump_persistent(env, &key);
}

fn read_schedule(env: &Env, program_id: &String, schedule_id: u64) -> Option<ReleaseSchedule> {
    env.storage()
        .persistent()
        .get(&DataKey::Schedule(program_id.clone(), schedule_id))
}

fn load_schedule(env: &Env, program_id: &String, schedule_id: u64) -> Result<ReleaseSchedule, Error> {
    read_schedule(env, program_id, schedule_id).ok_or(Error::NotFound)
}

fn save_schedule(env: &Env, program_id: &String, schedule: &ReleaseSchedule) {
    let key = DataKey::Schedule(program_id.clone(), schedule.schedule_id);
    env.storage().persistent().set(&key, schedule);
    storage::bump_persistent(env, &key);
}

fn program_count(env: &Env) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::ProgramCount)
        .unwrap_or(0)
}

fn program_index_page(env: &Env, page: u32) -> Vec<String> {
    env.storage()
        .persistent()
        .get(&DataKey::ProgramIndex(page))
        .unwrap_or_else(|| Vec::new(env))
}

fn program_index(env: &Env) -> Vec<String> {
    let mut ids = Vec::new(env);
    for page in 0..storage::index_pages(program_count(env)) {
        ids.append(&program_index_page(env, page));
    }
    ids
}

fn index_program(env: &Env, program_id: &String) -> Result<(), Error> {
    let count = program_count(env);
    let next = count.checked_add(1).ok_or(Error::ArithmeticOverflow)?;
    let page = storage::index_page(count);
    let mut ids = program_index_page(env, page);
    ids.push_back(program_id.clone());
    env.storage().persistent().set(&DataKey::ProgramIndex(page), &ids);
    storage::bump_persistent(env, &DataKey::ProgramIndex(page));
    env.storage().persistent().set(&DataKey::ProgramCount, &next);
    storage::bump_persistent(env, &DataKey::ProgramCount);
    Ok(())
}

/// v2 refreshes the TTL of every program, its schedules and the index.
fn migration_step(env: &Env, next_version: u32) -> Result<(), CoreError> {
    match next_version {
        2 => {
            for program_id in program_index(env).iter() {
                let Some(program) = read_program(env, &program_id) else {
                    continue;
                };
                storage::bump_persistent(env, &DataKey::Program(program_id.clone()));
                for schedule_id in 0..program.next_schedule_id {
                    let key = DataKey::Schedule(program_id.clone(), schedule_id);
                    if env.storage().persistent().has(&key) {
                        storage::bump_persistent(env, &key);
                    }
                }
            }
            for page in 0..storage::index_pages(program_count(env)) {
                storage::bump_persistent(env, &DataKey::ProgramIndex(page));
            }
            if env.storage().persistent().has(&DataKey::ProgramCount) {
                storage::bump_persistent(env, &DataKey::ProgramCount);
            }
            Ok(())
        }
        _ => Err(CoreError::InvalidVersion),
    }
}

/// Settles one schedule of a batch against the in-memory program.
fn plan_schedule(
    env: &Env,
    program_id: &String,
    program: &mut ProgramData,
    seen: &Vec<u64>,
    schedule_id: u64,
    now: u64,
) -> Result<ReleaseSchedule, Error> {
    if seen.contains(&schedule_id) {
        return Err(Error::DuplicateId);
    }
    let mut schedule = load_schedule(env, program_id, schedule_id)?;
    program.settle(&mut schedule, now)?;
    Ok(schedule)
}
