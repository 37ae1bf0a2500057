use soroban_sdk::{contracttype, symbol_short, Address, Env, String};

use crate::limits::AmountLimits;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContractInitialized {
    pub version: u32,
    pub admin: Address,
    pub token: Address,
    pub timestamp: u64,
}

pub fn emit_initialized(env: &Env, event: ContractInitialized) {
    env.events().publish((symbol_short!("init"),), event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramFunded {
    pub version: u32,
    pub program_id: String,
    pub depositor: Address,
    pub amount: i128,
    pub total_funds: i128,
    pub remaining_balance: i128,
}

pub fn emit_program_funded(env: &Env, event: ProgramFunded) {
    let topics = (symbol_short!("p_lock"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduleCreated {
    pub version: u32,
    pub program_id: String,
    pub schedule_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub release_timestamp: u64,
}

pub fn emit_schedule_created(env: &Env, event: ScheduleCreated) {
    let topics = (symbol_short!("sched"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduleReleased {
    pub version: u32,
    pub program_id: String,
    pub schedule_id: u64,
    pub recipient: Address,
    pub net_amount: i128,
    pub fee: i128,
    pub timestamp: u64,
}

pub fn emit_schedule_released(env: &Env, event: ScheduleReleased) {
    let topics = (symbol_short!("s_rel"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Payout {
    pub version: u32,
    pub program_id: String,
    pub recipient: Address,
    pub net_amount: i128,
    pub fee: i128,
    pub remaining_balance: i128,
}

pub fn emit_payout(env: &Env, event: Payout) {
    let topics = (symbol_short!("payout"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchPayout {
    pub version: u32,
    pub program_id: String,
    pub count: u32,
    pub total_amount: i128,
    pub remaining_balance: i128,
}

pub fn emit_batch_payout(env: &Env, event: BatchPayout) {
    let topics = (symbol_short!("b_payout"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramExpired {
    pub version: u32,
    pub program_id: String,
    pub depositor: Address,
    pub refunded: i128,
    pub remaining_balance: i128,
    pub timestamp: u64,
}

pub fn emit_program_expired(env: &Env, event: ProgramExpired) {
    let topics = (symbol_short!("expired"), event.program_id.clone());
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AmountLimitsUpdated {
    pub version: u32,
    pub limits: AmountLimits,
    pub updated_by: Address,
}

pub fn emit_amount_limits_updated(env: &Env, event: AmountLimitsUpdated) {
    env.events().publish((symbol_short!("amt_lmt"),), event);
}
