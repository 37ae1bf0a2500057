use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

#[contracttype]
#[derive(Clone, Debug)]
pub struct EscrowInitialized {
    pub version: u32,
    pub admin: Address,
    pub token: Address,
    pub timestamp: u64,
}

pub fn emit_initialized(env: &Env, event: EscrowInitialized) {
    env.events().publish((symbol_short!("init"),), event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsLocked {
    pub version: u32,
    pub bounty_id: u64,
    pub depositor: Address,
    pub amount: i128,
    pub deadline: u64,
}

pub fn emit_funds_locked(env: &Env, event: FundsLocked) {
    let topics = (symbol_short!("lock"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsReleased {
    pub version: u32,
    pub bounty_id: u64,
    pub recipient: Address,
    pub net_amount: i128,
    pub fee: i128,
    pub remaining_amount: i128,
    pub timestamp: u64,
}

pub fn emit_funds_released(env: &Env, event: FundsReleased) {
    let topics = (symbol_short!("release"), event.bounty_id);
    env.events().publish(topics, event);
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsRefunded {
    pub version: u32,
    pub bounty_id: u64,
    pub amount: i128,
    pub recipient: Address,
    pub remaining_amount: i128,
    pub admin_override: bool,
    pub timestamp: u64,
}

pub fn emit_funds_refunded(env: &Env, event: FundsRefunded) {
    let topics = (symbol_short!("refund"), event.bounty_id);
    env.events().publish(topics, event);
}

/// Summary emitted once per committed batch, after the per-item events.
#[contracttype]
#[derive(Clone, Debug)]
pub struct BatchCompleted {
    pub version: u32,
    pub kind: Symbol,
    pub count: u32,
    pub total_amount: i128,
    pub timestamp: u64,
}

pub fn emit_batch_completed(env: &Env, event: BatchCompleted) {
    let topics = (symbol_short!("batch"), event.kind.clone());
    env.events().publish(topics, event);
}
