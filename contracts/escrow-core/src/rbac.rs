//! # Role-Based Access Control
//!
//! Each privileged account holds exactly one [`Role`], stored under its own
//! persistent key. Absence of an entry means the account is unprivileged.
//!
//! | Role     | Privileges                                        |
//! |----------|---------------------------------------------------|
//! | Admin    | Everything: roles, config, unpause, upgrades      |
//! | Operator | Release funds, create schedules, payouts          |
//! | Pauser   | Pause (but not unpause) the contract              |
//! | Viewer   | Marker role, no write privileges                  |
//!
//! The registry tracks how many Admins exist and refuses to revoke or
//! downgrade the last one.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

use crate::{storage, CoreError, EVENT_VERSION};

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Admin,
    Operator,
    Pauser,
    Viewer,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
enum RbacKey {
    Role(Address),
    AdminCount,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoleGranted {
    pub version: u32,
    pub target: Address,
    pub role: Role,
    pub granted_by: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoleRevoked {
    pub version: u32,
    pub target: Address,
    pub previous: Option<Role>,
    pub revoked_by: Address,
    pub timestamp: u64,
}

pub fn get_role(env: &Env, account: &Address) -> Option<Role> {
    let key = RbacKey::Role(account.clone());
    env.storage().persistent().get(&key)
}

/// Exact match: an Admin does not "have" the Operator role.
pub fn has_role(env: &Env, account: &Address, role: Role) -> bool {
    get_role(env, account) == Some(role)
}

pub fn is_admin(env: &Env, account: &Address) -> bool {
    has_role(env, account, Role::Admin)
}

/// Operator checks are satisfied by Operators and Admins.
pub fn is_operator(env: &Env, account: &Address) -> bool {
    matches!(get_role(env, account), Some(Role::Admin | Role::Operator))
}

/// Pause checks are satisfied by Pausers and Admins only.
pub fn can_pause(env: &Env, account: &Address) -> bool {
    matches!(get_role(env, account), Some(Role::Admin | Role::Pauser))
}

pub fn admin_count(env: &Env) -> u32 {
    env.storage()
        .instance()
        .get(&RbacKey::AdminCount)
        .unwrap_or(0)
}

pub fn require_admin(env: &Env, caller: &Address) -> Result<(), CoreError> {
    if !is_admin(env, caller) {
        return Err(CoreError::Unauthorized);
    }
    caller.require_auth();
    Ok(())
}

pub fn require_operator(env: &Env, caller: &Address) -> Result<(), CoreError> {
    if !is_operator(env, caller) {
        return Err(CoreError::Unauthorized);
    }
    caller.require_auth();
    Ok(())
}

/// Grants Admin to the configured administrator at `init`.
pub fn bootstrap(env: &Env, admin: &Address) {
    write_role(env, admin, Role::Admin);
    env.storage().instance().set(&RbacKey::AdminCount, &1u32);
    publish_grant(env, admin, Role::Admin, admin);
}

/// Assigns `role` to `target`, replacing any role it held before.
pub fn grant_role(
    env: &Env,
    caller: &Address,
    target: &Address,
    role: Role,
) -> Result<(), CoreError> {
    require_admin(env, caller)?;

    let mut admins = admin_count(env);
    match (get_role(env, target), role) {
        (Some(Role::Admin), Role::Admin) => {}
        (Some(Role::Admin), _) => {
            if admins <= 1 {
                return Err(CoreError::LastAdmin);
            }
            admins -= 1;
        }
        (_, Role::Admin) => {
            admins = admins
                .checked_add(1)
                .ok_or(CoreError::ArithmeticOverflow)?;
        }
        _ => {}
    }

    write_role(env, target, role);
    env.storage().instance().set(&RbacKey::AdminCount, &admins);
    publish_grant(env, target, role, caller);
    Ok(())
}

/// Removes whatever role `target` holds. Revoking an unprivileged account
/// is a no-op that still leaves an audit event.
pub fn revoke_role(env: &Env, caller: &Address, target: &Address) -> Result<(), CoreError> {
    require_admin(env, caller)?;

    let previous = get_role(env, target);
    if previous == Some(Role::Admin) {
        let admins = admin_count(env);
        if admins <= 1 {
            return Err(CoreError::LastAdmin);
        }
        env.storage()
            .instance()
            .set(&RbacKey::AdminCount, &(admins - 1));
    }

    env.storage()
        .persistent()
        .remove(&RbacKey::Role(target.clone()));

    env.events().publish(
        (symbol_short!("rbac"), symbol_short!("revoke")),
        RoleRevoked {
            version: EVENT_VERSION,
            target: target.clone(),
            previous,
            revoked_by: caller.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
    Ok(())
}

fn write_role(env: &Env, account: &Address, role: Role) {
    let key = RbacKey::Role(account.clone());
    env.storage().persistent().set(&key, &role);
    storage::bump_persistent(env, &key);
}

fn publish_grant(env: &Env, target: &Address, role: Role, granted_by: &Address) {
    env.events().publish(
        (symbol_short!("rbac"), symbol_short!("grant")),
        RoleGranted {
            version: EVENT_VERSION,
            target: target.clone(),
            role,
            granted_by: granted_by.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}
