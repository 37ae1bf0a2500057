use soroban_sdk::{Env, IntoVal, Val};

/// Approximate ledgers closed per day at a 5s close time.
pub const DAY_IN_LEDGERS: u32 = 17_280;

pub const INSTANCE_TTL_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;
pub const INSTANCE_TTL_EXTEND_TO: u32 = 30 * DAY_IN_LEDGERS;

/// Escrow and program records are the audit trail, so they are kept
/// alive well past the instance entry.
pub const PERSISTENT_TTL_THRESHOLD: u32 = 30 * DAY_IN_LEDGERS;
pub const PERSISTENT_TTL_EXTEND_TO: u32 = 120 * DAY_IN_LEDGERS;

/// Ids per persistent index entry. Indexes grow one page at a time so a
/// single write never touches more than this many ids.
pub const INDEX_PAGE_SIZE: u32 = 100;

/// Page holding the `position`-th indexed id.
pub fn index_page(position: u32) -> u32 {
    position / INDEX_PAGE_SIZE
}

pub fn index_pages(len: u32) -> u32 {
    len.div_ceil(INDEX_PAGE_SIZE)
}

pub fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
}

pub fn bump_persistent<K>(env: &Env, key: &K)
where
    K: IntoVal<Env, Val>,
{
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_TTL_THRESHOLD, PERSISTENT_TTL_EXTEND_TO);
}
