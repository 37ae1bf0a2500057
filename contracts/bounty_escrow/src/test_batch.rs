//! Batch lock / release / refund: sizing, duplicates and all-or-nothing
//! behaviour.

use crate::test::{TestSetup, DAY, START};
use crate::*;
use escrow_core::batch::MAX_BATCH_SIZE;
use escrow_core::storage::INDEX_PAGE_SIZE;
use soroban_sdk::{testutils::Address as _, vec, Address, Vec};

fn lock_item(s: &TestSetup, bounty_id: u64, amount: i128) -> LockFundsItem {
    LockFundsItem {
        bounty_id,
        depositor: s.depositor.clone(),
        amount,
        deadline: START + DAY,
    }
}

fn release_item(s: &TestSetup, bounty_id: u64) -> ReleaseFundsItem {
    ReleaseFundsItem {
        bounty_id,
        recipient: s.contributor.clone(),
    }
}

// ─── Lock ───────────────────────────────────────────────────────────────────

#[test]
fn test_batch_lock_creates_all() {
    let s = TestSetup::new();
    let items = vec![
        &s.env,
        lock_item(&s, 1, 100),
        lock_item(&s, 2, 200),
        lock_item(&s, 3, 300),
    ];

    assert_eq!(s.escrow.batch_lock_funds(&items), 3);
    assert_eq!(s.escrow.get_balance(), 600);
    assert_eq!(s.escrow.get_escrow_info(&2).amount, 200);
    assert_eq!(s.escrow.get_escrow_ids().len(), 3);
}

#[test]
fn test_batch_lock_several_depositors() {
    let s = TestSetup::new();
    let other = Address::generate(&s.env);
    s.token_admin.mint(&other, &500);

    let mut second = lock_item(&s, 2, 500);
    second.depositor = other.clone();
    let items = vec![&s.env, lock_item(&s, 1, 100), second];

    s.escrow.batch_lock_funds(&items);
    assert_eq!(s.token.balance(&other), 0);
    assert_eq!(s.escrow.get_escrow_info(&2).depositor, other);
}

#[test]
fn test_batch_lock_size_limits() {
    let s = TestSetup::new();
    let empty: Vec<LockFundsItem> = Vec::new(&s.env);
    assert_eq!(
        s.escrow.try_batch_lock_funds(&empty),
        Err(Ok(Error::InvalidBatchSize))
    );

    let mut items = Vec::new(&s.env);
    for id in 0..(MAX_BATCH_SIZE as u64 + 1) {
        items.push_back(lock_item(&s, id, 10));
    }
    assert_eq!(
        s.escrow.try_batch_lock_funds(&items),
        Err(Ok(Error::InvalidBatchSize))
    );

    items.pop_back();
    assert_eq!(s.escrow.batch_lock_funds(&items), MAX_BATCH_SIZE);
}

#[test]
fn test_batch_lock_duplicate_ids() {
    let s = TestSetup::new();
    let items = vec![&s.env, lock_item(&s, 5, 100), lock_item(&s, 5, 100)];
    assert_eq!(
        s.escrow.try_batch_lock_funds(&items),
        Err(Ok(Error::DuplicateId))
    );
    assert_eq!(s.escrow.try_get_escrow_info(&5), Err(Ok(Error::NotFound)));
    assert_eq!(s.token.balance(&s.depositor), 1_000_000);
}

#[test]
fn test_batch_lock_existing_id_rejects_everything() {
    let s = TestSetup::new();
    s.lock(2, 50);
    let items = vec![
        &s.env,
        lock_item(&s, 1, 100),
        lock_item(&s, 2, 100),
        lock_item(&s, 3, 100),
    ];

    assert_eq!(
        s.escrow.check_batch_lock(&items),
        Some(BatchFailure {
            index: 1,
            error: Error::AlreadyExists as u32,
        })
    );
    assert_eq!(
        s.escrow.try_batch_lock_funds(&items),
        Err(Ok(Error::AlreadyExists))
    );
    assert_eq!(s.escrow.try_get_escrow_info(&1), Err(Ok(Error::NotFound)));
    assert_eq!(s.escrow.try_get_escrow_info(&3), Err(Ok(Error::NotFound)));
    assert_eq!(s.escrow.get_balance(), 50);
}

// ─── Release ────────────────────────────────────────────────────────────────

#[test]
fn test_batch_release_pays_everyone() {
    let s = TestSetup::new();
    s.lock(1, 100);
    s.lock(2, 200);

    let items = vec![&s.env, release_item(&s, 1), release_item(&s, 2)];
    assert_eq!(s.escrow.check_batch_release(&s.admin, &items), None);
    assert_eq!(s.escrow.batch_release_funds(&s.admin, &items), 2);

    assert_eq!(s.token.balance(&s.contributor), 300);
    assert_eq!(s.escrow.get_escrow_info(&1).status, EscrowStatus::Released);
    assert_eq!(s.escrow.get_escrow_info(&2).status, EscrowStatus::Released);
}

#[test]
fn test_batch_release_is_atomic() {
    let s = TestSetup::new();
    s.lock(1, 100);
    s.lock(2, 200);
    s.lock(3, 300);
    s.escrow.release_funds(&s.admin, &2, &s.contributor);

    let items = vec![
        &s.env,
        release_item(&s, 1),
        release_item(&s, 2),
        release_item(&s, 3),
    ];
    assert_eq!(
        s.escrow.check_batch_release(&s.admin, &items),
        Some(BatchFailure {
            index: 1,
            error: Error::InvalidState as u32,
        })
    );
    assert_eq!(
        s.escrow.try_batch_release_funds(&s.admin, &items),
        Err(Ok(Error::InvalidState))
    );

    let first = s.escrow.get_escrow_info(&1);
    let third = s.escrow.get_escrow_info(&3);
    assert_eq!(first.status, EscrowStatus::Locked);
    assert_eq!(first.remaining_amount, 100);
    assert_eq!(third.status, EscrowStatus::Locked);
    assert_eq!(third.remaining_amount, 300);
    assert_eq!(s.token.balance(&s.contributor), 200);
    assert_eq!(s.escrow.get_balance(), 400);
}

#[test]
fn test_batch_release_unknown_and_duplicate() {
    let s = TestSetup::new();
    s.lock(1, 100);

    let unknown = vec![&s.env, release_item(&s, 1), release_item(&s, 9)];
    assert_eq!(
        s.escrow.check_batch_release(&s.admin, &unknown),
        Some(BatchFailure {
            index: 1,
            error: Error::NotFound as u32,
        })
    );

    let duplicate = vec![&s.env, release_item(&s, 1), release_item(&s, 1)];
    assert_eq!(
        s.escrow.try_batch_release_funds(&s.admin, &duplicate),
        Err(Ok(Error::DuplicateId))
    );
    assert_eq!(s.escrow.get_escrow_info(&1).status, EscrowStatus::Locked);
}

#[test]
fn test_batch_release_requires_operator() {
    let s = TestSetup::new();
    s.lock(1, 100);
    let items = vec![&s.env, release_item(&s, 1)];

    assert_eq!(
        s.escrow.try_batch_release_funds(&s.depositor, &items),
        Err(Ok(Error::Unauthorized))
    );
    assert_eq!(
        s.escrow.try_check_batch_release(&s.depositor, &items),
        Err(Ok(Error::Unauthorized))
    );
}

// ─── Refund ─────────────────────────────────────────────────────────────────

#[test]
fn test_batch_refund_after_deadline() {
    let s = TestSetup::new();
    s.lock(1, 100);
    s.lock(2, 200);
    s.advance_to(START + DAY);

    let items = vec![
        &s.env,
        RefundItem {
            bounty_id: 1,
            amount: 100,
        },
        RefundItem {
            bounty_id: 2,
            amount: 50,
        },
    ];
    assert_eq!(s.escrow.batch_refund(&s.depositor, &items, &false), 2);

    assert_eq!(s.escrow.get_escrow_info(&1).status, EscrowStatus::Refunded);
    let second = s.escrow.get_escrow_info(&2);
    assert_eq!(second.status, EscrowStatus::PartiallyRefunded);
    assert_eq!(second.remaining_amount, 150);
    assert_eq!(s.token.balance(&s.depositor), 999_850);
}

#[test]
fn test_batch_refund_before_deadline_is_atomic() {
    let s = TestSetup::new();
    s.lock(1, 100);
    s.escrow
        .lock_funds(&s.depositor, &2, &200, &(START + 2 * DAY));
    s.advance_to(START + DAY);

    let items = vec![
        &s.env,
        RefundItem {
            bounty_id: 1,
            amount: 100,
        },
        RefundItem {
            bounty_id: 2,
            amount: 200,
        },
    ];
    assert_eq!(
        s.escrow.check_batch_refund(&s.depositor, &items, &false),
        Some(BatchFailure {
            index: 1,
            error: Error::InvalidDeadline as u32,
        })
    );
    assert_eq!(
        s.escrow.try_batch_refund(&s.depositor, &items, &false),
        Err(Ok(Error::InvalidDeadline))
    );
    assert_eq!(s.escrow.get_escrow_info(&1).status, EscrowStatus::Locked);

    // The admin override path ignores the deadline.
    assert_eq!(s.escrow.batch_refund(&s.admin, &items, &true), 2);
    assert_eq!(s.escrow.get_escrow_info(&2).status, EscrowStatus::Refunded);
}

#[test]
fn test_batch_refund_foreign_escrow_is_unauthorized() {
    let s = TestSetup::new();
    let other = Address::generate(&s.env);
    s.token_admin.mint(&other, &100);
    s.lock(1, 100);
    s.escrow.lock_funds(&other, &2, &100, &(START + DAY));
    s.advance_to(START + DAY);

    let items = vec![
        &s.env,
        RefundItem {
            bounty_id: 1,
            amount: 100,
        },
        RefundItem {
            bounty_id: 2,
            amount: 100,
        },
    ];
    assert_eq!(
        s.escrow.check_batch_refund(&s.depositor, &items, &false),
        Some(BatchFailure {
            index: 1,
            error: Error::Unauthorized as u32,
        })
    );
    assert_eq!(
        s.escrow.try_batch_refund(&s.depositor, &items, &false),
        Err(Ok(Error::Unauthorized))
    );
    assert_eq!(s.token.balance(&other), 0);
}

#[test]
fn test_paused_batches_fail() {
    let s = TestSetup::new();
    s.lock(1, 100);
    s.escrow.pause_contract(&s.admin);

    let locks = vec![&s.env, lock_item(&s, 2, 10)];
    let releases = vec![&s.env, release_item(&s, 1)];
    assert_eq!(
        s.escrow.try_batch_lock_funds(&locks),
        Err(Ok(Error::Paused))
    );
    assert_eq!(
        s.escrow.try_batch_release_funds(&s.admin, &releases),
        Err(Ok(Error::Paused))
    );
}

#[test]
fn test_escrow_index_spans_pages() {
    let s = TestSetup::new();
    s.env.budget().reset_unlimited();
    let total = u64::from(INDEX_PAGE_SIZE) + 20;
    let mut next = 1u64;
    while next <= total {
        let mut items = Vec::new(&s.env);
        for bounty_id in next..(next + u64::from(MAX_BATCH_SIZE)).min(total + 1) {
            items.push_back(lock_item(&s, bounty_id, 10));
        }
        next += u64::from(items.len());
        s.escrow.batch_lock_funds(&items);
    }

    assert_eq!(u64::from(s.escrow.get_escrow_count()), total);
    let first = s.escrow.get_escrow_ids_page(&0);
    let second = s.escrow.get_escrow_ids_page(&1);
    assert_eq!(first.len(), INDEX_PAGE_SIZE);
    assert_eq!(second.len(), 20);
    assert_eq!(first.get(0), Some(1));
    assert_eq!(second.get(0), Some(u64::from(INDEX_PAGE_SIZE) + 1));
    assert!(s.escrow.get_escrow_ids_page(&2).is_empty());

    let ids = s.escrow.get_escrow_ids();
    assert_eq!(u64::from(ids.len()), total);
    assert_eq!(ids.last(), Some(total));
    assert!(s.escrow.verify_all_invariants().healthy);
}
