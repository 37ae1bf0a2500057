//! Release schedules: reservation, time gating and batch settlement.

use crate::test::{ProgramSetup, HOUR, START};
use crate::*;
use escrow_core::batch::MAX_BATCH_SIZE;
use soroban_sdk::{symbol_short, testutils::Address as _, vec, Address, IntoVal, Vec};

#[test]
fn test_create_schedule_reserves_balance() {
    let s = ProgramSetup::funded(1_000);
    let id = s.schedule(&s.winner, 600, START + HOUR);
    assert!(s.emitted(
        (symbol_short!("sched"), s.program_id.clone()).into_val(&s.env)
    ));

    assert_eq!(id, 0);
    assert_eq!(s.escrow.get_pending_total(&s.program_id), 600);
    let schedule = s.escrow.get_schedule(&s.program_id, &id);
    assert_eq!(schedule.recipient, s.winner);
    assert_eq!(schedule.release_timestamp, START + HOUR);
    assert!(!schedule.released);

    // Reserved funds are not available to direct payouts.
    assert_eq!(
        s.escrow
            .try_single_payout(&s.admin, &s.program_id, &s.runner_up, &401),
        Err(Ok(Error::InvalidAmount))
    );
}

#[test]
fn test_schedule_ids_increase() {
    let s = ProgramSetup::funded(1_000);
    assert_eq!(s.schedule(&s.winner, 100, START + HOUR), 0);
    assert_eq!(s.schedule(&s.runner_up, 100, START + HOUR), 1);
    assert_eq!(s.schedule(&s.winner, 100, START + 2 * HOUR), 2);
    assert_eq!(s.escrow.get_schedules(&s.program_id).len(), 3);
}

#[test]
fn test_create_schedule_validation() {
    let s = ProgramSetup::funded(1_000);
    let create = |amount: i128, at: u64| {
        s.escrow
            .try_create_release_schedule(&s.admin, &s.program_id, &s.winner, &amount, &at)
    };

    assert_eq!(create(100, START), Err(Ok(Error::InvalidDeadline)));
    assert_eq!(create(100, START - 1), Err(Ok(Error::InvalidDeadline)));
    assert_eq!(create(0, START + HOUR), Err(Ok(Error::InvalidAmount)));
    assert_eq!(create(1_001, START + HOUR), Err(Ok(Error::InvalidAmount)));

    let missing = String::from_str(&s.env, "missing");
    assert_eq!(
        s.escrow.try_create_release_schedule(
            &s.admin,
            &missing,
            &s.winner,
            &10,
            &(START + HOUR)
        ),
        Err(Ok(Error::NotFound))
    );
    assert_eq!(s.escrow.get_pending_total(&s.program_id), 0);
}

#[test]
fn test_create_schedule_requires_operator() {
    let s = ProgramSetup::funded(1_000);
    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.escrow.try_create_release_schedule(
            &stranger,
            &s.program_id,
            &s.winner,
            &10,
            &(START + HOUR)
        ),
        Err(Ok(Error::Unauthorized))
    );

    let operator = s.operator();
    let id = s.escrow.create_release_schedule(
        &operator,
        &s.program_id,
        &s.winner,
        &10,
        &(START + HOUR),
    );
    assert_eq!(s.escrow.get_schedule(&s.program_id, &id).amount, 10);
}

#[test]
fn test_release_waits_for_timestamp() {
    let s = ProgramSetup::funded(1_000);
    let id = s.schedule(&s.winner, 400, START + HOUR);

    s.advance_to(START + HOUR - 1);
    assert_eq!(
        s.escrow.try_release_schedule(&s.program_id, &id),
        Err(Ok(Error::InvalidDeadline))
    );

    s.advance_to(START + HOUR);
    assert_eq!(s.escrow.release_schedule(&s.program_id, &id), 400);
    assert!(s.emitted(
        (symbol_short!("s_rel"), s.program_id.clone()).into_val(&s.env)
    ));

    let program = s.escrow.get_program(&s.program_id);
    assert_eq!(program.remaining_balance, 600);
    assert_eq!(program.pending_schedules, 0);
    assert_eq!(s.token.balance(&s.winner), 400);

    let schedule = s.escrow.get_schedule(&s.program_id, &id);
    assert!(schedule.released);
    assert_eq!(schedule.released_at, Some(START + HOUR));

    let history = s.escrow.get_payout_history(&s.program_id);
    assert_eq!(history.len(), 1);
    assert_eq!(history.get(0).unwrap().schedule_id, Some(id));
}

#[test]
fn test_release_twice_fails() {
    let s = ProgramSetup::funded(1_000);
    let id = s.schedule(&s.winner, 400, START + HOUR);
    s.advance_to(START + HOUR);
    s.escrow.release_schedule(&s.program_id, &id);

    assert_eq!(
        s.escrow.try_release_schedule(&s.program_id, &id),
        Err(Ok(Error::InvalidState))
    );
    assert_eq!(
        s.escrow.try_release_schedule(&s.program_id, &7),
        Err(Ok(Error::NotFound))
    );
    assert_eq!(s.token.balance(&s.winner), 400);
}

#[test]
fn test_batch_release_settles_all() {
    let s = ProgramSetup::funded(1_000);
    let a = s.schedule(&s.winner, 300, START + HOUR);
    let b = s.schedule(&s.runner_up, 200, START + HOUR);
    s.advance_to(START + HOUR);

    let total = s
        .escrow
        .batch_release_schedules(&s.program_id, &vec![&s.env, a, b]);
    assert_eq!(total, 500);
    assert_eq!(s.token.balance(&s.winner), 300);
    assert_eq!(s.token.balance(&s.runner_up), 200);

    let program = s.escrow.get_program(&s.program_id);
    assert_eq!(program.remaining_balance, 500);
    assert_eq!(program.pending_schedules, 0);
    assert!(s.escrow.verify_program(&s.program_id));
}

#[test]
fn test_due_schedules_lists_releasable_ids() {
    let s = ProgramSetup::funded(1_000);
    let early = s.schedule(&s.winner, 100, START + HOUR);
    let late = s.schedule(&s.runner_up, 200, START + 3 * HOUR);
    let mid = s.schedule(&s.runner_up, 300, START + 2 * HOUR);
    assert!(s.escrow.get_due_schedules(&s.program_id).is_empty());

    s.advance_to(START + 2 * HOUR);
    let due = s.escrow.get_due_schedules(&s.program_id);
    assert_eq!(due.len(), 2);
    assert_eq!(due.get(0).unwrap().schedule_id, early);
    assert_eq!(due.get(1).unwrap().schedule_id, mid);

    // Released schedules drop out; the rest feed straight into a batch.
    s.escrow.release_schedule(&s.program_id, &early);
    let mut ids: Vec<u64> = Vec::new(&s.env);
    for schedule in s.escrow.get_due_schedules(&s.program_id).iter() {
        ids.push_back(schedule.schedule_id);
    }
    assert_eq!(ids, vec![&s.env, mid]);
    assert_eq!(s.escrow.batch_release_schedules(&s.program_id, &ids), 300);
    assert!(s.escrow.get_due_schedules(&s.program_id).is_empty());

    s.advance_to(START + 3 * HOUR);
    assert_eq!(s.escrow.get_due_schedules(&s.program_id).get(0).unwrap().schedule_id, late);

    let missing = String::from_str(&s.env, "missing");
    assert_eq!(
        s.escrow.try_get_due_schedules(&missing),
        Err(Ok(Error::NotFound))
    );
}

#[test]
fn test_batch_release_is_atomic() {
    let s = ProgramSetup::funded(1_000);
    let due = s.schedule(&s.winner, 300, START + HOUR);
    let later = s.schedule(&s.runner_up, 200, START + 3 * HOUR);
    s.advance_to(START + HOUR);

    assert_eq!(
        s.escrow
            .try_batch_release_schedules(&s.program_id, &vec![&s.env, due, later]),
        Err(Ok(Error::InvalidDeadline))
    );
    assert_eq!(
        s.escrow
            .try_batch_release_schedules(&s.program_id, &vec![&s.env, due, due]),
        Err(Ok(Error::DuplicateId))
    );

    assert!(!s.escrow.get_schedule(&s.program_id, &due).released);
    assert_eq!(s.escrow.get_program(&s.program_id).remaining_balance, 1_000);
    assert_eq!(s.token.balance(&s.winner), 0);
}

#[test]
fn test_batch_release_size_limits() {
    let s = ProgramSetup::funded(1_000);
    let empty: Vec<u64> = Vec::new(&s.env);
    assert_eq!(
        s.escrow.try_batch_release_schedules(&s.program_id, &empty),
        Err(Ok(Error::InvalidBatchSize))
    );

    let mut ids = Vec::new(&s.env);
    for id in 0..(MAX_BATCH_SIZE as u64 + 1) {
        ids.push_back(id);
    }
    assert_eq!(
        s.escrow.try_batch_release_schedules(&s.program_id, &ids),
        Err(Ok(Error::InvalidBatchSize))
    );
}
