//! Program balance bookkeeping.
//!
//! A program is a pool funded by one or more deposits and drained by
//! payouts, either direct (operator-initiated) or through time-gated
//! release schedules. Pending schedules reserve part of the balance, so
//! direct payouts can only draw from `available()`. A program with a
//! deadline can be expired once it passes, which returns the unreserved
//! balance to the depositor.

use soroban_sdk::{contracttype, Address, Env, String, Vec};

use crate::Error;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OutflowKind {
    Payout,
    /// Unreserved balance returned to the depositor by `expire_program`.
    ExpiryRefund,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutRecord {
    pub recipient: Address,
    /// Gross amount, before any protocol fee.
    pub amount: i128,
    pub timestamp: u64,
    pub schedule_id: Option<u64>,
    pub kind: OutflowKind,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReleaseSchedule {
    pub schedule_id: u64,
    pub recipient: Address,
    pub amount: i128,
    pub release_timestamp: u64,
    pub released: bool,
    pub released_at: Option<u64>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProgramData {
    pub program_id: String,
    pub depositor: Address,
    pub total_funds: i128,
    pub remaining_balance: i128,
    pub pending_schedules: i128,
    pub payout_history: Vec<PayoutRecord>,
    pub next_schedule_id: u64,
    pub created_at: u64,
    pub deadline: Option<u64>,
}

impl ProgramData {
    pub fn new(
        env: &Env,
        program_id: String,
        depositor: Address,
        deadline: Option<u64>,
        now: u64,
    ) -> Self {
        Self {
            program_id,
            depositor,
            total_funds: 0,
            remaining_balance: 0,
            pending_schedules: 0,
            payout_history: Vec::new(env),
            next_schedule_id: 0,
            created_at: now,
            deadline,
        }
    }

    /// Balance not reserved by pending schedules.
    pub fn available(&self) -> i128 {
        self.remaining_balance - self.pending_schedules
    }

    pub fn is_past_deadline(&self, now: u64) -> bool {
        matches!(self.deadline, Some(deadline) if now >= deadline)
    }

    /// Adds a deposit. Programs past their deadline take no new funds.
    pub fn fund(&mut self, amount: i128, now: u64) -> Result<(), Error> {
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        if self.is_past_deadline(now) {
            return Err(Error::InvalidDeadline);
        }
        self.total_funds = self
            .total_funds
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        self.remaining_balance = self
            .remaining_balance
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        Ok(())
    }

    /// Reserves `amount` for a new schedule and returns its id.
    pub fn reserve(&mut self, amount: i128) -> Result<u64, Error> {
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let pending = self
            .pending_schedules
            .checked_add(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        if pending > self.remaining_balance {
            return Err(Error::InvalidAmount);
        }
        let schedule_id = self.next_schedule_id;
        self.next_schedule_id = schedule_id
            .checked_add(1)
            .ok_or(Error::ArithmeticOverflow)?;
        self.pending_schedules = pending;
        Ok(schedule_id)
    }

    /// Direct payout from the unreserved balance.
    pub fn pay(&mut self, recipient: Address, amount: i128, now: u64) -> Result<(), Error> {
        if amount <= 0 || amount > self.available() {
            return Err(Error::InvalidAmount);
        }
        self.debit(recipient, amount, now, None, OutflowKind::Payout)
    }

    /// Returns the unreserved balance to the depositor once the deadline
    /// has passed. Pending schedules keep their reservation.
    pub fn expire(&mut self, now: u64) -> Result<i128, Error> {
        let deadline = self.deadline.ok_or(Error::InvalidState)?;
        if now < deadline {
            return Err(Error::InvalidDeadline);
        }
        let refund = self.available();
        if refund <= 0 {
            return Err(Error::InvalidAmount);
        }
        self.debit(
            self.depositor.clone(),
            refund,
            now,
            None,
            OutflowKind::ExpiryRefund,
        )?;
        Ok(refund)
    }

    /// Settles a due schedule against its reservation.
    pub fn settle(&mut self, schedule: &mut ReleaseSchedule, now: u64) -> Result<(), Error> {
        if schedule.released {
            return Err(Error::InvalidState);
        }
        if now < schedule.release_timestamp {
            return Err(Error::InvalidDeadline);
        }
        self.pending_schedules = self
            .pending_schedules
            .checked_sub(schedule.amount)
            .ok_or(Error::ArithmeticOverflow)?;
        self.debit(
            schedule.recipient.clone(),
            schedule.amount,
            now,
            Some(schedule.schedule_id),
            OutflowKind::Payout,
        )?;
        schedule.released = true;
        schedule.released_at = Some(now);
        Ok(())
    }

    pub fn paid_total(&self) -> Option<i128> {
        let mut total: i128 = 0;
        for record in self.payout_history.iter() {
            total = total.checked_add(record.amount)?;
        }
        Some(total)
    }

    fn debit(
        &mut self,
        recipient: Address,
        amount: i128,
        now: u64,
        schedule_id: Option<u64>,
        kind: OutflowKind,
    ) -> Result<(), Error> {
        self.remaining_balance = self
            .remaining_balance
            .checked_sub(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        self.payout_history.push_back(PayoutRecord {
            recipient,
            amount,
            timestamp: now,
            schedule_id,
            kind,
        });
        Ok(())
    }
}

/// First violated accounting rule, if any.
pub(crate) fn violation(program: &ProgramData) -> Option<&'static str> {
    if program.total_funds < 0 || program.remaining_balance < 0 {
        return Some("balances must be non-negative");
    }
    if program.pending_schedules < 0 || program.pending_schedules > program.remaining_balance {
        return Some("pending schedules must fit in remaining balance");
    }
    if program.payout_history.iter().any(|r| r.amount <= 0) {
        return Some("payout amounts must be positive");
    }
    let paid = match program.paid_total() {
        Some(paid) => paid,
        None => return Some("payout history overflows"),
    };
    if paid > program.total_funds {
        return Some("payouts exceed funding");
    }
    if program.total_funds.checked_sub(paid) != Some(program.remaining_balance) {
        return Some("remaining balance must equal funding minus payouts");
    }
    None
}

pub(crate) fn assert_program(program: &ProgramData) {
    if let Some(rule) = violation(program) {
        panic!("Invariant violated: {}", rule);
    }
}
