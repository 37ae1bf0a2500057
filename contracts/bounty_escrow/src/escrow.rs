//! Per-bounty escrow record and its state machine.
//!
//! ```text
//!            release            refund (rest)
//!   Locked ──────────► Released      ┌──────────► Refunded
//!     │                  ▲           │
//!     │ refund (part)    │ release   │
//!     └──────────► PartiallyRefunded ┘
//!                    ▲         │ refund (part)
//!                    └─────────┘
//! ```
//!
//! A partial release keeps the current status until nothing remains, at
//! which point the record becomes Released. Released and Refunded are
//! terminal. Transitions mutate the record in memory only; the contract
//! persists it afterwards, which lets batch calls plan every item before
//! committing any of them.

use soroban_sdk::{contracttype, Address, Env, Vec};

use crate::Error;

#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EscrowStatus {
    Locked,
    PartiallyRefunded,
    Released,
    Refunded,
}

impl EscrowStatus {
    pub fn is_terminal(self) -> bool {
        match self {
            EscrowStatus::Locked | EscrowStatus::PartiallyRefunded => false,
            EscrowStatus::Released | EscrowStatus::Refunded => true,
        }
    }
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefundRecord {
    pub amount: i128,
    pub recipient: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Escrow {
    pub depositor: Address,
    pub amount: i128,
    pub remaining_amount: i128,
    pub released_amount: i128,
    pub status: EscrowStatus,
    pub deadline: u64,
    pub refund_history: Vec<RefundRecord>,
}

impl Escrow {
    pub fn new(env: &Env, depositor: Address, amount: i128, deadline: u64) -> Self {
        Self {
            depositor,
            amount,
            remaining_amount: amount,
            released_amount: 0,
            status: EscrowStatus::Locked,
            deadline,
            refund_history: Vec::new(env),
        }
    }

    /// Releases the full remaining balance and returns it.
    pub fn release(&mut self) -> Result<i128, Error> {
        self.ensure_open()?;
        self.pay_out(self.remaining_amount)
    }

    /// Releases `amount` out of the remaining balance. The status only
    /// moves to Released once nothing remains.
    pub fn release_partial(&mut self, amount: i128) -> Result<i128, Error> {
        self.ensure_open()?;
        if amount <= 0 || amount > self.remaining_amount {
            return Err(Error::InvalidAmount);
        }
        self.pay_out(amount)
    }

    /// Returns `amount` to the depositor and appends it to the refund
    /// history. `deadline_waived` is only set on the admin override path.
    pub fn refund(
        &mut self,
        amount: i128,
        now: u64,
        deadline_waived: bool,
    ) -> Result<RefundRecord, Error> {
        self.ensure_open()?;
        if amount <= 0 || amount > self.remaining_amount {
            return Err(Error::InvalidAmount);
        }
        if !deadline_waived && now < self.deadline {
            return Err(Error::InvalidDeadline);
        }

        self.remaining_amount = self
            .remaining_amount
            .checked_sub(amount)
            .ok_or(Error::ArithmeticOverflow)?;
        self.status = if self.remaining_amount == 0 {
            EscrowStatus::Refunded
        } else {
            EscrowStatus::PartiallyRefunded
        };

        let record = RefundRecord {
            amount,
            recipient: self.depositor.clone(),
            timestamp: now,
        };
        self.refund_history.push_back(record.clone());
        Ok(record)
    }

    fn ensure_open(&self) -> Result<(), Error> {
        match self.status {
            EscrowStatus::Locked | EscrowStatus::PartiallyRefunded => Ok(()),
            EscrowStatus::Released | EscrowStatus::Refunded => Err(Error::InvalidState),
        }
    }

    fn pay_out(&mut self, gross: i128) -> Result<i128, Error> {
        self.released_amount = self
            .released_amount
            .checked_add(gross)
            .ok_or(Error::ArithmeticOverflow)?;
        self.remaining_amount = self
            .remaining_amount
            .checked_sub(gross)
            .ok_or(Error::ArithmeticOverflow)?;
        if self.remaining_amount == 0 {
            self.status = EscrowStatus::Released;
        }
        Ok(gross)
    }

    /// Sum of the refund history, `None` on overflow.
    pub fn refunded_total(&self) -> Option<i128> {
        let mut total: i128 = 0;
        for record in self.refund_history.iter() {
            total = total.checked_add(record.amount)?;
        }
        Some(total)
    }
}
