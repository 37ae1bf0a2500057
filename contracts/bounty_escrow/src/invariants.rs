//! Accounting checks run after every transition.
//!
//! `assert_escrow` panics so a broken record can never be committed; the
//! host rolls back the whole invocation. `check_escrow` is the
//! non-panicking form used by the verification queries.

use crate::escrow::{Escrow, EscrowStatus};

/// Returns the first violated rule, if any.
pub(crate) fn violation(escrow: &Escrow) -> Option<&'static str> {
    if escrow.amount < 0 {
        return Some("amount must be non-negative");
    }
    if escrow.remaining_amount < 0 {
        return Some("remaining_amount must be non-negative");
    }
    if escrow.released_amount < 0 {
        return Some("released_amount must be non-negative");
    }
    if escrow.refund_history.iter().any(|r| r.amount < 0) {
        return Some("refund amounts must be non-negative");
    }

    let refunded = match escrow.refunded_total() {
        Some(total) => total,
        None => return Some("refund history overflows"),
    };
    if refunded > escrow.amount {
        return Some("refunds exceed locked amount");
    }
    let accounted = escrow
        .remaining_amount
        .checked_add(escrow.released_amount)
        .and_then(|sum| sum.checked_add(refunded));
    if accounted != Some(escrow.amount) {
        return Some("remaining + released + refunded must equal amount");
    }

    // Partial releases may leave `released_amount > 0` on open records.
    match escrow.status {
        EscrowStatus::Locked => {
            if !escrow.refund_history.is_empty() || escrow.remaining_amount == 0 {
                return Some("locked escrow is inconsistent");
            }
        }
        EscrowStatus::PartiallyRefunded => {
            if escrow.refund_history.is_empty() || escrow.remaining_amount == 0 {
                return Some("partially refunded escrow is inconsistent");
            }
        }
        EscrowStatus::Released => {
            if escrow.remaining_amount != 0 {
                return Some("released escrow must have zero remaining amount");
            }
        }
        EscrowStatus::Refunded => {
            if escrow.remaining_amount != 0 || escrow.refund_history.is_empty() {
                return Some("refunded escrow must be fully refunded");
            }
        }
    }
    None
}

pub(crate) fn check_escrow(escrow: &Escrow) -> bool {
    violation(escrow).is_none()
}

pub(crate) fn assert_escrow(escrow: &Escrow) {
    if let Some(rule) = violation(escrow) {
        panic!("Invariant violated: {}", rule);
    }
}
