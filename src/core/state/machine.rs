//! Transaction lifecycle rules
//!
//! ```text
//!            process               reset / recompute
//!   Draft ───────────> Done      Failed ─────────────> Draft
//!     │  ─────────────> Failed   PartiallyDone ───────> Draft
//!     │  ─────────────> PartiallyDone
//!     └─ cancel ──────> Cancel   Done / Cancel ─reset─> Draft
//! ```
//!
//! Failed and partially done transactions may be processed again. Incoming transactions
//! that already created records can never go back to draft.

use crate::domain::transaction::{Direction, Transaction, TransactionState};
use crate::domain::{EdiError, Result};

/// Enforces the allowed state transitions of a [`Transaction`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionStateMachine;

impl TransactionStateMachine {
    /// True when `process` may run on a transaction in `state`
    pub fn is_processable(state: TransactionState) -> bool {
        matches!(
            state,
            TransactionState::Draft | TransactionState::Failed | TransactionState::PartiallyDone
        )
    }

    /// Checks that a transaction may be processed
    pub fn ensure_processable(tx: &Transaction) -> Result<()> {
        if Self::is_processable(tx.state) {
            Ok(())
        } else {
            Err(EdiError::State(format!(
                "Transaction '{}' is {} and cannot be processed",
                tx.name, tx.state
            )))
        }
    }

    /// Records the outcome of a processing or export attempt
    pub fn complete(tx: &mut Transaction, outcome: TransactionState) -> Result<()> {
        if !matches!(
            outcome,
            TransactionState::Done | TransactionState::Failed | TransactionState::PartiallyDone
        ) {
            return Err(EdiError::State(format!(
                "{outcome} is not a processing outcome"
            )));
        }
        Self::ensure_processable(tx)?;
        Self::set(tx, outcome);
        Ok(())
    }

    /// Moves a transaction back to draft
    ///
    /// # Errors
    ///
    /// Returns a state error, leaving the transaction untouched, when an incoming
    /// transaction already references the records it created.
    pub fn reset(tx: &mut Transaction) -> Result<()> {
        if tx.is_reference_locked() {
            return Err(EdiError::State(format!(
                "Transaction '{}' already created records and cannot be reset to draft",
                tx.name
            )));
        }
        Self::set(tx, TransactionState::Draft);
        Ok(())
    }

    /// Cancels a transaction that has not completed
    pub fn cancel(tx: &mut Transaction) -> Result<()> {
        if !Self::is_processable(tx.state) {
            return Err(EdiError::State(format!(
                "Transaction '{}' is {} and cannot be cancelled",
                tx.name, tx.state
            )));
        }
        Self::set(tx, TransactionState::Cancel);
        Ok(())
    }

    /// Moves a failed outgoing transaction back to draft before its XML is regenerated
    pub fn begin_recompute(tx: &mut Transaction) -> Result<()> {
        if tx.direction != Direction::Outgoing {
            return Err(EdiError::State(format!(
                "Transaction '{}' is incoming; only outgoing XML can be recomputed",
                tx.name
            )));
        }
        if tx.state != TransactionState::Failed {
            return Err(EdiError::State(format!(
                "Transaction '{}' is {}; only failed transactions can be recomputed",
                tx.name, tx.state
            )));
        }
        Self::set(tx, TransactionState::Draft);
        Ok(())
    }

    fn set(tx: &mut Transaction, to: TransactionState) {
        if tx.state != to {
            crate::log_transaction_state!(tx.id, tx.state, to);
            tx.state = to;
        }
    }
}
