//! State machine for the "check eligibility, then submit" UI flow.
//!
//! ```text
//! Idle -> Checking -> { Eligible, Ineligible } -> Submitting -> { Committed, Failed }
//! ```
//!
//! Every check is stamped with a generation. Starting a new check (the user
//! edited the amount) bumps the generation, so a result that arrives for an
//! older ticket is discarded instead of overwriting the newer state.

use crate::error::{ServiceError, ServiceResult};
use remitcap_core::{EligibilityResult, Money, Transfer};
use tracing::debug;

/// Identifies one eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckTicket {
    generation: u64,
    amount: Money,
}

impl CheckTicket {
    pub fn amount(&self) -> Money {
        self.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Checking { amount: Money },
    Eligible(EligibilityResult),
    Ineligible(EligibilityResult),
    Submitting { amount: Money },
    Committed(Transfer),
    Failed { message: String },
}

impl FlowState {
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Checking { .. } => "checking",
            FlowState::Eligible(_) => "eligible",
            FlowState::Ineligible(_) => "ineligible",
            FlowState::Submitting { .. } => "submitting",
            FlowState::Committed(_) => "committed",
            FlowState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Committed(_) | FlowState::Failed { .. })
    }
}

/// One transfer attempt as seen by the UI.
#[derive(Debug, Clone)]
pub struct TransferFlow {
    state: FlowState,
    generation: u64,
    /// Amount of the last check that resolved to `Eligible`.
    approved_amount: Option<Money>,
}

impl Default for TransferFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferFlow {
    pub fn new() -> Self {
        Self {
            state: FlowState::Idle,
            generation: 0,
            approved_amount: None,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    /// Start (or restart) a check. Any check still in flight becomes stale.
    pub fn begin_check(&mut self, amount: Money) -> ServiceResult<CheckTicket> {
        if let FlowState::Submitting { .. } = self.state {
            return Err(ServiceError::invalid_state(
                "Cannot check eligibility while a transfer is being submitted",
            ));
        }
        self.generation += 1;
        self.approved_amount = None;
        self.state = FlowState::Checking { amount };
        debug!(generation = self.generation, %amount, "eligibility check started");
        Ok(CheckTicket {
            generation: self.generation,
            amount,
        })
    }

    /// Apply a check result. Returns `false` when the ticket is stale and the
    /// result was dropped.
    pub fn resolve_check(
        &mut self,
        ticket: CheckTicket,
        result: ServiceResult<EligibilityResult>,
    ) -> bool {
        let current = ticket.generation == self.generation
            && matches!(self.state, FlowState::Checking { .. });
        if !current {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "stale eligibility result discarded"
            );
            return false;
        }

        self.state = match result {
            Ok(verdict) if verdict.can_transfer => {
                self.approved_amount = Some(ticket.amount);
                FlowState::Eligible(verdict)
            }
            Ok(verdict) => FlowState::Ineligible(verdict),
            Err(e) => FlowState::Failed { message: e.message },
        };
        true
    }

    /// Move to `Submitting`; only allowed from `Eligible`.
    pub fn begin_submit(&mut self) -> ServiceResult<Money> {
        match (&self.state, self.approved_amount) {
            (FlowState::Eligible(_), Some(amount)) => {
                self.state = FlowState::Submitting { amount };
                Ok(amount)
            }
            (state, _) => Err(ServiceError::invalid_state(format!(
                "Cannot submit from state '{}'",
                state.name()
            ))),
        }
    }

    /// Record the outcome of the submission.
    pub fn finish_submit(&mut self, result: ServiceResult<Transfer>) -> ServiceResult<()> {
        if !matches!(self.state, FlowState::Submitting { .. }) {
            return Err(ServiceError::invalid_state(format!(
                "No submission in progress (state '{}')",
                self.state.name()
            )));
        }
        self.state = match result {
            Ok(transfer) => FlowState::Committed(transfer),
            Err(e) => FlowState::Failed { message: e.message },
        };
        Ok(())
    }

    /// Back to `Idle`, dropping any in-flight check.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.approved_amount = None;
        self.state = FlowState::Idle;
    }
}
