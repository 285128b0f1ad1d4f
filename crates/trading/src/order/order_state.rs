use thiserror::Error;

use quant_pilot_domain::OrderStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

/// Lifecycle of a single order:
/// `Pending -> Submitted -> (PartiallyFilled) -> Filled`, with cancel and
/// reject as the other terminal exits.
#[derive(Debug, Clone)]
pub struct OrderStateMachine {
    state: OrderStatus,
}

impl OrderStateMachine {
    pub fn new() -> Self {
        Self {
            state: OrderStatus::Pending,
        }
    }

    pub fn state(&self) -> OrderStatus {
        self.state
    }

    fn transition(&mut self, allowed: bool, to: OrderStatus) -> Result<(), TransitionError> {
        if !allowed {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    pub fn submit(&mut self) -> Result<(), TransitionError> {
        let allowed = self.state == OrderStatus::Pending;
        self.transition(allowed, OrderStatus::Submitted)
    }

    pub fn partial_fill(&mut self) -> Result<(), TransitionError> {
        let allowed = matches!(
            self.state,
            OrderStatus::Submitted | OrderStatus::PartiallyFilled
        );
        self.transition(allowed, OrderStatus::PartiallyFilled)
    }

    pub fn fill(&mut self) -> Result<(), TransitionError> {
        let allowed = matches!(
            self.state,
            OrderStatus::Submitted | OrderStatus::PartiallyFilled
        );
        self.transition(allowed, OrderStatus::Filled)
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        let allowed = self.state.can_cancel();
        self.transition(allowed, OrderStatus::Cancelled)
    }

    pub fn reject(&mut self) -> Result<(), TransitionError> {
        let allowed = matches!(self.state, OrderStatus::Pending | OrderStatus::Submitted);
        self.transition(allowed, OrderStatus::Rejected)
    }
}

impl Default for OrderStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
