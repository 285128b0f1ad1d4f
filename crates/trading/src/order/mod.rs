mod order_state;

pub use order_state::{OrderStateMachine, TransitionError};
