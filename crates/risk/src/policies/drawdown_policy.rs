//! Drawdown control

/// Drawdown thresholds as fractions of peak balance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownPolicy {
    pub max_drawdown: f64,
    pub warning_drawdown: f64,
}

impl DrawdownPolicy {
    /// Warning level at half the maximum
    pub fn new(max_drawdown: f64) -> Self {
        Self {
            max_drawdown,
            warning_drawdown: max_drawdown * 0.5,
        }
    }

    pub fn is_drawdown_exceeded(&self, current_drawdown: f64) -> bool {
        current_drawdown > self.max_drawdown
    }

    pub fn is_warning_level(&self, current_drawdown: f64) -> bool {
        current_drawdown > self.warning_drawdown
    }

    pub fn get_action(&self, current_drawdown: f64) -> DrawdownAction {
        if self.is_drawdown_exceeded(current_drawdown) {
            DrawdownAction::StopAllTrading
        } else if self.is_warning_level(current_drawdown) {
            DrawdownAction::ReducePositions
        } else {
            DrawdownAction::Continue
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawdownAction {
    Continue,
    /// De-risk: smaller size, fewer positions
    ReducePositions,
    /// No new entries
    StopAllTrading,
}

impl Default for DrawdownPolicy {
    fn default() -> Self {
        Self::new(0.20)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions() {
        let policy = DrawdownPolicy::default();
        assert_eq!(policy.get_action(0.05), DrawdownAction::Continue);
        assert_eq!(policy.get_action(0.15), DrawdownAction::ReducePositions);
        assert_eq!(policy.get_action(0.20), DrawdownAction::ReducePositions);
        assert_eq!(policy.get_action(0.21), DrawdownAction::StopAllTrading);
    }
}
