/// Default number of automatic retries after consecutive load failures.
pub const DEFAULT_MAX_LOAD_RETRIES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Pick another target and load again; `attempt` is 1-based.
    Retry { attempt: u32 },
    /// Budget exhausted; surface the error state.
    GiveUp { failures: u32 },
}

/// Consecutive-failure budget for image loads.
#[derive(Debug, Clone)]
pub struct RetryBudget {
    max_retries: u32,
    attempts: u32,
    exhausted: bool,
}

impl RetryBudget {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: 0,
            exhausted: false,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn on_failure(&mut self) -> RetryDecision {
        if self.attempts < self.max_retries {
            self.attempts += 1;
            RetryDecision::Retry {
                attempt: self.attempts,
            }
        } else {
            self.exhausted = true;
            RetryDecision::GiveUp {
                failures: self.attempts + 1,
            }
        }
    }

    /// Any successful load (or a fresh result set) starts a new budget.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.exhausted = false;
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOAD_RETRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gives_up_after_hundred_and_one_failures() {
        let mut budget = RetryBudget::default();
        let mut loads = 1; // the initial attempt
        let mut failures = 0;
        loop {
            failures += 1;
            match budget.on_failure() {
                RetryDecision::Retry { attempt } => {
                    assert_eq!(attempt, failures);
                    loads += 1;
                }
                RetryDecision::GiveUp { failures: reported } => {
                    assert_eq!(reported, 101);
                    break;
                }
            }
            assert!(failures <= 101, "retry loop must terminate");
        }
        assert_eq!(failures, 101);
        assert_eq!(loads, 101);
        assert!(budget.is_exhausted());
    }

    #[test]
    fn success_resets_counter() {
        let mut budget = RetryBudget::new(2);
        assert_eq!(budget.on_failure(), RetryDecision::Retry { attempt: 1 });
        assert_eq!(budget.on_failure(), RetryDecision::Retry { attempt: 2 });
        budget.reset();
        assert_eq!(budget.attempts(), 0);
        assert_eq!(budget.on_failure(), RetryDecision::Retry { attempt: 1 });
    }

    #[test]
    fn zero_budget_gives_up_immediately() {
        let mut budget = RetryBudget::new(0);
        assert_eq!(budget.on_failure(), RetryDecision::GiveUp { failures: 1 });
    }
}
