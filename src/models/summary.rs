use serde::Serialize;

use super::Outcome;

/// Tallies over every recorded outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage in `[0, 100]`; zero when nothing was recorded.
    pub success_rate: f64,
    /// Failing outcomes in recording order.
    pub failures: Vec<Outcome>,
}

impl Summary {
    pub fn of(outcomes: &[Outcome]) -> Self {
        let total = outcomes.len();
        let passed = outcomes.iter().filter(|o| o.passed).count();
        let failed = total - passed;
        let success_rate = if total == 0 {
            0.0
        } else {
            passed as f64 / total as f64 * 100.0
        };

        Self {
            total,
            passed,
            failed,
            success_rate,
            failures: outcomes.iter().filter(|o| !o.passed).cloned().collect(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Success rate with one decimal, e.g. `66.7%`.
    pub fn rate_display(&self) -> String {
        format!("{:.1}%", self.success_rate)
    }
}
