//! Search configuration.

use std::time::Duration;

use crate::bandit::BanditPolicy;

/// Configuration for one [`MctsEngine`](crate::MctsEngine).
#[derive(Debug, Clone)]
pub struct MctsConfig {
    /// Exploration constant handed to the bandit policy. Default sqrt(2).
    pub exploration_constant: f64,

    /// Hard cap on iterations across all workers.
    pub max_iterations: u32,

    /// Rollout depth limit in ticks.
    pub max_simulation_depth: u32,

    /// Wall-clock budget for one search. The engine stops once less than
    /// 5% of it remains.
    pub time_budget: Duration,

    /// Worker threads iterating on the shared tree. 1 runs on the caller's
    /// thread.
    pub worker_count: usize,

    /// Selection bandit. Default UCB-V.
    pub bandit: BanditPolicy,

    /// Add the heuristic progressive-bias term to selection scores.
    pub progressive_bias: bool,

    /// Scale of the progressive-bias term.
    pub bias_weight: f64,

    /// Visit exponent in the bias decay `1 / (1 + visits^alpha)`.
    pub bias_decay: f64,

    /// Blend AMAF statistics into selection scores.
    pub use_amaf: bool,

    /// Share of the AMAF blend in the final selection score.
    pub amaf_weight: f64,

    /// Beta of the AMAF visit-weighting schedule.
    pub amaf_beta: f64,

    /// Merge statistics of transposed states during expansion.
    pub use_transposition: bool,

    /// Entry cap of the transposition table.
    pub transposition_capacity: usize,

    /// Virtual loss added per in-flight selection in parallel searches.
    pub virtual_loss: u32,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_constant: std::f64::consts::SQRT_2,
            max_iterations: 10_000,
            max_simulation_depth: 150,
            time_budget: Duration::from_millis(950),
            worker_count: default_worker_count(),
            bandit: BanditPolicy::default(),
            progressive_bias: true,
            bias_weight: 5.0,
            bias_decay: 0.5,
            use_amaf: true,
            amaf_weight: 0.3,
            amaf_beta: 0.5,
            use_transposition: true,
            transposition_capacity: 50_000,
            virtual_loss: 1,
        }
    }
}

impl MctsConfig {
    /// A small deterministic-budget config for tests: single worker, short
    /// wall clock, modest iteration cap.
    pub fn for_testing() -> Self {
        Self {
            max_iterations: 2_000,
            max_simulation_depth: 60,
            time_budget: Duration::from_millis(150),
            worker_count: 1,
            ..Self::default()
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = budget;
        self
    }

    pub fn with_max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers.max(1);
        self
    }

    pub fn with_bandit(mut self, bandit: BanditPolicy) -> Self {
        self.bandit = bandit;
        self
    }
}

fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MctsConfig::default();
        assert_eq!(config.max_iterations, 10_000);
        assert_eq!(config.time_budget, Duration::from_millis(950));
        assert!((config.exploration_constant - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(config.worker_count >= 1);
        assert!(matches!(config.bandit, BanditPolicy::UcbV { .. }));
    }

    #[test]
    fn test_builders() {
        let config = MctsConfig::for_testing()
            .with_max_iterations(123)
            .with_workers(0)
            .with_time_budget(Duration::from_millis(10));
        assert_eq!(config.max_iterations, 123);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.time_budget, Duration::from_millis(10));
    }
}
