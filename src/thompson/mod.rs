//! Thompson-Sampling strategy selector: a Bayesian bandit over
//! reasoning strategies with Beta posteriors updated from
//! success/failure outcomes.

pub mod monitoring;
pub mod sampler;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use thiserror::Error;

pub use monitoring::{
    exploration_report, learning_report, performance_report, ExplorationBand, ExplorationReport,
    LearningReport, LearningTrend, PerformanceReport,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ThompsonError {
    #[error("no active strategies are registered")]
    NoActiveStrategies,

    #[error("unknown strategy id: {0}")]
    StrategyNotFound(String),
}

/// A reasoning strategy with a Beta posterior over its success
/// probability. `alpha = 1 + total_successes`, `beta = 1 +
/// (total_trials - total_successes)`.
#[derive(Debug, Clone)]
pub struct Strategy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mode: String,
    pub parameters: Value,
    pub is_active: bool,
    pub alpha: f64,
    pub beta: f64,
    pub total_trials: u64,
    pub total_successes: u64,
}

impl Strategy {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            mode: String::new(),
            parameters: Value::Null,
            is_active: true,
            alpha: 1.0,
            beta: 1.0,
            total_trials: 0,
            total_successes: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_trials > 0 {
            self.total_successes as f64 / self.total_trials as f64
        } else {
            0.0
        }
    }
}

/// Outcome of executing a strategy against a problem, used to update
/// that strategy's posterior.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub id: String,
    pub strategy_id: String,
    pub problem_id: String,
    pub problem_type: String,
    pub description: String,
    pub success: bool,
    pub confidence_before: f64,
    pub confidence_after: f64,
    pub execution_time_ns: u64,
    pub token_count: u64,
    pub reasoning_path: Vec<String>,
    pub timestamp: i64,
    pub metadata: HashMap<String, Value>,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Bayesian bandit over a fixed set of named strategies.
pub struct ThompsonSelector {
    strategies: Mutex<Vec<Strategy>>,
    rng: Mutex<StdRng>,
    selections: Mutex<Vec<String>>,
    outcomes: Mutex<Vec<bool>>,
}

impl ThompsonSelector {
    pub fn new(seed: u64) -> Self {
        Self {
            strategies: Mutex::new(Vec::new()),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            selections: Mutex::new(Vec::new()),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Register `strategy`. A degenerate/unset `alpha`/`beta` (`<= 0.0`)
    /// is reset to the uniform prior; a legitimate informative prior
    /// below `1.0` (e.g. Jeffreys' `0.5`/`0.5`) is left as configured.
    pub fn add_strategy(&self, mut strategy: Strategy) {
        if strategy.alpha <= 0.0 {
            strategy.alpha = 1.0;
        }
        if strategy.beta <= 0.0 {
            strategy.beta = 1.0;
        }
        self.strategies.lock().push(strategy);
    }

    /// Draw one Thompson sample per active strategy and return the
    /// argmax, breaking ties by iteration order.
    pub fn select_strategy(&self, _problem_context: &str) -> Result<Strategy, ThompsonError> {
        let strategies = self.strategies.lock();
        let mut rng = self.rng.lock();

        let mut best: Option<(usize, f64)> = None;
        for (idx, strategy) in strategies.iter().enumerate() {
            if !strategy.is_active {
                continue;
            }
            let theta = sampler::sample_beta(strategy.alpha, strategy.beta, &mut *rng);
            if best.is_none_or(|(_, best_theta)| theta > best_theta) {
                best = Some((idx, theta));
            }
        }

        let Some((idx, _)) = best else {
            return Err(ThompsonError::NoActiveStrategies);
        };
        let chosen = strategies[idx].clone();
        drop(strategies);
        drop(rng);

        self.selections.lock().push(chosen.id.clone());
        Ok(chosen)
    }

    /// Update the named strategy's posterior and trial counters.
    pub fn record_outcome(&self, id: &str, success: bool) -> Result<(), ThompsonError> {
        let mut strategies = self.strategies.lock();
        let strategy = strategies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ThompsonError::StrategyNotFound(id.to_string()))?;

        if success {
            strategy.alpha += 1.0;
            strategy.total_successes += 1;
        } else {
            strategy.beta += 1.0;
        }
        strategy.total_trials += 1;
        drop(strategies);

        self.outcomes.lock().push(success);
        Ok(())
    }

    /// Highest empirical success rate among active strategies, ties
    /// broken by higher `total_trials` then lexicographic id.
    pub fn get_best_strategy(&self) -> Result<Strategy, ThompsonError> {
        let strategies = self.strategies.lock();
        strategies
            .iter()
            .filter(|s| s.is_active)
            .max_by(|a, b| {
                a.success_rate()
                    .partial_cmp(&b.success_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.total_trials.cmp(&b.total_trials))
                    .then_with(|| b.id.cmp(&a.id))
            })
            .cloned()
            .ok_or(ThompsonError::NoActiveStrategies)
    }

    /// Monte-Carlo selection-frequency distribution over `n_samples`
    /// independent draws (does not consume real selection history).
    pub fn get_strategy_distribution(&self, n_samples: usize) -> Result<HashMap<String, f64>, ThompsonError> {
        if n_samples == 0 {
            return Ok(HashMap::new());
        }
        let strategies = self.strategies.lock();
        let active: Vec<&Strategy> = strategies.iter().filter(|s| s.is_active).collect();
        if active.is_empty() {
            return Err(ThompsonError::NoActiveStrategies);
        }

        let mut rng = self.rng.lock();
        let mut counts: HashMap<String, u64> = HashMap::new();
        for _ in 0..n_samples {
            let mut best: Option<(&str, f64)> = None;
            for strategy in &active {
                let theta = sampler::sample_beta(strategy.alpha, strategy.beta, &mut *rng);
                if best.is_none_or(|(_, best_theta)| theta > best_theta) {
                    best = Some((&strategy.id, theta));
                }
            }
            if let Some((id, _)) = best {
                *counts.entry(id.to_string()).or_insert(0) += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(id, count)| (id, count as f64 / n_samples as f64))
            .collect())
    }

    /// Reset the named strategy to the uniform prior with no trials.
    pub fn reset_strategy(&self, id: &str) -> Result<(), ThompsonError> {
        let mut strategies = self.strategies.lock();
        let strategy = strategies
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ThompsonError::StrategyNotFound(id.to_string()))?;
        strategy.alpha = 1.0;
        strategy.beta = 1.0;
        strategy.total_trials = 0;
        strategy.total_successes = 0;
        Ok(())
    }

    pub fn selections(&self) -> Vec<String> {
        self.selections.lock().clone()
    }

    pub fn outcomes(&self) -> Vec<bool> {
        self.outcomes.lock().clone()
    }
}

/// Build an [`Outcome`] with the current Unix timestamp, matching the
/// spec's "timestamp" field semantics without requiring callers to
/// thread clock access through every call site.
pub fn new_outcome(
    id: impl Into<String>,
    strategy_id: impl Into<String>,
    problem_id: impl Into<String>,
    success: bool,
) -> Outcome {
    Outcome {
        id: id.into(),
        strategy_id: strategy_id.into(),
        problem_id: problem_id.into(),
        problem_type: String::new(),
        description: String::new(),
        success,
        confidence_before: 0.0,
        confidence_after: 0.0,
        execution_time_ns: 0,
        token_count: 0,
        reasoning_path: Vec::new(),
        timestamp: now_unix(),
        metadata: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_outcome_updates_posterior() {
        let selector = ThompsonSelector::new(1);
        selector.add_strategy(Strategy::new("a", "A"));
        selector.record_outcome("a", true).unwrap();
        let strategies = selector.strategies.lock();
        let a = strategies.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.alpha, 2.0);
        assert_eq!(a.beta, 1.0);
        assert_eq!(a.total_trials, 1);
        assert_eq!(a.total_successes, 1);
    }

    #[test]
    fn record_outcome_failure_updates_beta_only() {
        let selector = ThompsonSelector::new(1);
        selector.add_strategy(Strategy::new("a", "A"));
        selector.record_outcome("a", false).unwrap();
        let strategies = selector.strategies.lock();
        let a = strategies.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.alpha, 1.0);
        assert_eq!(a.beta, 2.0);
        assert_eq!(a.total_successes, 0);
    }

    #[test]
    fn select_strategy_errors_when_none_active() {
        let selector = ThompsonSelector::new(1);
        let mut s = Strategy::new("a", "A");
        s.is_active = false;
        selector.add_strategy(s);
        assert!(matches!(
            selector.select_strategy("ctx"),
            Err(ThompsonError::NoActiveStrategies)
        ));
    }

    #[test]
    fn thompson_learns_better_strategy() {
        let selector = ThompsonSelector::new(42);
        selector.add_strategy(Strategy::new("good", "Good"));
        selector.add_strategy(Strategy::new("bad", "Bad"));

        let mut rng = StdRng::seed_from_u64(99);
        use rand::Rng;
        for _ in 0..100 {
            let chosen = selector.select_strategy("ctx").unwrap();
            let true_rate = if chosen.id == "good" { 0.8 } else { 0.2 };
            let success = rng.gen_range(0.0..1.0) < true_rate;
            selector.record_outcome(&chosen.id, success).unwrap();
        }

        let strategies = selector.strategies.lock();
        let good = strategies.iter().find(|s| s.id == "good").unwrap();
        let bad = strategies.iter().find(|s| s.id == "bad").unwrap();
        assert!(good.success_rate() > bad.success_rate());
    }

    #[test]
    fn exploration_favors_dominant_strategy() {
        let selector = ThompsonSelector::new(7);
        let mut good = Strategy::new("good", "Good");
        good.alpha = 20.0;
        good.beta = 2.0;
        selector.add_strategy(good);
        selector.add_strategy(Strategy::new("unknown", "Unknown"));

        let mut good_count = 0;
        let mut unknown_count = 0;
        for _ in 0..1000 {
            let chosen = selector.select_strategy("ctx").unwrap();
            if chosen.id == "good" {
                good_count += 1;
            } else {
                unknown_count += 1;
            }
        }
        assert!(good_count > 700);
        assert!(unknown_count > 50);
    }

    #[test]
    fn reset_strategy_restores_uniform_prior() {
        let selector = ThompsonSelector::new(1);
        selector.add_strategy(Strategy::new("a", "A"));
        selector.record_outcome("a", true).unwrap();
        selector.reset_strategy("a").unwrap();
        let strategies = selector.strategies.lock();
        let a = strategies.iter().find(|s| s.id == "a").unwrap();
        assert_eq!(a.alpha, 1.0);
        assert_eq!(a.beta, 1.0);
        assert_eq!(a.total_trials, 0);
    }

    #[test]
    fn get_best_strategy_by_success_rate() {
        let selector = ThompsonSelector::new(1);
        let mut a = Strategy::new("a", "A");
        a.total_trials = 10;
        a.total_successes = 8;
        let mut b = Strategy::new("b", "B");
        b.total_trials = 10;
        b.total_successes = 3;
        selector.add_strategy(a);
        selector.add_strategy(b);

        let best = selector.get_best_strategy().unwrap();
        assert_eq!(best.id, "a");
    }
}
