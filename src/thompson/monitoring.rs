//! Performance, exploration, and learning reports over the selector's
//! accumulated strategy and selection state.

use super::Strategy;

/// Per-strategy posterior-vs-empirical convergence snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceReport {
    pub success_rate: f64,
    pub expected: f64,
    pub convergence_gap: f64,
    pub is_converged: bool,
}

/// Minimum trials required before a strategy is eligible to be
/// considered converged, regardless of its gap.
const CONVERGENCE_MIN_TRIALS: u64 = 20;

pub fn performance_report(strategy: &Strategy, threshold: f64) -> PerformanceReport {
    let success_rate = if strategy.total_trials > 0 {
        strategy.total_successes as f64 / strategy.total_trials as f64
    } else {
        0.0
    };
    let expected = strategy.alpha / (strategy.alpha + strategy.beta);
    let convergence_gap = (expected - success_rate).abs();
    let is_converged = strategy.total_trials >= CONVERGENCE_MIN_TRIALS && convergence_gap < threshold;

    PerformanceReport {
        success_rate,
        expected,
        convergence_gap,
        is_converged,
    }
}

/// How evenly selections are spread across strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationBand {
    Low,
    Balanced,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationReport {
    pub exploration_rate: f64,
    pub entropy: f64,
    pub band: ExplorationBand,
}

pub fn exploration_report(selections: &[String], best_strategy_id: &str) -> ExplorationReport {
    if selections.is_empty() {
        return ExplorationReport {
            exploration_rate: 0.0,
            entropy: 0.0,
            band: ExplorationBand::Low,
        };
    }

    let total = selections.len() as f64;
    let greedy_count = selections.iter().filter(|id| id.as_str() == best_strategy_id).count() as f64;
    let exploration_rate = 1.0 - greedy_count / total;

    let mut counts = std::collections::HashMap::new();
    for id in selections {
        *counts.entry(id.as_str()).or_insert(0u64) += 1;
    }
    let entropy = -counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            p * p.log2()
        })
        .sum::<f64>();

    let band = if exploration_rate < 0.15 {
        ExplorationBand::Low
    } else if exploration_rate <= 0.50 {
        ExplorationBand::Balanced
    } else {
        ExplorationBand::High
    };

    ExplorationReport {
        exploration_rate,
        entropy,
        band,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LearningReport {
    pub initial_accuracy: f64,
    pub current_accuracy: f64,
    pub improvement: f64,
    pub trend: LearningTrend,
    pub converged: bool,
}

const TREND_THRESHOLD: f64 = 0.05;
const CONVERGED_MIN_OUTCOMES: usize = 50;
const CONVERGED_DELTA: f64 = 0.02;

pub fn learning_report(outcomes: &[bool], window: usize) -> LearningReport {
    let n = outcomes.len();
    if n == 0 {
        return LearningReport {
            initial_accuracy: 0.0,
            current_accuracy: 0.0,
            improvement: 0.0,
            trend: LearningTrend::Stable,
            converged: false,
        };
    }

    let mean = |slice: &[bool]| -> f64 {
        if slice.is_empty() {
            0.0
        } else {
            slice.iter().filter(|o| **o).count() as f64 / slice.len() as f64
        }
    };

    let initial_window = window.min(n.div_ceil(5)).max(1);
    let initial_accuracy = mean(&outcomes[..initial_window]);

    let current_window = window.min(n);
    let current_accuracy = mean(&outcomes[n - current_window..]);

    let improvement = current_accuracy - initial_accuracy;
    let trend = if improvement.abs() <= TREND_THRESHOLD {
        LearningTrend::Stable
    } else if improvement > 0.0 {
        LearningTrend::Improving
    } else {
        LearningTrend::Declining
    };
    let converged = n >= CONVERGED_MIN_OUTCOMES && improvement.abs() < CONVERGED_DELTA;

    LearningReport {
        initial_accuracy,
        current_accuracy,
        improvement,
        trend,
        converged,
    }
}
