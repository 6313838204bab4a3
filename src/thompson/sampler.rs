//! Beta/Gamma sampling for the Thompson selector.
//!
//! Implements the exact algorithm named in the bandit's posterior-draw
//! step: `Beta(α,β) = X/(X+Y)` where `X ~ Γ(α,1)`, `Y ~ Γ(β,1)`, with
//! `Γ` sampled via Marsaglia-Tsang for `α ≥ 1` and the
//! `Γ(α) = Γ(α+1)·U^(1/α)` identity for `α < 1`. Grounded in shape on
//! `other_examples`'s `BetaDistribution`/bandit pattern, generalized to
//! this exact sampler rather than transcribed from it.

use rand::Rng;

/// Standard normal variate via Box-Muller, avoiding a dependency on
/// `rand_distr` for a single distribution.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.gen_range(1e-12_f64..1.0_f64);
    let u2: f64 = rng.gen_range(0.0_f64..1.0_f64);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Sample from `Gamma(shape, 1)`. `shape <= 0.0` is treated as
/// degenerate by the caller ([`sample_beta`]); this function assumes
/// `shape > 0.0`.
pub fn sample_gamma(shape: f64, rng: &mut impl Rng) -> f64 {
    if shape < 1.0 {
        let boosted = sample_gamma(shape + 1.0, rng);
        let u: f64 = rng.gen_range(0.0_f64..1.0_f64);
        return boosted * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let (x, v) = loop {
            let x = standard_normal(rng);
            let v = 1.0 + c * x;
            if v > 0.0 {
                break (x, v);
            }
        };

        let v3 = v * v * v;
        let u: f64 = rng.gen_range(0.0_f64..1.0_f64);

        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v3;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v3 + v3.ln()) {
            return d * v3;
        }
    }
}

/// Draw one sample from `Beta(alpha, beta)` via the Gamma ratio method.
/// Degenerate inputs (`alpha <= 0` or `beta <= 0`) fall back to
/// `U(0,1)`; the vanishingly unlikely `X+Y == 0` case returns `0.5`.
pub fn sample_beta(alpha: f64, beta: f64, rng: &mut impl Rng) -> f64 {
    if alpha <= 0.0 || beta <= 0.0 {
        return rng.gen_range(0.0_f64..1.0_f64);
    }
    let x = sample_gamma(alpha, rng);
    let y = sample_gamma(beta, rng);
    if x + y == 0.0 {
        0.5
    } else {
        x / (x + y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn beta_samples_are_in_unit_interval() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let s = sample_beta(3.0, 5.0, &mut rng);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn degenerate_alpha_falls_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let s = sample_beta(0.0, 5.0, &mut rng);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn mean_converges_toward_alpha_over_alpha_plus_beta() {
        let mut rng = StdRng::seed_from_u64(42);
        let (alpha, beta) = (20.0, 5.0);
        let n = 5000;
        let sum: f64 = (0..n).map(|_| sample_beta(alpha, beta, &mut rng)).sum();
        let mean = sum / n as f64;
        let expected = alpha / (alpha + beta);
        assert!((mean - expected).abs() < 0.02);
    }

    #[test]
    fn gamma_alpha_less_than_one_is_positive() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let g = sample_gamma(0.3, &mut rng);
            assert!(g >= 0.0);
        }
    }
}
