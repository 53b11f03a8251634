//! Descriptive statistics and the two-sample z-test.
//!
//! The z-test assumes approximately normal sampling distributions of the
//! means, which holds once the sample-size gate (30 per arm by default)
//! is enforced. It is not a t-test.

use std::f64::consts::SQRT_2;

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n - 1 denominator); 0 below two samples.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    sum_sq / (values.len() - 1) as f64
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
#[must_use]
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF.
#[must_use]
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / SQRT_2))
}

/// Outcome of a two-sample z-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZTest {
    /// `(mean_t - mean_c) / se`
    pub z_score: f64,
    /// Standard error of the difference of means.
    pub standard_error: f64,
    /// Two-tailed p-value, `2 * (1 - Φ(|z|))`.
    pub p_value: f64,
    /// `1 - p_value`.
    pub confidence: f64,
}

/// Two-sample z-test of `treatment` against `control`.
///
/// Returns `None` when the standard error is zero (both arms constant)
/// or not finite; such a comparison is treated as not significant.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn two_sample_z_test(control: &[f64], treatment: &[f64]) -> Option<ZTest> {
    if control.is_empty() || treatment.is_empty() {
        return None;
    }
    let n_c = control.len() as f64;
    let n_t = treatment.len() as f64;
    let se = (sample_variance(control) / n_c + sample_variance(treatment) / n_t).sqrt();
    if se == 0.0 || !se.is_finite() {
        return None;
    }

    let z_score = (mean(treatment) - mean(control)) / se;
    let p_value = (2.0 * (1.0 - normal_cdf(z_score.abs()))).clamp(0.0, 1.0);
    Some(ZTest {
        z_score,
        standard_error: se,
        p_value,
        confidence: 1.0 - p_value,
    })
}
