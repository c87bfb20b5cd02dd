//! Descriptive statistics and paired significance tests across seeds.
//!
//! All functions work on `f64` samples. Paired tests take the per-seed differences
//! `learned - baseline`.
mod special;
mod wilcoxon;
pub use special::{erfc, incomplete_beta, ln_gamma};
pub use wilcoxon::{wilcoxon_signed_rank, WilcoxonOutcome};

/// Sample mean, `0` for an empty sample.
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (`n - 1` denominator), `0` for fewer than two values.
pub fn std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let ss = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>();
    (ss / (xs.len() - 1) as f64).sqrt()
}

/// Standard normal CDF.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Two-sided tail probability `P(|T| >= |t|)` of Student's t with `df` degrees of
/// freedom.
pub fn t_two_sided(t: f64, df: f64) -> f64 {
    if t.is_infinite() {
        return 0.0;
    }
    incomplete_beta(0.5 * df, 0.5, df / (df + t * t))
}

/// CDF of Student's t with `df` degrees of freedom.
pub fn t_cdf(t: f64, df: f64) -> f64 {
    let tail = 0.5 * t_two_sided(t, df);
    if t >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Quantile of Student's t with `df` degrees of freedom, for `p` in `(0, 1)`.
pub fn t_quantile(p: f64, df: f64) -> f64 {
    if p == 0.5 {
        return 0.0;
    }
    let target = p.max(1.0 - p);
    let (mut lo, mut hi) = (0.0, 1.0);
    while t_cdf(hi, df) < target && hi < 1e8 {
        hi *= 2.0;
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if t_cdf(mid, df) < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    let q = 0.5 * (lo + hi);
    if p > 0.5 {
        q
    } else {
        -q
    }
}

/// t-based confidence interval of the mean at level `confidence`.
///
/// Returns `None` for fewer than two values.
pub fn confidence_interval(xs: &[f64], confidence: f64) -> Option<(f64, f64)> {
    let n = xs.len();
    if n < 2 {
        return None;
    }
    let m = mean(xs);
    let half = t_quantile(0.5 + 0.5 * confidence, (n - 1) as f64) * std_dev(xs) / (n as f64).sqrt();
    Some((m - half, m + half))
}

/// Result of a paired t-test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTestOutcome {
    /// t statistic.
    pub statistic: f64,

    /// Degrees of freedom.
    pub df: f64,

    /// Two-sided p-value.
    pub p_value: f64,
}

/// Paired t-test on per-seed differences.
///
/// Returns `None` for fewer than two differences. With zero variance the p-value is
/// `1` if all differences are zero and `0` otherwise.
pub fn paired_t_test(diffs: &[f64]) -> Option<TTestOutcome> {
    let n = diffs.len();
    if n < 2 {
        return None;
    }
    let df = (n - 1) as f64;
    let m = mean(diffs);
    let sd = std_dev(diffs);
    if sd == 0.0 {
        let (statistic, p_value) = if m == 0.0 {
            (0.0, 1.0)
        } else {
            (m.signum() * f64::INFINITY, 0.0)
        };
        return Some(TTestOutcome {
            statistic,
            df,
            p_value,
        });
    }
    let statistic = m / (sd / (n as f64).sqrt());
    Some(TTestOutcome {
        statistic,
        df,
        p_value: t_two_sided(statistic, df),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_mean_std() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(approx_eq(mean(&xs), 5.0, 1e-12));
        assert!(approx_eq(std_dev(&xs), (32.0f64 / 7.0).sqrt(), 1e-12));
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(std_dev(&[3.0]), 0.0);
    }

    #[test]
    fn test_t_quantiles() {
        assert!(approx_eq(t_quantile(0.975, 1.0), 12.706_204_7, 1e-6));
        assert!(approx_eq(t_quantile(0.975, 4.0), 2.776_445_1, 1e-6));
        assert!(approx_eq(t_quantile(0.975, 9.0), 2.262_157_2, 1e-6));
        assert!(approx_eq(t_quantile(0.95, 10.0), 1.812_461_1, 1e-6));
        assert!(approx_eq(t_quantile(0.025, 4.0), -2.776_445_1, 1e-6));
    }

    #[test]
    fn test_t_tail() {
        assert!(approx_eq(t_two_sided(2.0, 10.0), 0.073_388, 1e-5));
        assert!(approx_eq(t_cdf(0.0, 3.0), 0.5, 1e-12));
    }

    #[test]
    fn test_normal_cdf() {
        assert!(approx_eq(normal_cdf(0.0), 0.5, 1e-7));
        assert!(approx_eq(normal_cdf(1.96), 0.975, 1e-4));
    }

    #[test]
    fn test_paired_t_test() {
        let r = paired_t_test(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(approx_eq(r.statistic, 4.242_640_7, 1e-6));
        assert_eq!(r.df, 4.0);
        assert!(approx_eq(r.p_value, 0.013_235_6, 1e-6));

        let r = paired_t_test(&[0.5, 1.5, -0.5, 2.0, 1.0, 0.5]).unwrap();
        assert!(approx_eq(r.p_value, 0.067_105_8, 1e-6));

        assert!(paired_t_test(&[1.0]).is_none());
        assert_eq!(paired_t_test(&[0.0, 0.0, 0.0]).unwrap().p_value, 1.0);
        assert_eq!(paired_t_test(&[2.0, 2.0, 2.0]).unwrap().p_value, 0.0);
    }

    #[test]
    fn test_confidence_interval_shrinks_with_samples() {
        let few = [1.0, 2.0, 3.0, 4.0];
        let many: Vec<f64> = few.iter().cycle().take(40).copied().collect();
        let (lo1, hi1) = confidence_interval(&few, 0.95).unwrap();
        let (lo2, hi2) = confidence_interval(&many, 0.95).unwrap();
        assert!(approx_eq(0.5 * (lo1 + hi1), 2.5, 1e-12));
        assert!(hi2 - lo2 < hi1 - lo1);
        assert!(confidence_interval(&[1.0], 0.95).is_none());
    }
}
