use super::normal_cdf;

/// Result of a Wilcoxon signed-rank test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WilcoxonOutcome {
    /// Sum of the ranks of the positive differences.
    pub statistic: f64,

    /// Number of non-zero differences.
    pub n_nonzero: usize,

    /// Two-sided p-value.
    pub p_value: f64,

    /// `true` if the p-value comes from the exact null distribution.
    pub exact: bool,
}

const MAX_EXACT: usize = 20;

/// Average ranks of `|d|` and the sizes of the tie groups.
fn signed_ranks(d: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut ix: Vec<usize> = (0..d.len()).collect();
    ix.sort_by(|&a, &b| d[a].abs().total_cmp(&d[b].abs()));

    let mut ranks = vec![0.0; d.len()];
    let mut ties = vec![];
    let mut i = 0;
    while i < ix.len() {
        let mut j = i + 1;
        while j < ix.len() && d[ix[j]].abs() == d[ix[i]].abs() {
            j += 1;
        }
        // ranks i+1..=j share their average
        let r = 0.5 * ((i + 1) + j) as f64;
        for &k in &ix[i..j] {
            ranks[k] = r;
        }
        if j - i > 1 {
            ties.push(j - i);
        }
        i = j;
    }
    (ranks, ties)
}

/// Two-sided p-value of `W+ = w` under the exact null distribution for `n` ranks.
fn exact_p_value(w: usize, n: usize) -> f64 {
    let max = n * (n + 1) / 2;
    let mut counts = vec![0f64; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    let total = 2f64.powi(n as i32);
    let lower = counts[..=w].iter().sum::<f64>() / total;
    let upper = counts[w..].iter().sum::<f64>() / total;
    (2.0 * lower.min(upper)).min(1.0)
}

/// Wilcoxon signed-rank test on per-seed differences.
///
/// Zero differences are dropped. The exact null distribution is used for at most 20
/// non-zero differences without ties, otherwise the normal approximation with tie
/// and continuity correction.
pub fn wilcoxon_signed_rank(diffs: &[f64]) -> WilcoxonOutcome {
    let d: Vec<f64> = diffs.iter().copied().filter(|x| *x != 0.0).collect();
    let n = d.len();
    if n == 0 {
        return WilcoxonOutcome {
            statistic: 0.0,
            n_nonzero: 0,
            p_value: 1.0,
            exact: true,
        };
    }

    let (ranks, ties) = signed_ranks(&d);
    let statistic: f64 = d
        .iter()
        .zip(ranks.iter())
        .filter(|(x, _)| **x > 0.0)
        .map(|(_, r)| r)
        .sum();

    if n <= MAX_EXACT && ties.is_empty() {
        return WilcoxonOutcome {
            statistic,
            n_nonzero: n,
            p_value: exact_p_value(statistic.round() as usize, n),
            exact: true,
        };
    }

    let nf = n as f64;
    let mu = nf * (nf + 1.0) / 4.0;
    let tie_term: f64 = ties.iter().map(|&t| (t * t * t - t) as f64).sum::<f64>() / 48.0;
    let var = nf * (nf + 1.0) * (2.0 * nf + 1.0) / 24.0 - tie_term;
    let p_value = if var <= 0.0 {
        1.0
    } else {
        let z = ((statistic - mu).abs() - 0.5).max(0.0) / var.sqrt();
        (2.0 * (1.0 - normal_cdf(z))).min(1.0)
    };
    WilcoxonOutcome {
        statistic,
        n_nonzero: n,
        p_value,
        exact: false,
    }
}
