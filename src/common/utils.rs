//! Stateless numeric helpers shared by the bag model,
//! the evaluation harness, and the classifiers.
//!
//! Missing values are represented by `f64::NAN`.


/// Tolerance used by [`eq`].
pub(crate) const SMALL: f64 = 1e-6;


/// Returns `true` if `a` and `b` differ by less than [`SMALL`].
#[inline(always)]
pub fn eq(a: f64, b: f64) -> bool {
    (a - b).abs() < SMALL
}


/// Returns `true` if `a > b + SMALL`.
#[inline(always)]
pub fn gr(a: f64, b: f64) -> bool {
    a - b > SMALL
}


/// Returns the inner product of two slices.
#[inline(always)]
pub fn inner_product(v1: &[f64], v2: &[f64]) -> f64 {
    v1.iter()
        .zip(v2)
        .map(|(a, b)| a * b)
        .sum::<f64>()
}


/// Returns the index of the first maximum element.
/// Returns `0` for an empty slice.
#[inline]
pub fn max_index(values: &[f64]) -> usize {
    let mut best = 0_usize;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}


/// Divides each element of `values` by `sum`.
/// Does nothing if `sum` is zero or not finite.
#[inline]
pub fn normalize(values: &mut [f64], sum: f64) {
    if sum == 0.0 || !sum.is_finite() { return; }
    values.iter_mut()
        .for_each(|v| *v /= sum);
}


/// Weighted mean over the non-missing pairs `(value, weight)`.
/// Returns `None` if no pair carries a positive weight.
pub fn weighted_mean<I>(pairs: I) -> Option<f64>
    where I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, sum_of_weights) = pairs.into_iter()
        .filter(|(x, _)| !x.is_nan())
        .fold((0.0, 0.0), |(s, sw), (x, w)| (s + w * x, sw + w));

    if sum_of_weights > 0.0 {
        Some(sum / sum_of_weights)
    } else {
        None
    }
}


/// Weighted sample variance over the non-missing pairs
/// `(value, weight)`:
/// ```txt
///     (Σ w x² - (Σ w x)² / Σ w) / (Σ w - 1)
/// ```
/// Returns `0` when `Σ w <= 1` and clips negative rounding noise to `0`.
pub fn weighted_variance<I>(pairs: I) -> f64
    where I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, sum_sq, sum_of_weights) = pairs.into_iter()
        .filter(|(x, _)| !x.is_nan())
        .fold((0.0, 0.0, 0.0), |(s, ss, sw), (x, w)| {
            (s + w * x, ss + w * x * x, sw + w)
        });

    if sum_of_weights <= 1.0 { return 0.0; }

    let variance = (sum_sq - sum * sum / sum_of_weights)
        / (sum_of_weights - 1.0);
    variance.max(0.0)
}


/// Weighted mode of a nominal column with `n_values` distinct values.
/// Each pair is `(code, weight)` where `code` is the value index.
/// Ties are broken in favor of the smaller code.
pub fn weighted_mode<I>(pairs: I, n_values: usize) -> usize
    where I: IntoIterator<Item = (f64, f64)>,
{
    let mut counts = vec![0.0; n_values];
    pairs.into_iter()
        .filter(|(x, _)| !x.is_nan())
        .for_each(|(x, w)| {
            let k = x as usize;
            if k < n_values { counts[k] += w; }
        });
    max_index(&counts)
}


/// Median of the given values. Returns `NaN` for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() { return f64::NAN; }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let half = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[half - 1] + sorted[half]) / 2.0
    } else {
        sorted[half]
    }
}


/// Right-aligns `value` in a field of `width` characters
/// with `after_decimal` digits after the decimal point.
#[inline]
pub fn double_to_string(value: f64, width: usize, after_decimal: usize)
    -> String
{
    format!("{value:>width$.after_decimal$}")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_index_keeps_first_maximum() {
        assert_eq!(max_index(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(max_index(&[]), 0);
    }

    #[test]
    fn weighted_statistics_skip_missing() {
        let pairs = vec![(1.0, 1.0), (f64::NAN, 5.0), (3.0, 1.0)];
        assert_eq!(weighted_mean(pairs.clone()), Some(2.0));
        assert!((weighted_variance(pairs) - 2.0).abs() < 1e-12);
        assert_eq!(weighted_mean(vec![(f64::NAN, 1.0)]), None);
    }

    #[test]
    fn mode_and_median() {
        let pairs = vec![(0.0, 1.0), (2.0, 0.7), (2.0, 0.7)];
        assert_eq!(weighted_mode(pairs, 3), 2);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }
}
