use num_traits::{cast::ToPrimitive, Float};
use std::fmt::Display;

/// Assert to float values are the same up to `eps`.
#[allow(dead_code)]
pub fn assert_float_eq<T>(left: T, right: T, eps: T)
where
    T: Float + Display,
{
    if left.is_nan() {
        assert!(right.is_nan(), "left is NaN, but right is not");
    } else {
        let diff = (left - right).abs();
        assert!(
            diff < eps,
            "values |{} - {}| ≥ {} (diff: {})",
            left,
            right,
            eps,
            diff
        );
    }
}

/// Convert any primitive numeric value to a finite `f64`, or `None` if the
/// value cannot be represented or is NaN/infinite.
pub fn finite_f64<T: ToPrimitive>(value: &T) -> Option<f64> {
    value.to_f64().filter(|x| x.is_finite())
}

/// Integer ceiling division, with `ceil_div(0, w) == 0`.
pub fn ceil_div(numerator: u64, denominator: u64) -> u64 {
    debug_assert!(denominator > 0);
    numerator / denominator + u64::from(numerator % denominator != 0)
}

/// Bisect for a bin width whose bin count is as close as possible to (but
/// not above) `target`.
///
/// `count_bins` must be non-increasing in the width. The search starts
/// from the bracket `(lower, upper)` where `count_bins(lower) > target`.
/// While `count_bins(upper)` is still above `target`, `upper` is doubled
/// until it reaches `max_width` (the width at which no region can be split
/// further). The bracket is then narrowed by midpoint until it collapses
/// or `count_bins(upper) == target`; `upper` is returned.
///
/// # Arguments
///  * `lower`: a width known to produce too many bins.
///  * `upper`: the initial guess for a width producing few enough bins.
///  * `max_width`: the largest width worth considering.
///  * `target`: the desired bin count.
///  * `count_bins`: the number of bins produced by a given width.
pub fn bisect_bin_width<F>(
    lower: u64,
    upper: u64,
    max_width: u64,
    target: u64,
    count_bins: F,
) -> u64
where
    F: Fn(u64) -> u64,
{
    let mut b = lower.max(1);
    let mut a = upper.max(b);
    while count_bins(a) > target && a < max_width {
        a = a.saturating_mul(2).min(max_width);
    }
    if count_bins(a) > target {
        // every region already fits in one bin; nothing narrower helps
        return a;
    }
    while a - b > 1 && count_bins(a) != target {
        let mid = b + (a - b) / 2;
        if count_bins(mid) <= target {
            a = mid;
        } else {
            b = mid;
        }
    }
    a
}

/// Find the interval containing `position` in a flattened, sorted array
/// of `start, end, start, end, ...` boundaries (inclusive on both ends).
///
/// A linear-interpolation guess of the interval is made inside the current
/// window `[a, b]`, which is then narrowed past the guessed interval. The
/// window shrinks on every iteration, so duplicate boundaries and
/// single-interval arrays cannot loop. Returns the interval number (half
/// the boundary index), or `None` if `position` falls between or outside
/// the intervals.
pub fn interpolation_search(boundaries: &[u64], position: f64) -> Option<usize> {
    if boundaries.len() < 2 || boundaries.len() % 2 != 0 || !position.is_finite() {
        return None;
    }
    let mut a = 0;
    let mut b = boundaries.len() - 1;
    while a < b {
        let lo = boundaries[a] as f64;
        let hi = boundaries[b] as f64;
        if position < lo || position > hi {
            return None;
        }
        let guess = if hi > lo {
            a + ((b - a) as f64 * (position - lo) / (hi - lo)).floor() as usize
        } else {
            a
        };
        // snap to an interval start that leaves room for its end
        let mut f = guess.min(b - 1);
        f -= f % 2;
        if position < boundaries[f] as f64 {
            if f == 0 {
                return None;
            }
            b = f - 1;
        } else if position > boundaries[f + 1] as f64 {
            a = f + 2;
        } else {
            return Some(f / 2);
        }
    }
    None
}
