use serde::{Deserialize, Serialize};

use crate::genomes::Bin;
use crate::results::{BinResult, RollupResults};

/// Anything with a count that can be summarized by [`calc_stats`].
pub trait Counted {
    fn count(&self) -> u64;
}

impl Counted for u64 {
    fn count(&self) -> u64 {
        *self
    }
}

impl Counted for BinResult {
    fn count(&self) -> u64 {
        self.count
    }
}

impl Counted for RollupResults {
    fn count(&self) -> u64 {
        self.count
    }
}

impl<T: Counted + ?Sized> Counted for &T {
    fn count(&self) -> u64 {
        (**self).count()
    }
}

/// Summary statistics of a set of counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    /// The number of items.
    pub count: usize,
    pub sum: u128,
    pub min: u64,
    pub max: u64,
    pub sum_sq: f64,
    pub avg: f64,
    /// The population standard deviation.
    pub stdev: f64,
}

/// Summarize the counts of `items`, or `None` if there are no items.
pub fn calc_stats<I>(items: I) -> Option<Stats>
where
    I: IntoIterator,
    I::Item: Counted,
{
    let mut n = 0_usize;
    let mut sum = 0_u128;
    let mut sum_sq = 0.0_f64;
    let mut min = u64::MAX;
    let mut max = 0_u64;
    for item in items {
        let count = item.count();
        n += 1;
        sum += u128::from(count);
        sum_sq += (count as f64) * (count as f64);
        min = min.min(count);
        max = max.max(count);
    }
    if n == 0 {
        return None;
    }

    let avg = sum as f64 / n as f64;
    // rounding can push a zero variance slightly negative
    let variance = (sum_sq / n as f64 - avg * avg).max(0.0);
    Some(Stats {
        count: n,
        sum,
        min,
        max,
        sum_sq,
        avg,
        stdev: variance.sqrt(),
    })
}

/// Collection-wide statistics over genome totals and anchored bins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GlobalStats {
    pub genomes: Option<Stats>,
    pub bins: Option<Stats>,
}

/// Summarize the per-genome rollups and the counts of all bins outside
/// `UNANCHORED` regions, reading totals instead of results if `is_total`.
pub fn global_stats<'a, G>(bins: &[Bin], genome_rollups: G, is_total: bool) -> GlobalStats
where
    G: IntoIterator<Item = &'a RollupResults>,
{
    let genome_counts = genome_rollups
        .into_iter()
        .map(|rollup| if is_total { rollup.total } else { rollup.count });
    let bin_counts = bins
        .iter()
        .filter(|bin| !bin.is_unanchored())
        .map(|bin| bin.result(is_total).map_or(0, |r| r.count));

    GlobalStats {
        genomes: calc_stats(genome_counts),
        bins: calc_stats(bin_counts),
    }
}
