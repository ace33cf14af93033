//! Globally-indexed bins over an ordered collection of genome maps.
//!
//! A [`Bins`] object holds the raw genome records (taxonomy ID, assembled
//! length, region names and lengths). From it, a *bin mapper* lays out
//! bins on every region of every genome, numbering them with global
//! indices so a single integer identifies an interval on one region of one
//! genome. Three layouts are available:
//!
//!  * [`Bins::uniform_bin_mapper`]: bins of the same width everywhere.
//!  * [`Bins::fixed_bin_mapper`]: about the same number of bins per genome.
//!  * [`Bins::variable_bin_mapper`]: caller-supplied intervals.
//!
//! `UNANCHORED` regions, which gather unplaced sequence, always form a
//! single bin in the regular layouts.
//!
//! ```no_run
//! use genbins::prelude::*;
//! let bins = Bins::from_json_file("genomes.json").expect("cannot read genomes");
//! let mapper = bins.fixed_bin_mapper(200).expect("cannot lay out bins");
//!
//! let idx = mapper.pos2bin(3702, "1", 1_000_000).expect("lookup failed");
//! let bin = mapper.bin2pos(idx).expect("bin out of range");
//! println!("{}\t{}\t{}\t{}", bin.taxon_id, bin.region, bin.start, bin.end);
//! ```
//!
//! Per-bin results (such as gene counts) computed elsewhere can then be
//! attached to the binned genomes, which rolls them up to regions, genomes
//! and the whole collection:
//!
//! ```no_run
//! use genbins::prelude::*;
//! let bins = Bins::from_json_file("genomes.json").expect("cannot read genomes");
//! let mut mapper = bins.fixed_bin_mapper(200).expect("cannot lay out bins");
//!
//! let results = ResultSet::from_json_file("results-fixed_200__bin.json")
//!                   .expect("invalid results");
//! let rollup = mapper.binned_genomes_mut().set_results(&results, false)
//!                   .expect("results do not fit these bins");
//! println!("{} genes in {} bins", rollup.results.count, rollup.results.bins);
//! ```

pub mod bins;
pub mod file;
pub mod genomes;
mod numeric;
pub mod results;
pub mod stats;

pub use bins::{BinError, BinLayout, BinMapper, Bins, Interval};
pub use genomes::{Bin, Genome, Genomes, Region};

pub mod prelude {
    pub use crate::bins::{
        read_intervals, BinError, BinLayout, BinMapper, Bins, FixedBins, Interval, UniformBins,
        VariableBins,
    };
    pub use crate::genomes::{
        read_genomes, Bin, BinIdx, Genome, Genomes, Position, RawGenome, RawRegions, Region,
        TaxonId, UNANCHORED,
    };
    pub use crate::results::{BinResult, ResultSet, Rollup, RollupResults};
    pub use crate::stats::{calc_stats, Counted, GlobalStats, Stats};
}
