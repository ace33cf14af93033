use genomap::GenomeMapError;
use indexmap::map::IndexMap;
use num_traits::cast::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::io;
use thiserror::Error;

use super::file::{FileError, InputFile};
use super::genomes::{
    read_genomes, Bin, BinIdx, Genome, Genomes, Position, RawGenome, TaxonId, UNANCHORED,
};
use super::numeric::{bisect_bin_width, finite_f64, interpolation_search};

/// Assembled genomes smaller than this (but not empty) cannot be given a
/// fixed number of bins.
pub const MIN_FIXED_GENOME_SIZE: Position = 100_000;

#[derive(Error, Debug)]
pub enum BinError {
    #[error("{0} must be numeric: {1}")]
    NonNumericParameter(&'static str, String),
    #[error("{0} must be a positive integer: {1}")]
    InvalidParameter(&'static str, String),
    #[error("region names and lengths of genome {0} differ in length")]
    MismatchedRegions(TaxonId),
    #[error("genome {0} has more than one region named '{1}'")]
    DuplicateRegion(TaxonId, String),
    #[error("taxonomy id {0} appears more than once")]
    DuplicateTaxon(TaxonId),
    #[error("inconsistencies in genome sizes! The assembled length of {taxon_id}'s genome ({assembled}) is longer than the sum of all regions of that genome ({full})")]
    GenomeSizeInconsistency {
        taxon_id: TaxonId,
        assembled: Position,
        full: Position,
    },
    #[error("assembled genome sizes between 1 and 100000 are not supported (genome {0}: {1})")]
    GenomeTooSmall(TaxonId, Position),
    #[error("{0} not a known taxonomy id")]
    UnknownTaxon(TaxonId),
    #[error("{0} not a known seq region")]
    UnknownRegion(String),
    #[error("position {0} out of range")]
    PositionOutOfRange(String),
    #[error("bin {0} out of range")]
    BinOutOfRange(String),
    #[error("index {0} is not a finite number")]
    IndexNotFinite(String),
    #[error("index {0} is not an integer")]
    IndexNotInteger(String),
    #[error("index {0} out of range (bin count {1})")]
    IndexOutOfRange(String, usize),
    #[error("start index {0} is after end index {1}")]
    InvalidBinRange(BinIdx, BinIdx),
    #[error("interval {0} starts after it ends")]
    InvalidInterval(Interval),
    #[error("overlapping bins found: {0} and {1}")]
    OverlappingBins(Interval, Interval),
    #[error("found two apparently identical bins: {0} and {1}")]
    DuplicateBins(Interval, Interval),
    #[error("Please supply valid results parameter ({0})")]
    InvalidResults(String),
    #[error("Results are for {found} bins. Should be {expected}")]
    ResultsLayoutMismatch { found: String, expected: String },
    #[error("Bin count mismatch! Results reach bin {0} but there are {1} bins")]
    BinCountMismatch(BinIdx, usize),
    #[error("result counts overflow: {0} + {1}")]
    CountOverflow(u64, u64),
    #[error("IO error: {0}")]
    IOError(#[from] io::Error),
    #[error("File reading error: {0}")]
    FileError(#[from] FileError),
    #[error("Interval parsing error: {0}")]
    IntervalParsingError(#[from] csv::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("GenomeMap Error: error updating GenomeMap")]
    GenomeMapError(#[from] GenomeMapError),
}

/// A caller-supplied bin for the variable layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub taxon_id: TaxonId,
    pub region: String,
    pub start: Position,
    pub end: Position,
}

impl Interval {
    pub fn new(taxon_id: TaxonId, region: &str, start: Position, end: Position) -> Self {
        Self {
            taxon_id,
            region: region.to_string(),
            start,
            end,
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}-{}", self.taxon_id, self.region, self.start, self.end)
    }
}

/// Read a tab-delimited file of variable bins: taxonomy ID, region name,
/// start and end (1-based, inclusive). Lines starting with `#` are skipped.
pub fn read_intervals(filepath: &str) -> Result<Vec<Interval>, BinError> {
    let reader = InputFile::new(filepath).reader()?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut intervals = Vec::new();
    for result in rdr.deserialize() {
        let interval: Interval = result?;
        intervals.push(interval);
    }
    Ok(intervals)
}

/// The bin layout strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinLayout {
    /// Bins of the same width everywhere.
    Uniform { bin_width: Position },
    /// About the same number of bins in every genome.
    Fixed { bins_per_genome: u64 },
    /// Caller-supplied intervals.
    Variable,
}

impl BinLayout {
    /// The name result sets computed on this layout carry. Variable layouts
    /// have none and accept any result set.
    pub fn display_name(&self) -> Option<String> {
        match self {
            BinLayout::Uniform { bin_width } => {
                Some(format!("uniform_{}Mb__bin", *bin_width as f64 / 1e6))
            }
            BinLayout::Fixed { bins_per_genome } => Some(format!("fixed_{}__bin", bins_per_genome)),
            BinLayout::Variable => None,
        }
    }
}

/// The capabilities every bin layout provides.
///
/// `pos2bin` returns `Result<BinIdx, BinError>` for the regular layouts and
/// `Option<BinIdx>` for the variable layout, where positions outside all
/// supplied intervals are an ordinary outcome rather than an error.
pub trait BinMapper {
    type Lookup;

    /// Find the global bin containing `position` on `region` of genome `taxon_id`.
    fn pos2bin<P: ToPrimitive + Display>(
        &self,
        taxon_id: TaxonId,
        region: &str,
        position: P,
    ) -> Self::Lookup;

    fn layout(&self) -> BinLayout;

    /// The genomes, decorated with their bins.
    fn binned_genomes(&self) -> &Genomes;

    fn binned_genomes_mut(&mut self) -> &mut Genomes;

    fn into_binned_genomes(self) -> Genomes
    where
        Self: Sized;

    /// The total number of bins.
    fn nbins(&self) -> usize {
        self.binned_genomes().bin_count()
    }

    /// Return the bin with global index `idx`.
    fn bin2pos<I: ToPrimitive + Display>(&self, idx: I) -> Result<&Bin, BinError> {
        let bins = self.binned_genomes().bins();
        match finite_f64(&idx) {
            Some(x) if x >= 0.0 && x.fract() == 0.0 && x < bins.len() as f64 => Ok(&bins[x as usize]),
            _ => Err(BinError::BinOutOfRange(idx.to_string())),
        }
    }
}

/// Whether a region's last position can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UpperBound {
    Exclusive,
    Inclusive,
}

/// The lookup shared by the uniform and fixed layouts.
///
/// Unknown regions and `UNANCHORED` fall back to the genome's single
/// `UNANCHORED` bin, whatever the position.
fn regular_pos2bin<P: ToPrimitive + Display>(
    genomes: &Genomes,
    taxon_id: TaxonId,
    region: &str,
    position: P,
    upper_bound: UpperBound,
) -> Result<BinIdx, BinError> {
    let genome = genomes
        .get(taxon_id)
        .ok_or(BinError::UnknownTaxon(taxon_id))?;
    let target = match region {
        UNANCHORED => None,
        name => genome.region(name),
    };
    let target = match target {
        Some(target) => target,
        None => {
            return genome
                .region(UNANCHORED)
                .and_then(|unanchored| unanchored.start_bin)
                .ok_or_else(|| BinError::UnknownRegion(region.to_string()));
        }
    };

    let out_of_range = || BinError::PositionOutOfRange(position.to_string());
    let pos = finite_f64(&position).ok_or_else(out_of_range)?;
    let size = target.size as f64;
    let beyond_end = match upper_bound {
        UpperBound::Exclusive => pos >= size,
        UpperBound::Inclusive => pos > size,
    };
    if pos < 1.0 || beyond_end {
        return Err(out_of_range());
    }
    let start_bin = target.start_bin.ok_or_else(out_of_range)?;
    let bin_width = genome.bin_width.unwrap_or(0);
    if bin_width == 0 {
        return Ok(start_bin);
    }
    Ok(start_bin + ((pos - 1.0) / bin_width as f64).floor() as BinIdx)
}

/// Parse a layout parameter as a positive integer.
fn positive_integer<T: ToPrimitive + Display>(name: &'static str, value: T) -> Result<u64, BinError> {
    let x = finite_f64(&value)
        .ok_or_else(|| BinError::NonNumericParameter(name, value.to_string()))?;
    if x < 1.0 || x.fract() != 0.0 || x > u64::MAX as f64 {
        return Err(BinError::InvalidParameter(name, value.to_string()));
    }
    Ok(x as u64)
}

/// Choose the bin width giving `genome` as close to (but no more than)
/// `bins_per_genome` bins, counting `UNANCHORED` as one bin.
///
/// Empty genomes get a width of zero, i.e. one bin per region.
pub fn fixed_bin_width(genome: &Genome, bins_per_genome: u64) -> Result<Position, BinError> {
    if bins_per_genome == 0 {
        return Err(BinError::InvalidParameter("binsPerGenome", "0".to_string()));
    }
    let assembled = genome.assembled_genome_size;
    if assembled == 0 {
        return Ok(0);
    }
    if assembled < MIN_FIXED_GENOME_SIZE {
        return Err(BinError::GenomeTooSmall(genome.taxon_id, assembled));
    }

    let initial = (assembled / bins_per_genome).max(1);
    let count_bins = |width: Position| genome.bin_count_at(width);
    if count_bins(initial) <= bins_per_genome {
        return Ok(initial);
    }

    let region_count = genome.region_count() as u64;
    let max_width = genome.largest_region_size().max(1);
    let upper = if bins_per_genome > region_count {
        assembled / (bins_per_genome - region_count)
    } else {
        max_width
    };
    Ok(bisect_bin_width(initial, upper, max_width, bins_per_genome, count_bins))
}

/// Build genomes whose regions are cut into bins of a per-genome width.
fn regular_genomes<F>(
    raw: &[RawGenome],
    layout: BinLayout,
    mut width_for: F,
) -> Result<Genomes, BinError>
where
    F: FnMut(&Genome) -> Result<Position, BinError>,
{
    let mut genomes = Genomes::from_raw(raw)?;
    genomes.set_bin_name(layout.display_name());

    let mut plan = Vec::with_capacity(genomes.len());
    for genome in genomes.iter() {
        let bin_width = width_for(genome)?;
        let intervals: Vec<(String, Vec<(Position, Position)>)> = genome
            .regions()
            .map(|region| (region.name.clone(), region.bin_intervals(bin_width)))
            .collect();
        plan.push((genome.taxon_id, bin_width, intervals));
    }

    for (taxon_id, bin_width, regions) in plan {
        if let Some(genome) = genomes.get_mut(taxon_id) {
            genome.bin_width = Some(bin_width);
        }
        for (region, intervals) in regions {
            for (start, end) in intervals {
                genomes.push_bin(taxon_id, &region, start, end)?;
            }
        }
        log::debug!(
            "genome {}: bin width {}, {} bins",
            taxon_id,
            bin_width,
            genomes.get(taxon_id).map_or(0, |g| g.nbins)
        );
    }
    log::debug!("built {:?} layout with {} bins", layout, genomes.bin_count());
    Ok(genomes)
}

/// Bins of the same width on every region.
pub struct UniformBins {
    bin_width: Position,
    genomes: Genomes,
}

impl UniformBins {
    pub fn bin_width(&self) -> Position {
        self.bin_width
    }
}

impl BinMapper for UniformBins {
    type Lookup = Result<BinIdx, BinError>;

    /// Positions must lie in `[1, size)` of their region.
    fn pos2bin<P: ToPrimitive + Display>(
        &self,
        taxon_id: TaxonId,
        region: &str,
        position: P,
    ) -> Self::Lookup {
        regular_pos2bin(&self.genomes, taxon_id, region, position, UpperBound::Exclusive)
    }

    fn layout(&self) -> BinLayout {
        BinLayout::Uniform {
            bin_width: self.bin_width,
        }
    }

    fn binned_genomes(&self) -> &Genomes {
        &self.genomes
    }

    fn binned_genomes_mut(&mut self) -> &mut Genomes {
        &mut self.genomes
    }

    fn into_binned_genomes(self) -> Genomes {
        self.genomes
    }
}

/// About the same number of bins in every genome.
pub struct FixedBins {
    bins_per_genome: u64,
    genomes: Genomes,
}

impl FixedBins {
    pub fn bins_per_genome(&self) -> u64 {
        self.bins_per_genome
    }

    /// The bin width chosen for genome `taxon_id`.
    pub fn bin_width(&self, taxon_id: TaxonId) -> Option<Position> {
        self.genomes.get(taxon_id).and_then(|g| g.bin_width)
    }
}

impl BinMapper for FixedBins {
    type Lookup = Result<BinIdx, BinError>;

    /// Positions must lie in `[1, size]` of their region.
    fn pos2bin<P: ToPrimitive + Display>(
        &self,
        taxon_id: TaxonId,
        region: &str,
        position: P,
    ) -> Self::Lookup {
        regular_pos2bin(&self.genomes, taxon_id, region, position, UpperBound::Inclusive)
    }

    fn layout(&self) -> BinLayout {
        BinLayout::Fixed {
            bins_per_genome: self.bins_per_genome,
        }
    }

    fn binned_genomes(&self) -> &Genomes {
        &self.genomes
    }

    fn binned_genomes_mut(&mut self) -> &mut Genomes {
        &mut self.genomes
    }

    fn into_binned_genomes(self) -> Genomes {
        self.genomes
    }
}

/// The sorted boundaries of one region's variable bins.
#[derive(Debug, Clone, Default)]
struct RegionBoundaries {
    /// The global index of the region's first bin.
    offset: BinIdx,
    /// `start, end, start, end, ...` of the region's bins.
    boundaries: Vec<Position>,
}

/// Caller-supplied bins.
pub struct VariableBins {
    genomes: Genomes,
    lookup: IndexMap<TaxonId, IndexMap<String, RegionBoundaries>>,
}

/// An interval resolved against the genomes, for sorting.
struct PlacedInterval<'a> {
    interval: &'a Interval,
    region_idx: usize,
}

impl PlacedInterval<'_> {
    fn sort_key(&self) -> (TaxonId, usize, Position) {
        (self.interval.taxon_id, self.region_idx, self.interval.start)
    }

    fn same_region(&self, other: &PlacedInterval) -> bool {
        self.interval.taxon_id == other.interval.taxon_id && self.region_idx == other.region_idx
    }
}

impl VariableBins {
    fn new(raw: &[RawGenome], intervals: &[Interval]) -> Result<VariableBins, BinError> {
        let mut genomes = Genomes::from_raw(raw)?;
        genomes.set_bin_name(BinLayout::Variable.display_name());

        let mut placed = Vec::with_capacity(intervals.len());
        for interval in intervals {
            let genome = genomes
                .get(interval.taxon_id)
                .ok_or(BinError::UnknownTaxon(interval.taxon_id))?;
            let region = genome
                .region(&interval.region)
                .ok_or_else(|| BinError::UnknownRegion(interval.region.clone()))?;
            if interval.start > interval.end {
                return Err(BinError::InvalidInterval(interval.clone()));
            }
            placed.push(PlacedInterval {
                interval,
                region_idx: region.idx,
            });
        }

        placed.sort_by_key(|p| p.sort_key());
        for pair in placed.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if !a.same_region(b) {
                continue;
            }
            if a.interval == b.interval {
                return Err(BinError::DuplicateBins(a.interval.clone(), b.interval.clone()));
            }
            if b.interval.start <= a.interval.end {
                return Err(BinError::OverlappingBins(
                    a.interval.clone(),
                    b.interval.clone(),
                ));
            }
        }

        let mut lookup: IndexMap<TaxonId, IndexMap<String, RegionBoundaries>> = IndexMap::new();
        for p in &placed {
            let interval = p.interval;
            let idx = genomes.push_bin(
                interval.taxon_id,
                &interval.region,
                interval.start,
                interval.end,
            )?;
            let entry = lookup
                .entry(interval.taxon_id)
                .or_default()
                .entry(interval.region.clone())
                .or_insert_with(|| RegionBoundaries {
                    offset: idx,
                    boundaries: Vec::new(),
                });
            entry.boundaries.push(interval.start);
            entry.boundaries.push(interval.end);
        }

        log::debug!(
            "built variable layout with {} bins on {} genomes",
            genomes.bin_count(),
            lookup.len()
        );
        Ok(VariableBins { genomes, lookup })
    }
}

impl BinMapper for VariableBins {
    type Lookup = Option<BinIdx>;

    /// Returns `None` for unknown genomes or regions, non-numeric positions
    /// and positions outside every supplied interval.
    fn pos2bin<P: ToPrimitive + Display>(
        &self,
        taxon_id: TaxonId,
        region: &str,
        position: P,
    ) -> Self::Lookup {
        let region_bins = self.lookup.get(&taxon_id)?.get(region)?;
        let position = finite_f64(&position)?;
        interpolation_search(&region_bins.boundaries, position).map(|i| region_bins.offset + i)
    }

    fn layout(&self) -> BinLayout {
        BinLayout::Variable
    }

    fn binned_genomes(&self) -> &Genomes {
        &self.genomes
    }

    fn binned_genomes_mut(&mut self) -> &mut Genomes {
        &mut self.genomes
    }

    fn into_binned_genomes(self) -> Genomes {
        self.genomes
    }
}

/// Bins defined on an ordered set of genome maps.
///
/// Bin numbers are global, so each uniquely identifies an interval on a
/// region of a genome. Each `*_bin_mapper` method lays out a fresh set of
/// bins on the genomes.
pub struct Bins {
    raw: Vec<RawGenome>,
}

impl Bins {
    pub fn new(raw: Vec<RawGenome>) -> Self {
        Self { raw }
    }

    /// Load the raw genomes from a JSON file, which may be gzip-compressed.
    pub fn from_json_file(filepath: &str) -> Result<Bins, BinError> {
        Ok(Bins::new(read_genomes(filepath)?))
    }

    pub fn raw_genomes(&self) -> &[RawGenome] {
        &self.raw
    }

    /// Lay out bins `bin_width` nucleotides wide on every region.
    /// `UNANCHORED` regions get a single bin.
    pub fn uniform_bin_mapper<W: ToPrimitive + Display>(
        &self,
        bin_width: W,
    ) -> Result<UniformBins, BinError> {
        let bin_width = positive_integer("binWidth", bin_width)?;
        let layout = BinLayout::Uniform { bin_width };
        let genomes = regular_genomes(&self.raw, layout, |_| Ok(bin_width))?;
        Ok(UniformBins { bin_width, genomes })
    }

    /// Lay out about `bins_per_genome` bins on every genome, choosing the
    /// bin width of each genome with [`fixed_bin_width`].
    pub fn fixed_bin_mapper<N: ToPrimitive + Display>(
        &self,
        bins_per_genome: N,
    ) -> Result<FixedBins, BinError> {
        let bins_per_genome = positive_integer("binsPerGenome", bins_per_genome)?;
        let layout = BinLayout::Fixed { bins_per_genome };
        let genomes = regular_genomes(&self.raw, layout, |genome| {
            fixed_bin_width(genome, bins_per_genome)
        })?;
        Ok(FixedBins {
            bins_per_genome,
            genomes,
        })
    }

    /// Use the supplied, non-overlapping `intervals` as bins. They are
    /// numbered in order of taxonomy ID, region and start position; the
    /// slice itself is left untouched.
    pub fn variable_bin_mapper(&self, intervals: &[Interval]) -> Result<VariableBins, BinError> {
        VariableBins::new(&self.raw, intervals)
    }
}
