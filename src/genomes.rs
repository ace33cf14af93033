use genomap::GenomeMap;
use indexmap::map::IndexMap;
use num_traits::cast::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::Write;

use crate::bins::BinError;
use crate::file::{InputFile, OutputFile};
use crate::numeric::{ceil_div, finite_f64};
use crate::results::{BinResult, ResultSet, Rollup, RollupResults};
use crate::stats::{global_stats, GlobalStats};

/// The integer type for taxonomy identifiers.
pub type TaxonId = u64;

/// The integer type for genomic positions and sizes.
pub type Position = u64;

/// The integer type for global bin indices.
pub type BinIdx = usize;

/// The reserved name of the region aggregating unplaced sequence.
pub const UNANCHORED: &str = "UNANCHORED";

/// The parallel name and length arrays of a raw genome record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawRegions {
    pub names: Vec<String>,
    pub lengths: Vec<Position>,
}

/// A genome record as supplied by the data source.
///
/// `length` is the assembled genome size, which does not include any
/// `UNANCHORED` sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawGenome {
    pub taxon_id: TaxonId,
    pub length: Position,
    #[serde(default)]
    pub regions: Option<RawRegions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_genes: Option<u64>,
}

/// Read a JSON array of raw genome records, which may be gzip-compressed.
pub fn read_genomes(filepath: &str) -> Result<Vec<RawGenome>, BinError> {
    let reader = InputFile::new(filepath).reader()?;
    let genomes = serde_json::from_reader(reader)?;
    Ok(genomes)
}

/// A single bin: a 1-based, inclusive interval on one region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bin {
    pub taxon_id: TaxonId,
    pub region: String,
    pub start: Position,
    pub end: Position,
    pub idx: BinIdx,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<BinResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<BinResult>,
}

impl Bin {
    pub fn is_unanchored(&self) -> bool {
        self.region == UNANCHORED
    }

    /// The attached results, or the attached totals if `is_total` is set.
    pub fn result(&self, is_total: bool) -> Option<&BinResult> {
        if is_total {
            self.total.as_ref()
        } else {
            self.results.as_ref()
        }
    }
}

/// A named sequence (chromosome, scaffold) of a genome.
///
/// The bins of a region are a contiguous run of the global bins, starting
/// at `start_bin`; see [`Genomes::region_bins`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Region {
    pub name: String,
    pub size: Position,
    /// Position of this region among its genome's regions.
    pub idx: usize,
    pub start_bin: Option<BinIdx>,
    pub nbins: usize,
    pub results: Option<RollupResults>,
}

impl Region {
    pub fn is_unanchored(&self) -> bool {
        self.name == UNANCHORED
    }

    /// The number of bins this region is split into at `bin_width`.
    ///
    /// `UNANCHORED` is always a single bin, empty regions get no bins and a
    /// zero width (a degenerate genome) puts each region in one bin.
    pub fn bin_count_at(&self, bin_width: Position) -> u64 {
        if self.is_unanchored() {
            1
        } else if self.size == 0 {
            0
        } else if bin_width == 0 {
            1
        } else {
            ceil_div(self.size, bin_width)
        }
    }

    /// The `(start, end)` intervals of this region's bins at `bin_width`.
    pub fn bin_intervals(&self, bin_width: Position) -> Vec<(Position, Position)> {
        let nbins = self.bin_count_at(bin_width);
        if self.is_unanchored() || bin_width == 0 {
            return (0..nbins).map(|_| (1, self.size)).collect();
        }
        (0..nbins)
            .map(|j| {
                let start = j * bin_width + 1;
                let end = if j + 1 == nbins {
                    self.size
                } else {
                    (j + 1) * bin_width
                };
                (start, end)
            })
            .collect()
    }
}

/// A genome and its ordered regions.
pub struct Genome {
    pub taxon_id: TaxonId,
    pub assembled_genome_size: Position,
    /// The sum of all region sizes, including `UNANCHORED`.
    pub full_genome_size: Position,
    pub num_genes: Option<u64>,
    pub start_bin: Option<BinIdx>,
    pub nbins: usize,
    /// The bin width used by regular layouts (`0` for degenerate genomes).
    pub bin_width: Option<Position>,
    pub results: Option<RollupResults>,
    regions: GenomeMap<Region>,
}

impl Genome {
    /// Build a genome from its raw record, checking the region arrays and
    /// the genome sizes are consistent.
    pub fn from_raw(raw: &RawGenome) -> Result<Genome, BinError> {
        let mut regions: GenomeMap<Region> = GenomeMap::new();
        match &raw.regions {
            None => {
                log::warn!("genome {} has no regions", raw.taxon_id);
            }
            Some(raw_regions) => {
                if raw_regions.names.len() != raw_regions.lengths.len() {
                    return Err(BinError::MismatchedRegions(raw.taxon_id));
                }
                let iter = raw_regions.names.iter().zip(raw_regions.lengths.iter());
                for (idx, (name, &size)) in iter.enumerate() {
                    if regions.get(name).is_some() {
                        return Err(BinError::DuplicateRegion(raw.taxon_id, name.clone()));
                    }
                    let region = Region {
                        name: name.clone(),
                        size,
                        idx,
                        ..Default::default()
                    };
                    regions.insert(name, region)?;
                }
            }
        }

        let full_genome_size: Position = regions.iter().map(|(_, region)| region.size).sum();
        if full_genome_size < raw.length {
            return Err(BinError::GenomeSizeInconsistency {
                taxon_id: raw.taxon_id,
                assembled: raw.length,
                full: full_genome_size,
            });
        }

        Ok(Genome {
            taxon_id: raw.taxon_id,
            assembled_genome_size: raw.length,
            full_genome_size,
            num_genes: raw.num_genes,
            start_bin: None,
            nbins: 0,
            bin_width: None,
            results: None,
            regions,
        })
    }

    /// Return the number of regions, `UNANCHORED` included.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.get(name)
    }

    /// Iterate over the regions in input order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter().map(|(_, region)| region)
    }

    pub fn has_unanchored(&self) -> bool {
        self.region(UNANCHORED).is_some()
    }

    /// The total number of bins this genome is split into at `bin_width`.
    pub fn bin_count_at(&self, bin_width: Position) -> u64 {
        self.regions().map(|r| r.bin_count_at(bin_width)).sum()
    }

    /// The size of the largest anchored region.
    pub fn largest_region_size(&self) -> Position {
        self.regions()
            .filter(|r| !r.is_unanchored())
            .map(|r| r.size)
            .max()
            .unwrap_or(0)
    }
}

/// A collection of genomes and the global bins laid out on them.
///
/// Genomes are kept in construction order and can also be looked up by
/// taxonomy ID; both views share the same [`Genome`] objects. Bins are
/// stored once, in global index order.
pub struct Genomes {
    genomes: IndexMap<TaxonId, Genome>,
    bins: Vec<Bin>,
    bin_name: Option<String>,
    pub results: Option<RollupResults>,
    pub stats: Option<GlobalStats>,
    generation: u64,
}

impl Genomes {
    /// Create the genomes, without any bins, from the raw genome records.
    pub fn from_raw(raw_genomes: &[RawGenome]) -> Result<Genomes, BinError> {
        let mut genomes = IndexMap::with_capacity(raw_genomes.len());
        for raw in raw_genomes {
            if genomes.contains_key(&raw.taxon_id) {
                return Err(BinError::DuplicateTaxon(raw.taxon_id));
            }
            genomes.insert(raw.taxon_id, Genome::from_raw(raw)?);
        }
        Ok(Genomes {
            genomes,
            bins: Vec::new(),
            bin_name: None,
            results: None,
            stats: None,
            generation: 0,
        })
    }

    /// The name result sets for this layout must carry, if any.
    pub fn bin_name(&self) -> Option<&str> {
        self.bin_name.as_deref()
    }

    pub(crate) fn set_bin_name(&mut self, name: Option<String>) {
        self.bin_name = name;
    }

    /// Return the number of genomes.
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, taxon_id: TaxonId) -> Option<&Genome> {
        self.genomes.get(&taxon_id)
    }

    pub(crate) fn get_mut(&mut self, taxon_id: TaxonId) -> Option<&mut Genome> {
        self.genomes.get_mut(&taxon_id)
    }

    /// Iterate over the genomes in construction order.
    pub fn iter(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.values()
    }

    /// Call `f` on each genome in construction order.
    pub fn each<F: FnMut(&Genome)>(&self, f: F) {
        self.iter().for_each(f)
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// All bins, in global index order.
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// An independent copy of all bins.
    pub fn all_bins(&self) -> Vec<Bin> {
        self.bins.clone()
    }

    /// The bins of `region`, in order.
    pub fn region_bins(&self, region: &Region) -> &[Bin] {
        bin_slice(&self.bins, region.start_bin, region.nbins)
    }

    /// The bins of `genome`, in order.
    pub fn genome_bins(&self, genome: &Genome) -> &[Bin] {
        bin_slice(&self.bins, genome.start_bin, genome.nbins)
    }

    /// Check `idx` is a finite, integral and in-range bin index.
    fn check_index<I: ToPrimitive + Display>(&self, idx: &I) -> Result<BinIdx, BinError> {
        let value = finite_f64(idx).ok_or_else(|| BinError::IndexNotFinite(idx.to_string()))?;
        if value.fract() != 0.0 {
            return Err(BinError::IndexNotInteger(idx.to_string()));
        }
        if value < 0.0 || value >= self.bins.len() as f64 {
            return Err(BinError::IndexOutOfRange(idx.to_string(), self.bins.len()));
        }
        Ok(value as BinIdx)
    }

    /// Get the bin with global index `idx`.
    pub fn get_bin<I: ToPrimitive + Display>(&self, idx: I) -> Result<&Bin, BinError> {
        let idx = self.check_index(&idx)?;
        Ok(&self.bins[idx])
    }

    /// Get the bins with global indices `start` to `end`, inclusive.
    pub fn get_bins<I: ToPrimitive + Display>(&self, start: I, end: I) -> Result<&[Bin], BinError> {
        let start = self.check_index(&start)?;
        let end = self.check_index(&end)?;
        if start > end {
            return Err(BinError::InvalidBinRange(start, end));
        }
        Ok(&self.bins[start..=end])
    }

    /// Append a new bin on `region` of genome `taxon_id`, assigning it the
    /// next global index. Bins of one region must be pushed consecutively.
    pub(crate) fn push_bin(
        &mut self,
        taxon_id: TaxonId,
        region: &str,
        start: Position,
        end: Position,
    ) -> Result<BinIdx, BinError> {
        let idx = self.bins.len();
        let genome = self
            .genomes
            .get_mut(&taxon_id)
            .ok_or(BinError::UnknownTaxon(taxon_id))?;
        let region_entry = genome
            .regions
            .get_mut(region)
            .ok_or_else(|| BinError::UnknownRegion(region.to_string()))?;
        region_entry.start_bin.get_or_insert(idx);
        region_entry.nbins += 1;
        genome.start_bin.get_or_insert(idx);
        genome.nbins += 1;

        self.bins.push(Bin {
            taxon_id,
            region: region.to_string(),
            start,
            end,
            idx,
            results: None,
            total: None,
        });
        Ok(idx)
    }

    /// The number of times results have been attached to these genomes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Attach a result set to the bins and roll the counts up to regions,
    /// genomes and the whole collection.
    ///
    /// With `is_total` set the values are stored as each bin's `total`
    /// rather than its `results`. The result set is fully validated before
    /// anything is modified, so on error the previous state is intact.
    pub fn set_results(&mut self, results: &ResultSet, is_total: bool) -> Result<Rollup, BinError> {
        results.check_compatible(self.bin_name(), self.bin_count())?;

        // stage every change; self is untouched until all rollups succeed
        let mut bins = self.bins.clone();
        for bin in bins.iter_mut() {
            let value = results.get(bin.idx).cloned().unwrap_or_default();
            if is_total {
                bin.total = Some(value);
            } else {
                bin.results = Some(value);
            }
        }

        let mut collection = RollupResults::default();
        let mut genome_rollups = Vec::with_capacity(self.genomes.len());
        for genome in self.genomes.values() {
            let mut genome_rollup = RollupResults::default();
            let mut region_rollups = Vec::with_capacity(genome.region_count());
            for region in genome.regions() {
                let region_bins = bin_slice(&bins, region.start_bin, region.nbins);
                let rollup = RollupResults::from_bins(region_bins, is_total)?;
                genome_rollup.add(&rollup)?;
                region_rollups.push(rollup);
            }
            collection.add(&genome_rollup)?;
            genome_rollups.push((genome_rollup, region_rollups));
        }
        let stats = global_stats(
            &bins,
            genome_rollups.iter().map(|(rollup, _)| rollup),
            is_total,
        );

        self.bins = bins;
        for (genome, (genome_rollup, region_rollups)) in
            self.genomes.values_mut().zip(genome_rollups)
        {
            for (region, rollup) in genome.regions.values_mut().zip(region_rollups) {
                region.results = Some(rollup);
            }
            genome.results = Some(genome_rollup);
        }
        self.generation += 1;
        self.results = Some(collection.clone());
        self.stats = Some(stats.clone());

        log::info!(
            "attached {} results (generation {}): {} counts over {} bins",
            results.display_name,
            self.generation,
            collection.count,
            collection.bins
        );

        Ok(Rollup {
            generation: self.generation,
            results: collection,
            stats,
        })
    }

    /// Check the shape of a JSON result set, then attach it with
    /// [`Genomes::set_results`].
    pub fn set_results_value(
        &mut self,
        value: &serde_json::Value,
        is_total: bool,
    ) -> Result<Rollup, BinError> {
        let results = ResultSet::from_value(value)?;
        self.set_results(&results, is_total)
    }

    /// Remove all attached results and rollups.
    pub fn clear_results(&mut self) {
        for bin in self.bins.iter_mut() {
            bin.results = None;
            bin.total = None;
        }
        for genome in self.genomes.values_mut() {
            genome.results = None;
            for region in genome.regions.values_mut() {
                region.results = None;
            }
        }
        self.results = None;
        self.stats = None;
    }

    /// Write the bins to a BED-like TSV file of taxon ID, region, start,
    /// end, bin index and result count (`.` when no results are attached).
    ///
    /// # Arguments
    ///  * `filepath`: The filepath to write the bins to. If the filepath
    ///  has an `.gz` extension, the output will be gzip compressed.
    ///  If `filepath` is `None`, uncompressed output will be written to standard out.
    pub fn write_tsv(&self, filepath: Option<&str>) -> Result<(), BinError> {
        let header = self.bin_name().map(|name| vec![format!("bins: {}", name)]);
        let mut writer: Box<dyn Write> = match filepath {
            Some(path) => OutputFile::new(path, header).writer()?,
            None => Box::new(std::io::stdout()),
        };

        for bin in &self.bins {
            let count = bin
                .results
                .as_ref()
                .map_or_else(|| ".".to_string(), |r| r.count.to_string());
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                bin.taxon_id, bin.region, bin.start, bin.end, bin.idx, count
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn bin_slice(bins: &[Bin], start_bin: Option<BinIdx>, nbins: usize) -> &[Bin] {
    match start_bin {
        Some(start) => &bins[start..start + nbins],
        None => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(taxon_id: TaxonId, length: Position, regions: &[(&str, Position)]) -> RawGenome {
        RawGenome {
            taxon_id,
            length,
            regions: Some(RawRegions {
                names: regions.iter().map(|(n, _)| n.to_string()).collect(),
                lengths: regions.iter().map(|(_, l)| *l).collect(),
            }),
            num_genes: None,
        }
    }

    fn small_genomes() -> Genomes {
        let mut genomes = Genomes::from_raw(&[
            raw(1, 300, &[("1", 200), ("2", 100)]),
            raw(2, 50, &[("1", 50), (UNANCHORED, 10)]),
        ])
        .unwrap();
        for (taxon_id, region, start, end) in [
            (1, "1", 1, 100),
            (1, "1", 101, 200),
            (1, "2", 1, 100),
            (2, "1", 1, 50),
            (2, UNANCHORED, 1, 10),
        ] {
            genomes.push_bin(taxon_id, region, start, end).unwrap();
        }
        genomes
    }

    #[test]
    fn test_genome_sizes() {
        let genome = Genome::from_raw(&raw(7, 100, &[("a", 60), (UNANCHORED, 50)])).unwrap();
        assert_eq!(genome.assembled_genome_size, 100);
        assert_eq!(genome.full_genome_size, 110);
        assert_eq!(genome.region_count(), 2);
        assert!(genome.has_unanchored());
        assert_eq!(genome.region(UNANCHORED).unwrap().idx, 1);
    }

    #[test]
    fn test_genome_size_inconsistency() {
        let result = Genome::from_raw(&raw(7, 1000, &[("a", 60), ("b", 50)]));
        assert!(matches!(
            result,
            Err(BinError::GenomeSizeInconsistency {
                taxon_id: 7,
                assembled: 1000,
                full: 110
            })
        ));
    }

    #[test]
    fn test_mismatched_and_duplicate_regions() {
        let mut bad = raw(7, 10, &[("a", 60)]);
        bad.regions.as_mut().unwrap().lengths.push(3);
        assert!(matches!(Genome::from_raw(&bad), Err(BinError::MismatchedRegions(7))));

        let dup = raw(7, 10, &[("a", 60), ("a", 10)]);
        assert!(matches!(Genome::from_raw(&dup), Err(BinError::DuplicateRegion(7, _))));

        let genomes = Genomes::from_raw(&[raw(7, 10, &[("a", 60)]), raw(7, 10, &[("a", 60)])]);
        assert!(matches!(genomes, Err(BinError::DuplicateTaxon(7))));
    }

    #[test]
    fn test_genome_without_regions() {
        let genome = Genome::from_raw(&RawGenome {
            taxon_id: 3,
            length: 0,
            regions: None,
            num_genes: Some(12),
        })
        .unwrap();
        assert_eq!(genome.region_count(), 0);
        assert_eq!(genome.full_genome_size, 0);
        assert_eq!(genome.num_genes, Some(12));
    }

    #[test]
    fn test_region_bin_intervals() {
        let region = Region {
            name: "1".to_string(),
            size: 25,
            ..Default::default()
        };
        assert_eq!(region.bin_intervals(10), vec![(1, 10), (11, 20), (21, 25)]);
        assert_eq!(region.bin_intervals(0), vec![(1, 25)]);

        let unanchored = Region {
            name: UNANCHORED.to_string(),
            size: 25,
            ..Default::default()
        };
        assert_eq!(unanchored.bin_intervals(10), vec![(1, 25)]);

        let empty = Region::default();
        assert!(empty.bin_intervals(10).is_empty());
    }

    #[test]
    fn test_push_bin_bookkeeping() {
        let genomes = small_genomes();
        assert_eq!(genomes.bin_count(), 5);

        let first = genomes.get(1).unwrap();
        assert_eq!(first.start_bin, Some(0));
        assert_eq!(first.nbins, 3);
        let region = first.region("2").unwrap();
        assert_eq!(region.start_bin, Some(2));
        let bins = genomes.region_bins(region);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].idx, 2);

        let second = genomes.get(2).unwrap();
        assert_eq!(second.start_bin, Some(3));
        assert_eq!(genomes.genome_bins(second).len(), 2);
    }

    #[test]
    fn test_iteration_order_matches_lookup() {
        let genomes = small_genomes();
        let ids: Vec<TaxonId> = genomes.iter().map(|g| g.taxon_id).collect();
        assert_eq!(ids, vec![1, 2]);
        let mut seen = Vec::new();
        genomes.each(|g| seen.push(genomes.get(g.taxon_id).unwrap().taxon_id));
        assert_eq!(seen, ids);
    }

    #[test]
    fn test_get_bin_validation() {
        let genomes = small_genomes();
        assert_eq!(genomes.get_bin(4).unwrap().region, UNANCHORED);
        assert_eq!(genomes.get_bin(4.0).unwrap().idx, 4);
        assert!(matches!(genomes.get_bin(f64::NAN), Err(BinError::IndexNotFinite(_))));
        assert!(matches!(
            genomes.get_bin(f64::INFINITY),
            Err(BinError::IndexNotFinite(_))
        ));
        assert!(matches!(genomes.get_bin(-1), Err(BinError::IndexOutOfRange(_, 5))));
        assert!(matches!(genomes.get_bin(5), Err(BinError::IndexOutOfRange(_, 5))));
        assert!(matches!(genomes.get_bin(1.5), Err(BinError::IndexNotInteger(_))));
    }

    #[test]
    fn test_get_bins_range() {
        let genomes = small_genomes();
        let bins = genomes.get_bins(1, 3).unwrap();
        assert_eq!(bins.iter().map(|b| b.idx).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(genomes.get_bins(2, 2).unwrap().len(), 1);
        assert!(matches!(genomes.get_bins(3, 1), Err(BinError::InvalidBinRange(3, 1))));
        assert!(matches!(genomes.get_bins(1000, 1), Err(BinError::IndexOutOfRange(_, 5))));
    }

    #[test]
    fn test_all_bins_is_a_copy() {
        let genomes = small_genomes();
        let mut copy = genomes.all_bins();
        copy[0].start = 999;
        copy.clear();
        assert_eq!(genomes.bin_count(), 5);
        assert_eq!(genomes.get_bin(0).unwrap().start, 1);
    }

    #[test]
    fn test_set_results_rolls_up() {
        let mut genomes = small_genomes();
        let value = serde_json::json!({
            "displayName": "custom",
            "data": {"0": {"count": 3}, "1": {"count": 4}, "3": {"count": 5}, "4": {"count": 7}}
        });
        let rollup = genomes.set_results_value(&value, false).unwrap();
        assert_eq!(rollup.generation, 1);
        assert_eq!(rollup.results.count, 19);
        assert_eq!(rollup.results.bins, 4);

        let first = genomes.get(1).unwrap();
        assert_eq!(first.results.as_ref().unwrap().count, 7);
        assert_eq!(first.region("1").unwrap().results.as_ref().unwrap().count, 7);
        assert_eq!(first.region("2").unwrap().results.as_ref().unwrap().bins, 0);
        assert_eq!(genomes.get_bin(2).unwrap().results.as_ref().unwrap().count, 0);

        // the UNANCHORED bin is left out of the bin statistics
        let stats = genomes.stats.as_ref().unwrap();
        assert_eq!(stats.bins.as_ref().unwrap().count, 4);
        assert_eq!(stats.bins.as_ref().unwrap().max, 5);
        assert_eq!(stats.genomes.as_ref().unwrap().sum, 19);

        genomes.clear_results();
        assert!(genomes.results.is_none());
        assert!(genomes.get_bin(0).unwrap().results.is_none());
        assert_eq!(genomes.generation(), 1);
    }

    #[test]
    fn test_set_results_failure_keeps_state() {
        let mut genomes = small_genomes();
        genomes.set_bin_name(Some("fixed_200__bin".to_string()));
        let good = serde_json::json!({"displayName": "fixed_200__bin", "data": {"0": {"count": 1}}});
        genomes.set_results_value(&good, false).unwrap();

        let wrong_name = serde_json::json!({"displayName": "fixed_1000__bin", "data": {"0": {"count": 9}}});
        assert!(matches!(
            genomes.set_results_value(&wrong_name, false),
            Err(BinError::ResultsLayoutMismatch { .. })
        ));
        let too_many = serde_json::json!({"displayName": "fixed_200__bin", "data": {"0": {"count": 9}, "6": {"count": 1}}});
        assert!(matches!(
            genomes.set_results_value(&too_many, false),
            Err(BinError::BinCountMismatch(6, 5))
        ));

        assert_eq!(genomes.generation(), 1);
        assert_eq!(genomes.results.as_ref().unwrap().count, 1);
        assert_eq!(genomes.get_bin(0).unwrap().results.as_ref().unwrap().count, 1);
    }

    #[test]
    fn test_write_tsv() {
        let mut genomes = small_genomes();
        let value = serde_json::json!({"displayName": "x", "data": {"1": {"count": 4}}});
        genomes.set_results_value(&value, false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bins.tsv");
        genomes.write_tsv(Some(path.to_str().unwrap())).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1], "1\t1\t101\t200\t1\t4");
        assert_eq!(lines[4], "2\tUNANCHORED\t1\t10\t4\t0");
    }
}
