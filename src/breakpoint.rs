use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::chrom_order::{GenomePosKey, compare_chroms};
use crate::int_range::IntRange;
use crate::raw_record::FieldValue;

pub const SVTYPE_INFO_KEY: &str = "SVTYPE";
pub const CHR2_INFO_KEY: &str = "CHR2";
pub const END_INFO_KEY: &str = "END";
pub const END2_INFO_KEY: &str = "END2";
pub const STRANDS_INFO_KEY: &str = "STRANDS";
pub const SVLEN_INFO_KEY: &str = "SVLEN";
pub const CIPOS_INFO_KEY: &str = "CIPOS";
pub const CIEND_INFO_KEY: &str = "CIEND";
pub const SOURCES_INFO_KEY: &str = "SOURCES";
pub const MEMBERS_INFO_KEY: &str = "MEMBERS";
pub const RMSSTD_INFO_KEY: &str = "RMSSTD";
pub const SECONDARY_INFO_KEY: &str = "SECONDARY";
pub const INTERCHROMOSOMAL_INFO_KEY: &str = "INTERCHROMOSOMAL";

pub const GT_FORMAT_KEY: &str = "GT";
pub const GQ_FORMAT_KEY: &str = "GQ";
pub const EV_FORMAT_KEY: &str = "EV";

/// Canonical structural variant classes
///
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum SvType {
    #[strum(serialize = "DEL")]
    Deletion,
    #[strum(serialize = "DUP")]
    Duplication,
    #[strum(serialize = "INV")]
    Inversion,
    #[strum(serialize = "INS")]
    Insertion,

    /// A breakend pair, which covers both translocations and intra-chromosomal junctions without a
    /// simpler classification
    #[strum(serialize = "BND")]
    Breakend,
}

impl SvType {
    /// Strand pair implied by the SV type when the caller does not report one
    ///
    /// Breakends have no implied strand pair.
    ///
    pub fn default_strands(&self) -> Option<StrandPair> {
        use Strand::*;
        match self {
            SvType::Deletion | SvType::Insertion => Some(StrandPair::new(Forward, Reverse)),
            SvType::Duplication => Some(StrandPair::new(Reverse, Forward)),
            SvType::Inversion => Some(StrandPair::new(Forward, Forward)),
            SvType::Breakend => None,
        }
    }

    /// True if the SV spans a reference interval that can be compared by reciprocal overlap
    pub fn has_reference_span(&self) -> bool {
        matches!(
            self,
            SvType::Deletion | SvType::Duplication | SvType::Inversion
        )
    }
}

/// Strand of origin for one side of a breakpoint
///
/// '+' means the breakpoint joins sequence to the left of this position (the reference is read
/// forward up to the break), '-' means it joins sequence to the right.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }

    fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct StrandPair {
    pub a: Strand,
    pub b: Strand,
}

impl StrandPair {
    pub const fn new(a: Strand, b: Strand) -> Self {
        Self { a, b }
    }

    /// The same junction described from breakpoint B's side
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }
}

impl FromStr for StrandPair {
    type Err = ();

    /// Parse from the canonical two character form, such as "+-"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(a), Some(b), None) => Ok(Self {
                a: Strand::from_symbol(a).ok_or(())?,
                b: Strand::from_symbol(b).ok_or(())?,
            }),
            _ => Err(()),
        }
    }
}

impl fmt::Display for StrandPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.a.symbol(), self.b.symbol())
    }
}

impl fmt::Debug for StrandPair {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StrandPair({self})")
    }
}

/// Confidence interval around a breakpoint, given as offsets from the breakpoint position
///
/// The interval is closed, so [0,0] represents a precise breakpoint.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ConfidenceInterval {
    pub start: i64,
    pub end: i64,
}

impl ConfidenceInterval {
    pub fn from_pair(start: i64, end: i64) -> Self {
        Self {
            start: std::cmp::min(start, 0),
            end: std::cmp::max(end, 0),
        }
    }

    /// Absolute range covered by the interval around `pos`, in half-open form
    pub fn to_range(self, pos: i64) -> IntRange {
        IntRange::from_pair(pos + self.start, pos + self.end + 1)
    }

    /// Absolute range covered by the interval around `pos`, where each side is clamped to extend
    /// no more than `max_padding` from `pos`
    pub fn to_padded_range(self, pos: i64, max_padding: i64) -> IntRange {
        let start = std::cmp::max(self.start, -max_padding);
        let end = std::cmp::min(self.end, max_padding);
        IntRange::from_pair(pos + start, pos + end + 1)
    }

    pub fn to_field_value(self) -> FieldValue {
        FieldValue::Integer(vec![self.start as i32, self.end as i32])
    }
}

/// Diploid or haploid genotype call, with None for each missing allele
///
#[derive(Clone, Eq, PartialEq)]
pub struct Genotype {
    pub alleles: Vec<Option<u32>>,
    pub phased: bool,
}

impl Genotype {
    /// The canonical placeholder for a sample without a call: "./."
    pub fn missing() -> Self {
        Self {
            alleles: vec![None, None],
            phased: false,
        }
    }

    /// Parse a VCF genotype string such as "0/1", "1|0", "./." or "1"
    ///
    /// Returns None if the string is not a genotype.
    ///
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let phased = s.contains('|');
        let mut alleles = Vec::new();
        for allele in s.split(['/', '|']) {
            if allele == "." {
                alleles.push(None);
            } else {
                alleles.push(Some(allele.parse::<u32>().ok()?));
            }
        }
        Some(Self { alleles, phased })
    }

    pub fn is_missing(&self) -> bool {
        self.alleles.iter().all(|x| x.is_none())
    }

    /// True if any allele is non-reference
    pub fn is_called(&self) -> bool {
        self.alleles.iter().any(|x| matches!(x, Some(a) if *a > 0))
    }

    /// Genotype used when a caller reports a variant site but leaves the sample genotype missing
    pub fn null_site_call(ploidy: usize) -> Self {
        let alleles = if ploidy == 1 {
            vec![Some(1)]
        } else {
            vec![Some(0), Some(1)]
        };
        Self {
            alleles,
            phased: false,
        }
    }
}

impl fmt::Display for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sep = if self.phased { "|" } else { "/" };
        let s = self
            .alleles
            .iter()
            .map(|x| match x {
                Some(a) => a.to_string(),
                None => ".".to_string(),
            })
            .join(sep);
        write!(f, "{s}")
    }
}

impl fmt::Debug for Genotype {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Genotype({self})")
    }
}

/// Canonical per-sample call information
///
#[derive(Clone, Debug, PartialEq)]
pub struct SampleCall {
    pub genotype: Genotype,

    /// Genotype quality, if reported by the caller
    pub quality: Option<i32>,

    /// Count of supporting observations for the variant allele, if reported by the caller
    pub evidence: Option<i32>,

    /// Caller tags which called this sample non-reference
    pub called_by: BTreeSet<String>,
}

impl SampleCall {
    pub fn missing() -> Self {
        Self {
            genotype: Genotype::missing(),
            quality: None,
            evidence: None,
            called_by: BTreeSet::new(),
        }
    }
}

/// One standardized SV call
///
/// Records are created by a standardizer or by cluster aggregation, and are not modified once
/// they enter the clustering pipeline.
///
#[derive(Clone, Debug, PartialEq)]
pub struct BreakpointRecord {
    /// IDs of the source calls, more than one if this is already a merged call
    pub ids: Vec<String>,

    /// Caller tags of the source calls
    pub sources: Vec<String>,

    pub chrom_a: String,

    /// 1-indexed position of breakpoint A
    pub pos_a: i64,
    pub chrom_b: String,

    /// 1-indexed position of breakpoint B
    pub pos_b: i64,
    pub strands: StrandPair,
    pub sv_type: SvType,

    /// SV length as reported by the caller, None for breakends
    pub sv_len: Option<i64>,
    pub ci_a: ConfidenceInterval,
    pub ci_b: ConfidenceInterval,

    /// Additional annotations which are not part of the record geometry
    pub info: BTreeMap<String, FieldValue>,

    pub samples: BTreeMap<String, SampleCall>,
}

impl BreakpointRecord {
    /// True for breakends joining two chromosomes
    ///
    /// Breakends on the same chromosome name can still be marked inter-chromosomal by annotation,
    /// which covers callers representing alternate haplotype contigs under a shared name.
    ///
    pub fn is_translocation(&self) -> bool {
        self.sv_type == SvType::Breakend
            && (self.chrom_a != self.chrom_b || self.info.contains_key(INTERCHROMOSOMAL_INFO_KEY))
    }

    /// Reference span of the SV, undefined for breakends
    pub fn length(&self) -> Option<i64> {
        if self.sv_type == SvType::Breakend || self.chrom_a != self.chrom_b {
            None
        } else {
            Some(self.pos_b - self.pos_a)
        }
    }

    pub fn label(&self) -> String {
        if self.ids.is_empty() {
            ".".to_string()
        } else {
            self.ids.join(";")
        }
    }

    pub fn is_secondary(&self) -> bool {
        self.info.contains_key(SECONDARY_INFO_KEY)
    }

    /// Key used to order records for clustering
    pub fn pos_a_key(&self) -> GenomePosKey {
        GenomePosKey::new(&self.chrom_a, self.pos_a)
    }

    /// Test for standardized order of breakpoints A and B
    ///
    /// Chromosome A must precede chromosome B in karyotype order, and on the same chromosome
    /// position A must not exceed position B.
    ///
    pub fn is_oriented(&self) -> bool {
        match compare_chroms(&self.chrom_a, &self.chrom_b) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.pos_a <= self.pos_b,
        }
    }

    /// Swap breakpoints A and B if required to put the record in standardized order
    ///
    /// Strands and confidence intervals travel with their breakpoint.
    ///
    pub fn orient(&mut self) {
        if !self.is_oriented() {
            std::mem::swap(&mut self.chrom_a, &mut self.chrom_b);
            std::mem::swap(&mut self.pos_a, &mut self.pos_b);
            std::mem::swap(&mut self.ci_a, &mut self.ci_b);
            self.strands = self.strands.swapped();
        }
    }

    /// Any sample carries a non-reference genotype
    pub fn has_called_sample(&self) -> bool {
        self.samples.values().any(|x| x.genotype.is_called())
    }
}

/// Total order used to sort records for output
///
/// Ties on the clustering key are broken by the remaining geometry and then the IDs, so sorting
/// does not depend on input order.
///
pub fn compare_breakpoint_records(r1: &BreakpointRecord, r2: &BreakpointRecord) -> Ordering {
    r1.pos_a_key()
        .cmp(&r2.pos_a_key())
        .then_with(|| compare_chroms(&r1.chrom_b, &r2.chrom_b))
        .then(r1.pos_b.cmp(&r2.pos_b))
        .then(r1.sv_type.cmp(&r2.sv_type))
        .then(r1.strands.cmp(&r2.strands))
        .then_with(|| r1.ids.cmp(&r2.ids))
}
