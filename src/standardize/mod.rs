//! Conversion of caller-specific SV records into the canonical breakpoint schema
//!
//! Each caller family gets one [Standardizer] implementation. The [StandardizerRegistry] selects
//! the implementation from the caller tag and assembles the canonical record from the three
//! standardization hooks.
//!

mod bnd_alt;
mod canonical;
mod delly;
mod lumpy;
mod manta;
mod melt;
mod shared;
mod wham;

use std::collections::BTreeMap;

use crate::breakpoint::{BreakpointRecord, ConfidenceInterval, SampleCall, StrandPair, SvType};
use crate::errors::StandardizeError;
use crate::raw_record::{FieldValue, RawRecord, RawSample};

pub use bnd_alt::{BreakendAlt, is_breakend_alt, parse_breakend_alt};
pub use canonical::{CanonicalStandardizer, get_canonical_source_flag_key};
pub use shared::EVIDENCE_INFO_KEYS;
pub use delly::DellyStandardizer;
pub use lumpy::LumpyStandardizer;
pub use manta::MantaStandardizer;
pub use melt::MeltStandardizer;
pub use wham::WhamStandardizer;

/// Canonical annotation values derived from a raw record's INFO fields
///
/// Values which could not be found in the raw record are None, and are resolved against the
/// breakend ALT and the SV type defaults when the record is assembled.
///
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalInfo {
    pub sv_type: SvType,
    pub chrom_b: Option<String>,
    pub pos_b: Option<i64>,
    pub strands: Option<StrandPair>,
    pub sv_len: Option<i64>,
    pub ci_a: ConfidenceInterval,
    pub ci_b: ConfidenceInterval,
    pub sources: Vec<String>,

    /// Canonical annotations carried through without interpretation, such as PE and SR
    pub annotations: BTreeMap<String, FieldValue>,
}

/// Canonical ALT representation of a record
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalAlt {
    /// Symbolic allele, such as `<DEL>`
    pub symbolic: String,

    /// Mate location and strands, present when the raw ALT used breakend notation
    pub mate: Option<BreakendAlt>,
}

/// Normalization rules for one caller family
///
/// Implementations are stateless with respect to records: any configuration is fixed at
/// construction.
///
pub trait Standardizer: Send + Sync {
    /// Caller tag which selects this standardizer, and which is recorded as the record source
    fn caller_tag(&self) -> &'static str;

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError>;

    fn standardize_alts(
        &self,
        raw: &RawRecord,
        info: &CanonicalInfo,
    ) -> Result<CanonicalAlt, StandardizeError> {
        shared::standardize_alts(raw, info)
    }

    fn standardize_format(&self, raw: &RawRecord) -> BTreeMap<String, SampleCall> {
        shared::standardize_samples(raw, self.caller_tag(), |x| self.sample_evidence(x))
    }

    /// Count of observations supporting the variant allele in one sample
    fn sample_evidence(&self, sample: &RawSample) -> Option<i32> {
        shared::get_canonical_evidence(sample)
    }

    /// True for records which describe a breakend already reported by another record, and should
    /// be skipped so that each junction is represented once
    fn is_secondary_record(&self, _raw: &RawRecord) -> bool {
        false
    }
}

/// Build one canonical record from the three standardization hooks of `standardizer`
///
pub fn standardize_with(
    standardizer: &dyn Standardizer,
    raw: &RawRecord,
) -> Result<BreakpointRecord, StandardizeError> {
    let info = standardizer.standardize_info(raw)?;
    let alt = standardizer.standardize_alts(raw, &info)?;
    let samples = standardizer.standardize_format(raw);

    let malformed = || StandardizeError::MalformedBreakend {
        id: raw.id.clone(),
        alt: raw.first_alt().unwrap_or(".").to_string(),
    };

    let (chrom_b, pos_b, strands) = match alt.mate {
        Some(mate) => (mate.mate_chrom, mate.mate_pos, Some(mate.strands)),
        None => {
            let chrom_b = info.chrom_b.clone().unwrap_or_else(|| raw.chrom.clone());
            let pos_b = match info.pos_b {
                Some(x) => x,
                None => {
                    if info.sv_type == SvType::Breakend {
                        return Err(malformed());
                    }
                    shared::get_default_end(raw.pos, info.sv_type, info.sv_len)
                }
            };
            (chrom_b, pos_b, info.strands)
        }
    };

    let strands = strands
        .or_else(|| info.sv_type.default_strands())
        .ok_or_else(malformed)?;

    let sv_len = if info.sv_type == SvType::Breakend {
        None
    } else if info.sv_len.is_some() || info.sv_type == SvType::Insertion {
        info.sv_len
    } else {
        Some((pos_b - raw.pos).abs())
    };

    let ids = if raw.id.is_empty() || raw.id == "." {
        Vec::new()
    } else {
        raw.id.split(';').map(|x| x.to_string()).collect()
    };

    let mut record = BreakpointRecord {
        ids,
        sources: info.sources,
        chrom_a: raw.chrom.clone(),
        pos_a: raw.pos,
        chrom_b,
        pos_b,
        strands,
        sv_type: info.sv_type,
        sv_len,
        ci_a: info.ci_a,
        ci_b: info.ci_b,
        info: info.annotations,
        samples,
    };
    record.orient();
    Ok(record)
}

/// Registry of standardizers keyed by lower-case caller tag
///
pub struct StandardizerRegistry {
    standardizers: BTreeMap<String, Box<dyn Standardizer>>,
}

impl StandardizerRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            standardizers: BTreeMap::new(),
        }
    }

    /// Add a standardizer, replacing any previous standardizer registered under the same tag
    pub fn register(&mut self, standardizer: Box<dyn Standardizer>) {
        self.standardizers
            .insert(standardizer.caller_tag().to_lowercase(), standardizer);
    }

    pub fn caller_tags(&self) -> Vec<String> {
        self.standardizers.keys().cloned().collect()
    }

    pub fn get(&self, caller_tag: &str) -> Result<&dyn Standardizer, StandardizeError> {
        self.standardizers
            .get(&caller_tag.to_lowercase())
            .map(|x| x.as_ref())
            .ok_or_else(|| StandardizeError::UnregisteredCaller {
                caller: caller_tag.to_string(),
            })
    }

    /// Convert one raw record from the given caller into the canonical schema
    ///
    pub fn standardize(
        &self,
        raw: &RawRecord,
        caller_tag: &str,
    ) -> Result<BreakpointRecord, StandardizeError> {
        standardize_with(self.get(caller_tag)?, raw)
    }
}

impl Default for StandardizerRegistry {
    /// Registry with every supported caller family
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DellyStandardizer));
        registry.register(Box::new(LumpyStandardizer));
        registry.register(Box::new(MantaStandardizer));
        registry.register(Box::new(WhamStandardizer));
        registry.register(Box::new(MeltStandardizer));
        registry.register(Box::new(CanonicalStandardizer));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unregistered_caller() {
        let registry = StandardizerRegistry::default();
        let raw = RawRecord::new("chr1", 100, "a", "N", "<DEL>")
            .with_info("SVTYPE", FieldValue::from_str_value("DEL"))
            .with_info("END", FieldValue::Integer(vec![500]));
        assert_eq!(
            registry.standardize(&raw, "pindel"),
            Err(StandardizeError::UnregisteredCaller {
                caller: "pindel".to_string()
            })
        );
    }

    #[test]
    fn test_caller_tag_is_case_insensitive() {
        let registry = StandardizerRegistry::default();
        assert_eq!(registry.get("LUMPY").unwrap().caller_tag(), "lumpy");
        assert_eq!(
            registry.caller_tags(),
            vec!["canonical", "delly", "lumpy", "manta", "melt", "wham"]
        );
    }

    #[test]
    fn test_registering_new_caller() {
        struct TestCaller;

        impl Standardizer for TestCaller {
            fn caller_tag(&self) -> &'static str {
                "testcaller"
            }

            fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
                shared::get_base_info(raw, self.caller_tag(), SvType::Duplication)
            }
        }

        let mut registry = StandardizerRegistry::new();
        registry.register(Box::new(TestCaller));
        let raw = RawRecord::new("chr1", 100, "a", "N", "<DUP>")
            .with_info("END", FieldValue::Integer(vec![500]));
        let rec = registry.standardize(&raw, "testcaller").unwrap();
        assert_eq!(rec.sv_type, SvType::Duplication);
        assert_eq!(rec.strands.to_string(), "-+");
        assert_eq!(rec.sv_len, Some(400));
        assert_eq!(rec.sources, vec!["testcaller"]);
    }

    #[test]
    fn test_bnd_without_mate_is_malformed() {
        let registry = StandardizerRegistry::default();
        let raw = RawRecord::new("chr1", 100, "a", "N", "N.")
            .with_info("SVTYPE", FieldValue::from_str_value("BND"));
        assert!(matches!(
            registry.standardize(&raw, "lumpy"),
            Err(StandardizeError::MalformedBreakend { .. })
        ));
    }

    #[test]
    fn test_reversed_breakend_is_oriented() {
        let registry = StandardizerRegistry::default();
        let raw = RawRecord::new("chr5", 1000, "b1", "N", "]chr2:300]N")
            .with_info("SVTYPE", FieldValue::from_str_value("BND"));
        let rec = registry.standardize(&raw, "lumpy").unwrap();
        assert_eq!(rec.chrom_a, "chr2");
        assert_eq!(rec.pos_a, 300);
        assert_eq!(rec.chrom_b, "chr5");
        assert_eq!(rec.pos_b, 1000);
        assert_eq!(rec.strands.to_string(), "+-");
        assert!(rec.is_translocation());
    }
}
