use std::collections::BTreeMap;

use super::shared::get_ci;
use super::{CanonicalInfo, Standardizer};
use crate::breakpoint::{
    CIEND_INFO_KEY, CIPOS_INFO_KEY, SVLEN_INFO_KEY, Strand, StrandPair, SvType,
};
use crate::errors::StandardizeError;
use crate::raw_record::RawRecord;

/// Mobile element insertions
///
/// Every record is an insertion regardless of the element class in SVTYPE. Insertions have no
/// breakpoint span, so END is set one base past POS and both breakpoints stay on the same
/// chromosome.
///
pub struct MeltStandardizer;

impl Standardizer for MeltStandardizer {
    fn caller_tag(&self) -> &'static str {
        "melt"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_len = raw
            .info_i64(SVLEN_INFO_KEY)?
            .filter(|&x| x > 0 || x < -1)
            .map(|x| x.abs());
        Ok(CanonicalInfo {
            sv_type: SvType::Insertion,
            chrom_b: Some(raw.chrom.clone()),
            pos_b: Some(raw.pos + 1),
            strands: Some(StrandPair::new(Strand::Forward, Strand::Reverse)),
            sv_len,
            ci_a: get_ci(raw, CIPOS_INFO_KEY)?,
            ci_b: get_ci(raw, CIEND_INFO_KEY)?,
            sources: vec![self.caller_tag().to_string()],
            annotations: BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_record::FieldValue;
    use crate::standardize::StandardizerRegistry;

    #[test]
    fn test_melt_insertion() {
        let raw = RawRecord::new("chr4", 5000, "ALU_1", "T", "<INS:ME:ALU>")
            .with_info("SVTYPE", FieldValue::from_str_value("ALU"))
            .with_info("SVLEN", FieldValue::Integer(vec![281]))
            .with_sample("s1", &[("GT", FieldValue::from_str_value("1/1"))]);

        let registry = StandardizerRegistry::default();
        let rec = registry.standardize(&raw, "melt").unwrap();
        assert_eq!(rec.sv_type, SvType::Insertion);
        assert_eq!(rec.chrom_b, "chr4");
        assert_eq!(rec.pos_b, 5001);
        assert_eq!(rec.strands.to_string(), "+-");
        assert_eq!(rec.sv_len, Some(281));
        assert_eq!(rec.sources, vec!["melt"]);

        let rec2 = registry
            .standardize(&rec.to_raw_record(&rec.sources), "melt")
            .unwrap();
        assert_eq!(rec, rec2);
    }
}
