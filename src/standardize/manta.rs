use super::bnd_alt::{is_breakend_alt, parse_breakend_alt};
use super::shared::{get_base_info, get_canonical_evidence, get_raw_sv_type};
use super::{CanonicalInfo, Standardizer};
use crate::breakpoint::{Strand, StrandPair};
use crate::chrom_order::GenomePosKey;
use crate::errors::StandardizeError;
use crate::raw_record::{RawRecord, RawSample};

pub struct MantaStandardizer;

impl Standardizer for MantaStandardizer {
    fn caller_tag(&self) -> &'static str {
        "manta"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_type = get_raw_sv_type(raw)?;
        let mut info = get_base_info(raw, self.caller_tag(), sv_type)?;

        // Inversions are split into the two junctions of the event
        if raw.info_flag("INV3") {
            info.strands = Some(StrandPair::new(Strand::Forward, Strand::Forward));
        } else if raw.info_flag("INV5") {
            info.strands = Some(StrandPair::new(Strand::Reverse, Strand::Reverse));
        }
        Ok(info)
    }

    /// Alt-allele counts of spanning pairs (PR) and split reads (SR)
    fn sample_evidence(&self, sample: &RawSample) -> Option<i32> {
        let alt_count = |key| sample.get_integers(key).and_then(|x| x.get(1).copied());
        match (alt_count("PR"), alt_count("SR")) {
            (None, None) => get_canonical_evidence(sample),
            (pr, sr) => Some(pr.unwrap_or(0) + sr.unwrap_or(0)),
        }
    }

    /// Each manta breakend pair is written as two records linked by MATEID, and only the record
    /// whose breakend sorts first is kept
    fn is_secondary_record(&self, raw: &RawRecord) -> bool {
        if !raw.has_info("MATEID") {
            return false;
        }
        let alt = match raw.first_alt() {
            Some(x) if is_breakend_alt(x) => x,
            _ => return false,
        };
        match parse_breakend_alt(&raw.id, alt) {
            Ok(mate) => {
                let mate_key = GenomePosKey::new(&mate.mate_chrom, mate.mate_pos);
                GenomePosKey::new(&raw.chrom, raw.pos) > mate_key
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::SvType;
    use crate::raw_record::FieldValue;
    use crate::standardize::StandardizerRegistry;

    #[test]
    fn test_manta_tandem_dup() {
        let raw = RawRecord::new("chr2", 10000, "dup1", "N", "<DUP:TANDEM>")
            .with_info("SVTYPE", FieldValue::from_str_value("DUP"))
            .with_info("END", FieldValue::Integer(vec![12000]))
            .with_info("SVLEN", FieldValue::Integer(vec![2000]))
            .with_sample(
                "s1",
                &[
                    ("GT", FieldValue::from_str_value("0/1")),
                    ("GQ", FieldValue::Integer(vec![50])),
                    ("PR", FieldValue::Integer(vec![20, 6])),
                    ("SR", FieldValue::Integer(vec![15, 4])),
                ],
            );
        let registry = StandardizerRegistry::default();
        let rec = registry.standardize(&raw, "manta").unwrap();
        assert_eq!(rec.sv_type, SvType::Duplication);
        assert_eq!(rec.strands.to_string(), "-+");
        assert_eq!(rec.samples["s1"].evidence, Some(10));
    }

    #[test]
    fn test_manta_inversion_junctions() {
        let raw = RawRecord::new("chr2", 10000, "inv1", "N", "<INV>")
            .with_info("SVTYPE", FieldValue::from_str_value("INV"))
            .with_info("END", FieldValue::Integer(vec![12000]))
            .with_info("INV5", FieldValue::Flag);
        let registry = StandardizerRegistry::default();
        let rec = registry.standardize(&raw, "manta").unwrap();
        assert_eq!(rec.strands.to_string(), "--");
    }

    #[test]
    fn test_manta_breakend_mates() {
        let first = RawRecord::new("chr1", 100, "MantaBND:1:0", "N", "N[chr2:500[")
            .with_info("SVTYPE", FieldValue::from_str_value("BND"))
            .with_info("MATEID", FieldValue::from_str_value("MantaBND:1:1"));
        let second = RawRecord::new("chr2", 500, "MantaBND:1:1", "N", "]chr1:100]N")
            .with_info("SVTYPE", FieldValue::from_str_value("BND"))
            .with_info("MATEID", FieldValue::from_str_value("MantaBND:1:0"));

        let registry = StandardizerRegistry::default();
        let manta = registry.get("manta").unwrap();
        assert!(!manta.is_secondary_record(&first));
        assert!(manta.is_secondary_record(&second));

        // Both mates describe the same oriented junction
        let rec1 = registry.standardize(&first, "manta").unwrap();
        let rec2 = registry.standardize(&second, "manta").unwrap();
        assert_eq!(rec1.strands, rec2.strands);
        assert_eq!(
            (rec1.pos_a, rec1.pos_b, &rec1.chrom_b),
            (rec2.pos_a, rec2.pos_b, &rec2.chrom_b)
        );

        // Restandardization of the canonical breakend is a fixed point
        let rec3 = registry
            .standardize(&rec1.to_raw_record(&rec1.sources), "manta")
            .unwrap();
        assert_eq!(rec1, rec3);
    }
}
