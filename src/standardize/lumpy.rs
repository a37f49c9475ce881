use super::shared::{get_base_info, get_canonical_evidence, get_raw_sv_type};
use super::{CanonicalInfo, Standardizer};
use crate::breakpoint::SECONDARY_INFO_KEY;
use crate::errors::StandardizeError;
use crate::raw_record::{RawRecord, RawSample};

/// Lumpy reports strands with a support count per entry, such as "+-:7", which the shared STRANDS
/// parser already handles
///
pub struct LumpyStandardizer;

impl Standardizer for LumpyStandardizer {
    fn caller_tag(&self) -> &'static str {
        "lumpy"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_type = get_raw_sv_type(raw)?;
        get_base_info(raw, self.caller_tag(), sv_type)
    }

    fn sample_evidence(&self, sample: &RawSample) -> Option<i32> {
        sample
            .get_integer("SU")
            .or_else(|| get_canonical_evidence(sample))
    }

    /// Each lumpy breakend pair is written as two records, and the second is flagged SECONDARY
    fn is_secondary_record(&self, raw: &RawRecord) -> bool {
        raw.info_flag(SECONDARY_INFO_KEY)
    }
}
