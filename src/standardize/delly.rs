use super::shared::{get_base_info, get_canonical_evidence, get_raw_sv_type};
use super::{CanonicalInfo, Standardizer};
use crate::breakpoint::{SvType, Strand, StrandPair};
use crate::errors::StandardizeError;
use crate::raw_record::{RawRecord, RawSample};

/// Strand pair for each value of the delly connection type (CT) field
///
fn get_connection_type_strands(ct: &str) -> Option<StrandPair> {
    use Strand::*;
    match ct {
        "3to5" => Some(StrandPair::new(Forward, Reverse)),
        "5to3" => Some(StrandPair::new(Reverse, Forward)),
        "3to3" => Some(StrandPair::new(Forward, Forward)),
        "5to5" => Some(StrandPair::new(Reverse, Reverse)),
        _ => None,
    }
}

pub struct DellyStandardizer;

impl Standardizer for DellyStandardizer {
    fn caller_tag(&self) -> &'static str {
        "delly"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_type = get_raw_sv_type(raw)?;
        let mut info = get_base_info(raw, self.caller_tag(), sv_type)?;

        if let Some(ct) = raw.info_string("CT") {
            // Some delly versions write "NtoN" for insertions, which falls through to the type
            // default
            if let Some(strands) = get_connection_type_strands(&ct) {
                info.strands = Some(strands);
            } else if ct != "NtoN" {
                return Err(StandardizeError::InvalidField {
                    id: raw.id.clone(),
                    key: "CT".to_string(),
                    value: ct,
                });
            }
        }

        // Translocation mate positions are given by POS2 in recent versions and by END in older
        // versions
        if sv_type == SvType::Breakend && info.pos_b.is_none() {
            info.pos_b = match raw.info_i64("POS2")? {
                Some(x) => Some(x),
                None => raw.info_i64("END")?,
            };
        }

        if sv_type == SvType::Insertion {
            if let Some(len) = raw.info_i64("INSLEN")? {
                info.sv_len = Some(len.abs());
            }
        }

        Ok(info)
    }

    /// Supporting read pairs plus supporting split reads
    fn sample_evidence(&self, sample: &RawSample) -> Option<i32> {
        match (sample.get_integer("DV"), sample.get_integer("RV")) {
            (None, None) => get_canonical_evidence(sample),
            (dv, rv) => Some(dv.unwrap_or(0) + rv.unwrap_or(0)),
        }
    }
}
