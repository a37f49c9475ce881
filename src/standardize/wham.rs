use super::shared::{get_base_info, get_raw_sv_type};
use super::{CanonicalInfo, Standardizer};
use crate::errors::StandardizeError;
use crate::raw_record::RawRecord;

/// Wham records carry no strand information, so strands come from the SV type defaults unless the
/// record is already canonical
///
pub struct WhamStandardizer;

impl Standardizer for WhamStandardizer {
    fn caller_tag(&self) -> &'static str {
        "wham"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_type = get_raw_sv_type(raw)?;
        get_base_info(raw, self.caller_tag(), sv_type)
    }
}
