use std::collections::{BTreeMap, BTreeSet};

use super::shared::{
    get_base_info, get_canonical_evidence, get_raw_sv_type, standardize_samples,
};
use super::{CanonicalInfo, Standardizer};
use crate::breakpoint::{
    BreakpointRecord, CHR2_INFO_KEY, CIEND_INFO_KEY, CIPOS_INFO_KEY, END_INFO_KEY,
    END2_INFO_KEY, EV_FORMAT_KEY, GQ_FORMAT_KEY, GT_FORMAT_KEY, MEMBERS_INFO_KEY,
    RMSSTD_INFO_KEY, SECONDARY_INFO_KEY, SOURCES_INFO_KEY, STRANDS_INFO_KEY, SVLEN_INFO_KEY,
    SVTYPE_INFO_KEY, SampleCall, SvType,
};
use crate::errors::StandardizeError;
use crate::raw_record::{FieldValue, RawRecord, RawSample};

/// Reads records which are already in the canonical schema
///
/// Provenance annotations written by cluster aggregation are retained, so merged output can be
/// standardized again or clustered in a second pass.
///
pub struct CanonicalStandardizer;

impl Standardizer for CanonicalStandardizer {
    fn caller_tag(&self) -> &'static str {
        "canonical"
    }

    fn standardize_info(&self, raw: &RawRecord) -> Result<CanonicalInfo, StandardizeError> {
        let sv_type = get_raw_sv_type(raw)?;
        let mut info = get_base_info(raw, self.caller_tag(), sv_type)?;

        let sources = raw.info_strings(SOURCES_INFO_KEY);
        if !sources.is_empty() {
            info.sources = sources;
        }

        let members = raw.info_strings(MEMBERS_INFO_KEY);
        if !members.is_empty() {
            info.annotations
                .insert(MEMBERS_INFO_KEY.to_string(), FieldValue::String(members));
        }
        if let Some(FieldValue::Float(x)) = raw.info.get(RMSSTD_INFO_KEY) {
            info.annotations
                .insert(RMSSTD_INFO_KEY.to_string(), FieldValue::Float(x.clone()));
        }
        if raw.info_flag(SECONDARY_INFO_KEY) {
            info.annotations
                .insert(SECONDARY_INFO_KEY.to_string(), FieldValue::Flag);
        }
        Ok(info)
    }

    /// The called-by set is read from the per-source FORMAT flags, rather than inferred from the
    /// genotype
    fn standardize_format(&self, raw: &RawRecord) -> BTreeMap<String, SampleCall> {
        let mut samples = standardize_samples(raw, self.caller_tag(), get_canonical_evidence);
        for sample in raw.samples.iter() {
            if let Some(call) = samples.get_mut(&sample.name) {
                call.called_by = get_called_by_flags(sample);
            }
        }
        samples
    }
}

/// Caller tags with a set per-source FORMAT flag
///
fn get_called_by_flags(sample: &RawSample) -> BTreeSet<String> {
    sample
        .fields
        .iter()
        .filter(|(key, _)| !is_fixed_format_key(key))
        .filter(|(_, value)| matches!(value, FieldValue::Integer(x) if x.first() == Some(&1)))
        .map(|(key, _)| key.clone())
        .collect()
}

fn is_fixed_format_key(key: &str) -> bool {
    [GT_FORMAT_KEY, GQ_FORMAT_KEY, EV_FORMAT_KEY].contains(&key)
}

/// FORMAT key of the flag marking that the given caller called the sample
pub fn get_canonical_source_flag_key(caller_tag: &str) -> String {
    caller_tag.to_string()
}

impl BreakpointRecord {
    /// Convert to the canonical raw record shape
    ///
    /// `source_tags` lists the caller tags which receive a per-source FORMAT flag. This is
    /// normally every source in the output file, so that all records share the same FORMAT
    /// layout.
    ///
    pub fn to_raw_record(&self, source_tags: &[String]) -> RawRecord {
        let id = self.label();
        let alt = format!("<{}>", self.sv_type);
        let mut raw = RawRecord::new(&self.chrom_a, self.pos_a, &id, "N", &alt);

        let (end, end2) = if self.sv_type == SvType::Breakend {
            (self.pos_a, Some(self.pos_b))
        } else {
            (self.pos_b, None)
        };

        raw = raw
            .with_info(
                SVTYPE_INFO_KEY,
                FieldValue::from_str_value(&self.sv_type.to_string()),
            )
            .with_info(CHR2_INFO_KEY, FieldValue::from_str_value(&self.chrom_b))
            .with_info(END_INFO_KEY, FieldValue::Integer(vec![end as i32]))
            .with_info(
                STRANDS_INFO_KEY,
                FieldValue::from_str_value(&self.strands.to_string()),
            )
            .with_info(CIPOS_INFO_KEY, self.ci_a.to_field_value())
            .with_info(CIEND_INFO_KEY, self.ci_b.to_field_value())
            .with_info(SOURCES_INFO_KEY, FieldValue::String(self.sources.clone()));
        if let Some(end2) = end2 {
            raw = raw.with_info(END2_INFO_KEY, FieldValue::Integer(vec![end2 as i32]));
        }
        if let Some(sv_len) = self.sv_len {
            raw = raw.with_info(SVLEN_INFO_KEY, FieldValue::Integer(vec![sv_len as i32]));
        }
        for (key, value) in self.info.iter() {
            raw.info.insert(key.clone(), value.clone());
        }

        for (name, call) in self.samples.iter() {
            let flags = source_tags
                .iter()
                .map(|tag| {
                    let flag = call.called_by.contains(tag) as i32;
                    (get_canonical_source_flag_key(tag), flag)
                })
                .collect::<Vec<_>>();
            let mut fields = vec![(
                GT_FORMAT_KEY,
                FieldValue::from_str_value(&call.genotype.to_string()),
            )];
            if let Some(gq) = call.quality {
                fields.push((GQ_FORMAT_KEY, FieldValue::Integer(vec![gq])));
            }
            if let Some(ev) = call.evidence {
                fields.push((EV_FORMAT_KEY, FieldValue::Integer(vec![ev])));
            }
            for (key, flag) in flags.iter() {
                fields.push((key.as_str(), FieldValue::Integer(vec![*flag])));
            }
            raw = raw.with_sample(name, &fields);
        }
        raw
    }
}
