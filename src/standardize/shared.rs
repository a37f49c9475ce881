//! Standardization rules shared by all caller families
//!

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::bnd_alt::{is_breakend_alt, parse_breakend_alt};
use super::{CanonicalAlt, CanonicalInfo};
use crate::breakpoint::{
    CHR2_INFO_KEY, CIEND_INFO_KEY, CIPOS_INFO_KEY, ConfidenceInterval, END_INFO_KEY,
    END2_INFO_KEY, EV_FORMAT_KEY, GQ_FORMAT_KEY, Genotype, INTERCHROMOSOMAL_INFO_KEY,
    STRANDS_INFO_KEY, SVLEN_INFO_KEY, SVTYPE_INFO_KEY, SampleCall, StrandPair, SvType,
};
use crate::errors::StandardizeError;
use crate::raw_record::{FieldValue, RawRecord, RawSample};

/// Integer evidence annotations carried from INFO into the canonical record when present
pub const EVIDENCE_INFO_KEYS: [&str; 2] = ["PE", "SR"];

/// Parse an SV type label, including the aliases used by common callers
///
pub fn parse_sv_type(raw: &RawRecord, label: &str) -> Result<SvType, StandardizeError> {
    let label = label.trim_start_matches('<').trim_end_matches('>');
    if let Ok(x) = SvType::from_str(label) {
        return Ok(x);
    }
    match label {
        "TRA" | "CTX" => Ok(SvType::Breakend),
        "DUP:TANDEM" | "TANDEM" => Ok(SvType::Duplication),
        _ => {
            // Symbolic ALT subtypes such as "INS:ME:ALU"
            if let Some((prefix, _)) = label.split_once(':') {
                if let Ok(x) = SvType::from_str(prefix) {
                    return Ok(x);
                }
            }
            Err(StandardizeError::UnknownSvType {
                id: raw.id.clone(),
                sv_type: label.to_string(),
            })
        }
    }
}

/// SV type from the SVTYPE INFO field, falling back to a symbolic or breakend ALT allele
///
pub fn get_raw_sv_type(raw: &RawRecord) -> Result<SvType, StandardizeError> {
    if let Some(label) = raw.info_string(SVTYPE_INFO_KEY) {
        return parse_sv_type(raw, &label);
    }
    match raw.first_alt() {
        Some(alt) if alt.starts_with('<') => parse_sv_type(raw, alt),
        Some(alt) if is_breakend_alt(alt) => Ok(SvType::Breakend),
        alt => Err(StandardizeError::UnknownSvType {
            id: raw.id.clone(),
            sv_type: alt.unwrap_or(".").to_string(),
        }),
    }
}

/// Parse one STRANDS entry, which may carry a support count as in "+-:7"
///
fn parse_strands_entry(raw: &RawRecord, entry: &str) -> Result<(StrandPair, i64), StandardizeError> {
    let invalid = || StandardizeError::InvalidField {
        id: raw.id.clone(),
        key: STRANDS_INFO_KEY.to_string(),
        value: entry.to_string(),
    };
    let (strands_str, support) = match entry.split_once(':') {
        Some((s, count)) => (s, count.parse::<i64>().map_err(|_| invalid())?),
        None => (entry, 0),
    };
    let strands = StrandPair::from_str(strands_str).map_err(|_| invalid())?;
    Ok((strands, support))
}

/// Strand pair from the STRANDS INFO field
///
/// When several entries are listed the entry with the most support is used, and ties go to the
/// first listed entry.
///
pub fn get_strands(raw: &RawRecord) -> Result<Option<StrandPair>, StandardizeError> {
    let mut best: Option<(StrandPair, i64)> = None;
    for entry in raw.info_strings(STRANDS_INFO_KEY) {
        for entry in entry.split(',') {
            let (strands, support) = parse_strands_entry(raw, entry)?;
            if best.is_none_or(|(_, x)| support > x) {
                best = Some((strands, support));
            }
        }
    }
    Ok(best.map(|(strands, _)| strands))
}

/// Confidence interval from a two-value INFO field such as CIPOS
///
/// A single value is treated as a symmetric interval, and an absent field gives the zero-width
/// interval.
///
pub fn get_ci(raw: &RawRecord, key: &str) -> Result<ConfidenceInterval, StandardizeError> {
    let vals = raw.info_i64_list(key)?.unwrap_or_default();
    Ok(match vals.as_slice() {
        [] => ConfidenceInterval::default(),
        [x] => ConfidenceInterval::from_pair(-x.abs(), x.abs()),
        [start, end, ..] => ConfidenceInterval::from_pair(*start, *end),
    })
}

/// SV length from the SVLEN INFO field, always non-negative
///
/// Breakends have no length, and some callers write SVLEN=-1 or 0 as a placeholder, which is
/// treated as absent.
///
pub fn get_sv_len(raw: &RawRecord, sv_type: SvType) -> Result<Option<i64>, StandardizeError> {
    if sv_type == SvType::Breakend {
        return Ok(None);
    }
    Ok(match raw.info_i64(SVLEN_INFO_KEY)? {
        Some(-1) | Some(0) | None => None,
        Some(x) => Some(x.abs()),
    })
}

/// End position for a record with no END or mate information
pub fn get_default_end(pos: i64, sv_type: SvType, sv_len: Option<i64>) -> i64 {
    if sv_type.has_reference_span() {
        pos + sv_len.unwrap_or(0)
    } else {
        pos
    }
}

/// Canonical integer copies of the evidence annotations present in the raw record
///
pub fn get_evidence_annotations(
    raw: &RawRecord,
) -> Result<BTreeMap<String, FieldValue>, StandardizeError> {
    let mut annotations = BTreeMap::new();
    for key in EVIDENCE_INFO_KEYS {
        if let Some(x) = raw.info_i64(key)? {
            annotations.insert(key.to_string(), FieldValue::Integer(vec![x as i32]));
        }
    }
    if raw.info_flag(INTERCHROMOSOMAL_INFO_KEY) {
        annotations.insert(INTERCHROMOSOMAL_INFO_KEY.to_string(), FieldValue::Flag);
    }
    Ok(annotations)
}

/// Read all canonical INFO keys for the given SV type
///
/// Caller-specific standardizers start from this and override the values described by their own
/// INFO keys, so that canonical records can always be read back by any standardizer.
///
pub fn get_base_info(
    raw: &RawRecord,
    caller_tag: &str,
    sv_type: SvType,
) -> Result<CanonicalInfo, StandardizeError> {
    let pos_b = if sv_type == SvType::Breakend {
        raw.info_i64(END2_INFO_KEY)?
    } else {
        raw.info_i64(END_INFO_KEY)?
    };
    Ok(CanonicalInfo {
        sv_type,
        chrom_b: raw.info_string(CHR2_INFO_KEY),
        pos_b,
        strands: get_strands(raw)?,
        sv_len: get_sv_len(raw, sv_type)?,
        ci_a: get_ci(raw, CIPOS_INFO_KEY)?,
        ci_b: get_ci(raw, CIEND_INFO_KEY)?,
        sources: vec![caller_tag.to_string()],
        annotations: get_evidence_annotations(raw)?,
    })
}

/// Canonical ALT: the symbolic allele for the SV type, plus the mate parsed from any breakend
/// notation
///
pub fn standardize_alts(
    raw: &RawRecord,
    info: &CanonicalInfo,
) -> Result<CanonicalAlt, StandardizeError> {
    let mate = match raw.first_alt() {
        Some(alt) if is_breakend_alt(alt) => Some(parse_breakend_alt(&raw.id, alt)?),
        _ => None,
    };
    Ok(CanonicalAlt {
        symbolic: format!("<{}>", info.sv_type),
        mate,
    })
}

pub fn get_canonical_evidence(sample: &RawSample) -> Option<i32> {
    sample.get_integer(EV_FORMAT_KEY)
}

/// Project each raw sample into the canonical sample call
///
/// Absent fields become missing values. A sample with a non-reference genotype is marked as
/// called by `caller_tag`.
///
pub fn standardize_samples(
    raw: &RawRecord,
    caller_tag: &str,
    get_evidence: impl Fn(&RawSample) -> Option<i32>,
) -> BTreeMap<String, SampleCall> {
    raw.samples
        .iter()
        .map(|sample| {
            let genotype = sample
                .genotype()
                .and_then(Genotype::parse)
                .unwrap_or_else(Genotype::missing);
            let mut called_by = BTreeSet::new();
            if genotype.is_called() {
                called_by.insert(caller_tag.to_string());
            }
            let call = SampleCall {
                genotype,
                quality: sample.get_integer(GQ_FORMAT_KEY),
                evidence: get_evidence(sample),
                called_by,
            };
            (sample.name.clone(), call)
        })
        .collect()
}
