//! Writing standardized and merged SV records in the canonical VCF schema
//!

use std::collections::{BTreeMap, BTreeSet};

use camino::Utf8Path;
use log::info;
use rust_htslib::bcf;

use crate::bcf_utils::ContigInfo;
use crate::breakpoint::{GT_FORMAT_KEY, Genotype};
use crate::chrom_order::compare_chroms;
use crate::cli;
use crate::errors::PipelineError;
use crate::raw_record::{FieldValue, RawRecord, RawSample};
use crate::vcf_utils::{self, MISSING_FLOAT, MISSING_INTEGER, VECTOR_END_FLOAT, VECTOR_END_INTEGER};

/// Build the canonical SV header
///
/// # Arguments
/// * `source_tags` - Caller tags which each get a per-sample FORMAT flag
///
pub fn get_sv_vcf_header(
    contigs: &[ContigInfo],
    sample_names: &[String],
    source_tags: &[String],
) -> bcf::Header {
    let mut header = vcf_utils::get_basic_vcf_header(contigs, sample_names);

    let mut records = Vec::<&[u8]>::new();

    records.append(&mut vec![
        br#"##ALT=<ID=DEL,Description="Deletion">"#,
        br#"##ALT=<ID=DUP,Description="Duplication">"#,
        br#"##ALT=<ID=INV,Description="Inversion">"#,
        br#"##ALT=<ID=INS,Description="Insertion">"#,
        br#"##ALT=<ID=BND,Description="Breakend joining two breakpoints">"#,
    ]);

    // Note that the `PASS` and `.` FILTER records below are not typically included in the header,
    // but there's an oddity in programatically creating vcfs in htslib that forces these to be present,
    // and specifically ordered before INFO/FORMAT.
    //
    records.push(br#"##FILTER=<ID=PASS,Description="All filters passed">"#);
    records.push(br#"##FILTER=<ID=.,Description="Unknown filtration status">"#);

    records.append(&mut vec![
        br#"##INFO=<ID=SVTYPE,Number=1,Type=String,Description="Type of structural variant">"#,
        br#"##INFO=<ID=CHR2,Number=1,Type=String,Description="Chromosome of breakpoint B">"#,
        br#"##INFO=<ID=END,Number=1,Type=Integer,Description="Position of breakpoint B, or POS for breakend records">"#,
        br#"##INFO=<ID=END2,Number=1,Type=Integer,Description="Position of breakpoint B for breakend records">"#,
        br#"##INFO=<ID=STRANDS,Number=1,Type=String,Description="Strands of breakpoints A and B">"#,
        br#"##INFO=<ID=SVLEN,Number=1,Type=Integer,Description="Length of structural variant">"#,
        br#"##INFO=<ID=CIPOS,Number=2,Type=Integer,Description="Confidence interval around POS">"#,
        br#"##INFO=<ID=CIEND,Number=2,Type=Integer,Description="Confidence interval around breakpoint B">"#,
        br#"##INFO=<ID=SOURCES,Number=.,Type=String,Description="Callers of the structural variant">"#,
        br#"##INFO=<ID=MEMBERS,Number=.,Type=String,Description="IDs of the records merged into this record">"#,
        br#"##INFO=<ID=RMSSTD,Number=2,Type=Float,Description="Root-mean-square deviation of merged breakpoint A and B positions">"#,
        br#"##INFO=<ID=PE,Number=1,Type=Integer,Description="Count of supporting read pairs">"#,
        br#"##INFO=<ID=SR,Number=1,Type=Integer,Description="Count of supporting split reads">"#,
        br#"##INFO=<ID=SECONDARY,Number=0,Type=Flag,Description="Second breakend of a pair already reported by another record">"#,
        br#"##INFO=<ID=INTERCHROMOSOMAL,Number=0,Type=Flag,Description="Breakend joins two distinct chromosomes">"#,
    ]);

    records.append(&mut vec![
        br#"##FORMAT=<ID=GT,Number=1,Type=String,Description="Genotype">"#,
        br#"##FORMAT=<ID=GQ,Number=1,Type=Integer,Description="Genotype Quality">"#,
        br#"##FORMAT=<ID=EV,Number=1,Type=Integer,Description="Count of observations supporting the variant allele">"#,
    ]);

    let source_records = source_tags
        .iter()
        .map(|tag| {
            format!(
                "##FORMAT=<ID={tag},Number=1,Type=Integer,Description=\"Sample called by {tag}\">"
            )
        })
        .collect::<Vec<_>>();
    records.extend(source_records.iter().map(|x| x.as_bytes()));

    for x in records.into_iter() {
        header.push_record(x);
    }

    header
}

/// Union of the input contigs and the chromosomes of the output records, in karyotype order
///
/// Every record chromosome must be declared in the header, but some callers write VCF files
/// without contig records.
///
pub fn get_output_contigs(input_contigs: &[ContigInfo], records: &[RawRecord]) -> Vec<ContigInfo> {
    let mut contigs = BTreeMap::new();
    for contig in input_contigs.iter() {
        let entry = contigs.entry(contig.name.clone()).or_insert(None);
        if entry.is_none() {
            *entry = contig.length;
        }
    }
    for record in records.iter() {
        contigs.entry(record.chrom.clone()).or_insert(None);
    }
    let mut contigs = contigs
        .into_iter()
        .map(|(name, length)| ContigInfo { name, length })
        .collect::<Vec<_>>();
    contigs.sort_by(|a, b| compare_chroms(&a.name, &b.name));
    contigs
}

/// Get the htslib GT encoding of a genotype
fn get_gt_values(gt: &Genotype) -> Vec<i32> {
    use bcf::record::GenotypeAllele::*;
    gt.alleles
        .iter()
        .enumerate()
        .map(|(allele_index, allele)| {
            // The phase bit is only meaningful after the first allele
            let phased = gt.phased && allele_index > 0;
            let x = match (allele, phased) {
                (Some(a), false) => Unphased(*a as i32),
                (Some(a), true) => Phased(*a as i32),
                (None, false) => UnphasedMissing,
                (None, true) => PhasedMissing,
            };
            i32::from(x)
        })
        .collect()
}

/// Pad each sample's values to the same count, as required for htslib FORMAT vectors
///
fn get_padded_format_values<T: Copy>(
    sample_values: &[Option<Vec<T>>],
    missing: T,
    vector_end: T,
) -> Vec<T> {
    let width = sample_values
        .iter()
        .map(|x| x.as_ref().map(|v| v.len()).unwrap_or(1))
        .max()
        .unwrap_or(1)
        .max(1);
    let mut values = Vec::new();
    for x in sample_values.iter() {
        let x = match x {
            Some(v) if !v.is_empty() => v.clone(),
            _ => vec![missing],
        };
        let pad = width - x.len();
        values.extend(x);
        values.extend(std::iter::repeat_n(vector_end, pad));
    }
    values
}

/// Writes raw records into a VCF file with the canonical SV header
///
pub struct SvVcfWriter {
    writer: bcf::Writer,
    sample_names: Vec<String>,
}

impl SvVcfWriter {
    pub fn new(filename: &Utf8Path, header: &bcf::Header) -> Result<Self, PipelineError> {
        let writer = bcf::Writer::from_path(filename, header, false, bcf::Format::Vcf)?;
        let sample_names = writer
            .header()
            .samples()
            .into_iter()
            .map(|x| String::from_utf8_lossy(x).to_string())
            .collect();
        Ok(Self {
            writer,
            sample_names,
        })
    }

    fn push_info(
        record: &mut bcf::Record,
        key: &str,
        value: &FieldValue,
    ) -> Result<(), PipelineError> {
        let tag = key.as_bytes();
        match value {
            FieldValue::Flag => record.push_info_flag(tag)?,
            FieldValue::Integer(x) => record.push_info_integer(tag, x)?,
            FieldValue::Float(x) => record.push_info_float(tag, x)?,
            FieldValue::String(x) => {
                let x = x.iter().map(|s| s.as_bytes()).collect::<Vec<_>>();
                record.push_info_string(tag, &x)?
            }
        }
        Ok(())
    }

    /// Push all FORMAT fields, in header sample order
    ///
    /// Samples missing from the raw record, or missing one field, are written as missing values.
    ///
    fn push_samples(&self, record: &mut bcf::Record, raw: &RawRecord) -> Result<(), PipelineError> {
        if self.sample_names.is_empty() {
            return Ok(());
        }
        let samples = self
            .sample_names
            .iter()
            .map(|name| raw.samples.iter().find(|x| &x.name == name))
            .collect::<Vec<Option<&RawSample>>>();

        // GT must be the first FORMAT field
        let gts = samples
            .iter()
            .map(|x| {
                let gt = x
                    .and_then(|s| s.genotype())
                    .and_then(Genotype::parse)
                    .unwrap_or_else(Genotype::missing);
                Some(get_gt_values(&gt))
            })
            .collect::<Vec<_>>();
        let gt_missing = i32::from(bcf::record::GenotypeAllele::UnphasedMissing);
        record.push_format_integer(
            GT_FORMAT_KEY.as_bytes(),
            &get_padded_format_values(&gts, gt_missing, VECTOR_END_INTEGER),
        )?;

        let keys = samples
            .iter()
            .flatten()
            .flat_map(|x| x.fields.keys().map(|k| k.as_str()))
            .filter(|&k| k != GT_FORMAT_KEY)
            .collect::<BTreeSet<_>>();

        for key in keys {
            let values = samples
                .iter()
                .map(|x| x.and_then(|s| s.fields.get(key)))
                .collect::<Vec<_>>();
            let tag = key.as_bytes();
            match values.iter().flatten().next() {
                Some(FieldValue::Integer(_)) => {
                    let x = values
                        .iter()
                        .map(|v| match v {
                            Some(FieldValue::Integer(x)) => Some(x.clone()),
                            _ => None,
                        })
                        .collect::<Vec<_>>();
                    record.push_format_integer(
                        tag,
                        &get_padded_format_values(&x, MISSING_INTEGER, VECTOR_END_INTEGER),
                    )?;
                }
                Some(FieldValue::Float(_)) => {
                    let x = values
                        .iter()
                        .map(|v| match v {
                            Some(FieldValue::Float(x)) => Some(x.clone()),
                            _ => None,
                        })
                        .collect::<Vec<_>>();
                    record.push_format_float(
                        tag,
                        &get_padded_format_values(&x, MISSING_FLOAT, VECTOR_END_FLOAT),
                    )?;
                }
                Some(FieldValue::String(_)) => {
                    let x = values
                        .iter()
                        .map(|v| match v {
                            Some(FieldValue::String(x)) if !x.is_empty() => x.join(","),
                            _ => ".".to_string(),
                        })
                        .map(|x| x.into_bytes())
                        .collect::<Vec<_>>();
                    record.push_format_string(tag, &x)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn write_record(&mut self, raw: &RawRecord) -> Result<(), PipelineError> {
        let mut record = self.writer.empty_record();
        let rid = self.writer.header().name2rid(raw.chrom.as_bytes())?;
        record.set_rid(Some(rid));
        record.set_pos(raw.pos - 1);
        record.set_id(raw.id.as_bytes())?;

        let mut alleles = vec![raw.ref_allele.as_bytes()];
        alleles.extend(raw.alts.iter().map(|x| x.as_bytes()));
        record.set_alleles(&alleles)?;
        record.set_qual(bcf::record::Numeric::missing());

        for (key, value) in raw.info.iter() {
            Self::push_info(&mut record, key, value)?;
        }
        self.push_samples(&mut record, raw)?;

        self.writer.write(&record)?;
        Ok(())
    }
}

/// Write records to a bgzipped VCF file and build its tabix index
///
/// Records must already be in output order.
///
pub fn write_indexed_sv_vcf_file(
    shared_settings: &cli::SharedSettings,
    filename: &Utf8Path,
    header: &bcf::Header,
    records: &[RawRecord],
) -> Result<(), PipelineError> {
    info!("Writing structural variants to file: '{filename}'");

    // The writer is dropped to flush the file before indexing
    {
        let mut writer = SvVcfWriter::new(filename, header)?;
        for record in records.iter() {
            writer.write_record(record)?;
        }
    }

    let build_tbi = true;
    vcf_utils::build_bcf_index(filename, shared_settings.thread_count, build_tbi)?;
    Ok(())
}
