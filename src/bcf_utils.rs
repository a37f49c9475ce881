//! Reading VCF/BCF records into the raw record shape used by the standardizers
//!

use std::collections::BTreeMap;

use camino::Utf8Path;
use rust_htslib::bcf::header::{HeaderRecord, HeaderView, TagType};
use rust_htslib::bcf::{self, Read};

use crate::breakpoint::GT_FORMAT_KEY;
use crate::errors::PipelineError;
use crate::genome_segment::GenomeSegment;
use crate::raw_record::{FieldValue, RawRecord, RawSample};
use crate::record_source::RawRecordReader;
use crate::vcf_utils::is_missing_integer;

/// Contig name and optional length, as declared in a variant file header
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ContigInfo {
    pub name: String,
    pub length: Option<u64>,
}

/// Get contig records from the bcf header in header order
///
pub fn get_contig_info(header: &HeaderView) -> Vec<ContigInfo> {
    let mut contigs = Vec::new();
    for header_record in header.header_records() {
        if let HeaderRecord::Contig { values, .. } = header_record {
            if let Some(name) = values.get("ID") {
                let length = values.get("length").and_then(|x| x.parse::<u64>().ok());
                contigs.push(ContigInfo {
                    name: name.clone(),
                    length,
                });
            }
        }
    }
    contigs
}

/// Convert the value of a header '##source' line into a caller tag
///
/// Only the first word is used, so values like `"LUMPY Express"` or `DELLY v1.1` give the caller
/// name alone.
///
pub fn parse_header_source(value: &str) -> Option<String> {
    value
        .trim_matches('"')
        .split_whitespace()
        .next()
        .map(|x| x.to_string())
}

fn get_header_source(header: &HeaderView) -> Option<String> {
    header
        .header_records()
        .into_iter()
        .find_map(|header_record| match header_record {
            HeaderRecord::Generic { key, value } if key == "source" => parse_header_source(&value),
            _ => None,
        })
}

/// Get all INFO or FORMAT tags declared in the header, with their types
///
fn get_typed_header_keys(header: &HeaderView, is_info: bool) -> Vec<(String, TagType)> {
    let mut keys = Vec::new();
    for header_record in header.header_records() {
        let values = match (header_record, is_info) {
            (HeaderRecord::Info { values, .. }, true) => values,
            (HeaderRecord::Format { values, .. }, false) => values,
            _ => continue,
        };
        let id = match values.get("ID") {
            Some(x) => x.clone(),
            None => continue,
        };
        let tag_type = if is_info {
            header.info_type(id.as_bytes())
        } else {
            header.format_type(id.as_bytes())
        };
        if let Ok((tag_type, _)) = tag_type {
            keys.push((id, tag_type));
        }
    }
    keys
}

fn bytes_to_string(x: &[u8]) -> String {
    String::from_utf8_lossy(x).to_string()
}

fn is_empty_value(value: &FieldValue) -> bool {
    match value {
        FieldValue::Flag => false,
        FieldValue::Integer(x) => x.is_empty(),
        FieldValue::Float(x) => x.is_empty(),
        FieldValue::String(x) => x.is_empty(),
    }
}

fn get_integer_values(x: &[i32]) -> Vec<i32> {
    x.iter().copied().filter(|&v| !is_missing_integer(v)).collect()
}

/// Float missing and vector end values are both NaN patterns
fn get_float_values(x: &[f32]) -> Vec<f32> {
    x.iter().copied().filter(|v| !v.is_nan()).collect()
}

fn get_string_values<S: AsRef<[u8]>>(x: &[S]) -> Vec<String> {
    x.iter()
        .map(|s| bytes_to_string(s.as_ref()))
        .filter(|s| !s.is_empty() && s != ".")
        .collect()
}

/// Get one INFO value from a record, or None if the value is absent or entirely missing
///
fn get_info_value(
    rec: &bcf::Record,
    key: &str,
    tag_type: &TagType,
) -> Result<Option<FieldValue>, PipelineError> {
    let tag = key.as_bytes();
    let value = match tag_type {
        TagType::Flag => rec.info(tag).flag()?.then_some(FieldValue::Flag),
        TagType::Integer => rec
            .info(tag)
            .integer()?
            .map(|x| FieldValue::Integer(get_integer_values(&x))),
        TagType::Float => rec
            .info(tag)
            .float()?
            .map(|x| FieldValue::Float(get_float_values(&x))),
        TagType::String => rec
            .info(tag)
            .string()?
            .map(|x| FieldValue::String(get_string_values(x.as_slice()))),
    };
    Ok(value.filter(|x| !is_empty_value(x)))
}

enum VcfReader {
    Sequential(bcf::Reader),
    Indexed(bcf::IndexedReader),
}

impl VcfReader {
    fn header(&self) -> &HeaderView {
        match self {
            VcfReader::Sequential(x) => x.header(),
            VcfReader::Indexed(x) => x.header(),
        }
    }

    fn empty_record(&self) -> bcf::Record {
        match self {
            VcfReader::Sequential(x) => x.empty_record(),
            VcfReader::Indexed(x) => x.empty_record(),
        }
    }

    fn read(&mut self, rec: &mut bcf::Record) -> Option<rust_htslib::errors::Result<()>> {
        match self {
            VcfReader::Sequential(x) => x.read(rec),
            VcfReader::Indexed(x) => x.read(rec),
        }
    }
}

/// Reads raw records from a VCF or BCF file
///
/// All INFO and FORMAT fields declared in the header are converted according to their declared
/// type. The genotype is stored as text.
///
pub struct VcfRawReader {
    filename: String,
    reader: VcfReader,
    record: bcf::Record,
    info_keys: Vec<(String, TagType)>,
    format_keys: Vec<(String, TagType)>,
    sample_names: Vec<String>,
    contigs: Vec<ContigInfo>,
    source: Option<String>,

    /// Set when the last fetched region has no records in this file
    is_region_empty: bool,
}

impl VcfRawReader {
    /// Open a variant file
    ///
    /// # Arguments
    /// * `indexed` - Open the file with its index, which is required for [RawRecordReader::fetch]
    ///
    pub fn from_path(filename: &Utf8Path, indexed: bool) -> Result<Self, PipelineError> {
        let reader = if indexed {
            VcfReader::Indexed(bcf::IndexedReader::from_path(filename)?)
        } else {
            VcfReader::Sequential(bcf::Reader::from_path(filename)?)
        };
        let header = reader.header();

        let sample_names = header
            .samples()
            .into_iter()
            .map(bytes_to_string)
            .collect::<Vec<_>>();

        let info_keys = get_typed_header_keys(header, true);
        let format_keys = get_typed_header_keys(header, false);
        let contigs = get_contig_info(header);
        let source = get_header_source(header);
        let record = reader.empty_record();

        Ok(Self {
            filename: filename.to_string(),
            reader,
            record,
            info_keys,
            format_keys,
            sample_names,
            contigs,
            source,
            is_region_empty: false,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    pub fn contigs(&self) -> &[ContigInfo] {
        &self.contigs
    }

    /// Caller tag from the header '##source' line
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn format_keys(&self) -> impl Iterator<Item = &str> {
        self.format_keys.iter().map(|(x, _)| x.as_str())
    }

    fn get_samples(&self) -> Result<Vec<RawSample>, PipelineError> {
        let rec = &self.record;
        let mut samples = self
            .sample_names
            .iter()
            .map(|x| RawSample::new(x))
            .collect::<Vec<_>>();
        if samples.is_empty() {
            return Ok(samples);
        }

        // The genotype call fails if the record has no GT field
        if let Ok(genotypes) = rec.genotypes() {
            for (sample_index, sample) in samples.iter_mut().enumerate() {
                let gt = genotypes.get(sample_index).to_string();
                sample
                    .fields
                    .insert(GT_FORMAT_KEY.to_string(), FieldValue::from_str_value(&gt));
            }
        }

        for (key, tag_type) in self.format_keys.iter() {
            if key == GT_FORMAT_KEY {
                continue;
            }
            let tag = key.as_bytes();
            let values = match tag_type {
                TagType::Integer => match rec.format(tag).integer() {
                    Ok(x) => x
                        .iter()
                        .map(|v| FieldValue::Integer(get_integer_values(v)))
                        .collect::<Vec<_>>(),
                    Err(_) => continue,
                },
                TagType::Float => match rec.format(tag).float() {
                    Ok(x) => x
                        .iter()
                        .map(|v| FieldValue::Float(get_float_values(v)))
                        .collect::<Vec<_>>(),
                    Err(_) => continue,
                },
                TagType::String => match rec.format(tag).string() {
                    Ok(x) => x
                        .iter()
                        .map(|v| FieldValue::String(get_string_values(&[v])))
                        .collect::<Vec<_>>(),
                    Err(_) => continue,
                },
                TagType::Flag => continue,
            };
            for (sample, value) in samples.iter_mut().zip(values) {
                if !is_empty_value(&value) {
                    sample.fields.insert(key.clone(), value);
                }
            }
        }
        Ok(samples)
    }

    fn convert_record(&self) -> Result<RawRecord, PipelineError> {
        let rec = &self.record;
        let rid = rec.rid().ok_or_else(|| {
            PipelineError::Input(format!(
                "Variant record without a chromosome in file '{}'",
                self.filename
            ))
        })?;
        // htslib adds undeclared VCF contigs to the shared header as they are read
        let chrom = bytes_to_string(rec.header().rid2name(rid)?);

        let alleles = rec
            .alleles()
            .into_iter()
            .map(bytes_to_string)
            .collect::<Vec<_>>();
        let (ref_allele, alts) = match alleles.split_first() {
            Some((ref_allele, alts)) => (ref_allele.clone(), alts.to_vec()),
            None => ("N".to_string(), Vec::new()),
        };

        let mut info = BTreeMap::new();
        for (key, tag_type) in self.info_keys.iter() {
            if let Some(value) = get_info_value(rec, key, tag_type)? {
                info.insert(key.clone(), value);
            }
        }

        Ok(RawRecord {
            chrom,
            pos: rec.pos() + 1,
            id: bytes_to_string(&rec.id()),
            ref_allele,
            alts,
            info,
            samples: self.get_samples()?,
            source: self.source.clone(),
        })
    }
}

impl RawRecordReader for VcfRawReader {
    fn next_raw_record(&mut self) -> Option<Result<RawRecord, PipelineError>> {
        if self.is_region_empty {
            return None;
        }
        match self.reader.read(&mut self.record)? {
            Ok(()) => Some(self.convert_record()),
            Err(e) => Some(Err(e.into())),
        }
    }

    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError> {
        let reader = match &mut self.reader {
            VcfReader::Indexed(x) => x,
            VcfReader::Sequential(_) => {
                return Err(PipelineError::Input(format!(
                    "Region '{}' requested from variant file '{}', which was not opened with an index",
                    region.to_region_str(),
                    self.filename
                )));
            }
        };

        // A chromosome missing from this file's header simply has no records
        let rid = match reader.header().name2rid(region.chrom.as_bytes()) {
            Ok(x) => x,
            Err(_) => {
                self.is_region_empty = true;
                return Ok(());
            }
        };
        let (start, end) = match &region.range {
            Some(range) => (range.start as u64, Some((range.end - 1) as u64)),
            None => (0, None),
        };
        reader.fetch(rid, start, end)?;
        self.is_region_empty = false;
        Ok(())
    }
}
