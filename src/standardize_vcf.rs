//! Standardize command: convert the SV calls of one caller into the canonical schema
//!

use std::collections::HashSet;
use std::io::BufRead;

use camino::Utf8Path;
use log::{info, warn};
use thousands::Separable;

use crate::bcf_utils::{ContigInfo, VcfRawReader};
use crate::breakpoint::{BreakpointRecord, Genotype, SvType, compare_breakpoint_records};
use crate::cli;
use crate::errors::PipelineError;
use crate::globals::PROGRAM_NAME;
use crate::large_variant_output::{
    get_output_contigs, get_sv_vcf_header, write_indexed_sv_vcf_file,
};
use crate::record_source::RawRecordReader;
use crate::run_stats::{StandardizeRunStats, StandardizeStats, write_run_stats};
use crate::standardize::{Standardizer, StandardizerRegistry, standardize_with};

pub const STANDARDIZED_VCF_FILENAME: &str = "standardized.vcf.gz";

/// Caller tag written to the header by this program, read back with the canonical standardizer
const CANONICAL_CALLER_TAG: &str = "canonical";

/// Select the caller tag from the command-line, falling back to the input header '##source' value
///
fn get_caller_tag(
    caller: Option<&str>,
    header_source: Option<&str>,
) -> Result<String, PipelineError> {
    let caller = match (caller, header_source) {
        (Some(x), _) => x,
        (None, Some(x)) => x,
        (None, None) => {
            return Err(PipelineError::Input(
                "No caller specified and the input header has no '##source' line".to_string(),
            ));
        }
    };
    let caller = caller.to_lowercase();
    if caller == PROGRAM_NAME {
        Ok(CANONICAL_CALLER_TAG.to_string())
    } else {
        Ok(caller)
    }
}

/// Parse contig names and lengths from a fasta index
///
fn parse_contig_index<R: BufRead>(reader: R) -> Result<Vec<ContigInfo>, PipelineError> {
    let mut contigs = Vec::new();
    for (line_index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mut words = line.split('\t');
        let name = words.next().unwrap_or_default();
        let length = words.next().and_then(|x| x.parse::<u64>().ok());
        if name.is_empty() || length.is_none() {
            return Err(PipelineError::Input(format!(
                "Unexpected format on line {} of contig index: '{line}'",
                line_index + 1
            )));
        }
        contigs.push(ContigInfo {
            name: name.to_string(),
            length,
        });
    }
    Ok(contigs)
}

fn read_contig_index(filename: &str) -> Result<Vec<ContigInfo>, PipelineError> {
    let f = std::fs::File::open(filename)?;
    parse_contig_index(std::io::BufReader::new(f))
}

/// Record filters applied after standardization
///
struct RecordFilter<'a> {
    caller_tag: &'a str,
    settings: &'a cli::StandardizeSettings,

    /// If defined, records with either breakpoint on another contig are removed
    included_contigs: Option<HashSet<String>>,
}

impl RecordFilter<'_> {
    fn is_below_min_size(&self, record: &BreakpointRecord) -> bool {
        match record.sv_type {
            SvType::Deletion | SvType::Duplication | SvType::Inversion => {
                match record.sv_len.or_else(|| record.length()) {
                    Some(x) => x.abs() < self.settings.min_size,
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn is_excluded_contig(&self, record: &BreakpointRecord) -> bool {
        match &self.included_contigs {
            Some(x) => !(x.contains(&record.chrom_a) && x.contains(&record.chrom_b)),
            None => false,
        }
    }

    /// Replace each fully missing genotype with a variant call of the same ploidy
    fn call_null_sites(&self, record: &mut BreakpointRecord) {
        for sample in record.samples.values_mut() {
            if sample.genotype.is_missing() {
                sample.genotype = Genotype::null_site_call(sample.genotype.alleles.len());
                sample.called_by.insert(self.caller_tag.to_string());
            }
        }
    }

    /// Apply all filters to one record, updating `stats` for each record removed
    ///
    /// Returns None if the record is filtered out.
    ///
    fn apply(
        &self,
        mut record: BreakpointRecord,
        stats: &mut StandardizeStats,
    ) -> Option<BreakpointRecord> {
        if self.is_excluded_contig(&record) {
            stats.excluded_contig_record_count += 1;
            return None;
        }
        if self.is_below_min_size(&record) {
            stats.below_min_size_record_count += 1;
            return None;
        }
        if self.settings.call_null_sites {
            self.call_null_sites(&mut record);
        }
        if !(self.settings.include_reference_sites || record.has_called_sample()) {
            stats.reference_site_record_count += 1;
            return None;
        }
        Some(record)
    }
}

/// Read, standardize and filter all records from `reader`
///
/// Returned records are sorted in canonical record order, with IDs rewritten if a prefix is set.
///
fn standardize_raw_records(
    reader: &mut dyn RawRecordReader,
    standardizer: &dyn Standardizer,
    filter: &RecordFilter,
    stats: &mut StandardizeStats,
) -> Result<Vec<BreakpointRecord>, PipelineError> {
    let mut records = Vec::new();
    while let Some(raw) = reader.next_raw_record() {
        let raw = raw?;
        stats.input_record_count += 1;

        if standardizer.is_secondary_record(&raw) {
            stats.secondary_record_count += 1;
            continue;
        }

        let record = match standardize_with(standardizer, &raw) {
            Ok(x) => x,
            Err(e) => {
                if filter.settings.skip_invalid {
                    warn!("Skipping record at {}:{}: {e}", raw.chrom, raw.pos);
                    stats.invalid_record_count += 1;
                    continue;
                } else {
                    return Err(e.into());
                }
            }
        };

        if let Some(record) = filter.apply(record, stats) {
            records.push(record);
        }
    }

    records.sort_by(compare_breakpoint_records);

    if let Some(prefix) = &filter.settings.prefix {
        for (index, record) in records.iter_mut().enumerate() {
            record.ids = vec![format!("{prefix}_{}_{}", filter.caller_tag, index + 1)];
        }
    }

    stats.output_record_count = records.len();
    Ok(records)
}

pub fn run_standardize(
    shared_settings: &cli::SharedSettings,
    settings: &cli::StandardizeSettings,
) -> Result<(), PipelineError> {
    cli::write_standardize_settings(&settings.output_dir, settings);

    let vcf_filename = Utf8Path::new(&settings.vcf_filename);
    info!("Reading SV calls from file: '{vcf_filename}'");
    let mut reader = VcfRawReader::from_path(vcf_filename, false)?;

    let caller_tag = get_caller_tag(settings.caller.as_deref(), reader.source())?;
    let registry = StandardizerRegistry::default();
    let standardizer = registry.get(&caller_tag)?;
    info!("Standardizing SV calls from caller: '{caller_tag}'");

    let index_contigs = match &settings.contigs_filename {
        Some(x) => Some(read_contig_index(x)?),
        None => None,
    };

    let filter = RecordFilter {
        caller_tag: &caller_tag,
        settings,
        included_contigs: index_contigs
            .as_ref()
            .map(|x| x.iter().map(|c| c.name.clone()).collect()),
    };

    let mut stats = StandardizeStats::default();
    let records = standardize_raw_records(&mut reader, standardizer, &filter, &mut stats)?;

    info!(
        "Standardized {} of {} input records",
        stats.output_record_count.separate_with_commas(),
        stats.input_record_count.separate_with_commas()
    );

    let source_tags = vec![standardizer.caller_tag().to_string()];
    let raw_records = records
        .iter()
        .map(|x| x.to_raw_record(&source_tags))
        .collect::<Vec<_>>();

    let contigs = match index_contigs {
        Some(x) => x,
        None => get_output_contigs(reader.contigs(), &raw_records),
    };
    let header = get_sv_vcf_header(&contigs, reader.sample_names(), &source_tags);

    let output_filename = settings.output_dir.join(STANDARDIZED_VCF_FILENAME);
    write_indexed_sv_vcf_file(shared_settings, &output_filename, &header, &raw_records)?;

    let run_stats = StandardizeRunStats {
        caller: caller_tag,
        standardize_stats: stats,
    };
    write_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::GT_FORMAT_KEY;
    use crate::genome_segment::GenomeSegment;
    use crate::raw_record::{FieldValue, RawRecord};

    struct VecRawRecordReader {
        records: std::vec::IntoIter<RawRecord>,
    }

    impl VecRawRecordReader {
        fn new(records: Vec<RawRecord>) -> Self {
            Self {
                records: records.into_iter(),
            }
        }
    }

    impl RawRecordReader for VecRawRecordReader {
        fn next_raw_record(&mut self) -> Option<Result<RawRecord, PipelineError>> {
            self.records.next().map(Ok)
        }

        fn fetch(&mut self, _region: &GenomeSegment) -> Result<(), PipelineError> {
            Ok(())
        }
    }

    fn get_lumpy_deletion(id: &str, pos: i64, end: i64, gt: &str) -> RawRecord {
        RawRecord::new("chr1", pos, id, "N", "<DEL>")
            .with_info("SVTYPE", FieldValue::from_str_value("DEL"))
            .with_info("END", FieldValue::Integer(vec![end as i32]))
            .with_info("STRANDS", FieldValue::from_str_value("+-:4"))
            .with_sample("s1", &[(GT_FORMAT_KEY, FieldValue::from_str_value(gt))])
    }

    fn run_test_records(
        records: Vec<RawRecord>,
        settings: &cli::StandardizeSettings,
        included_contigs: Option<HashSet<String>>,
    ) -> (Vec<BreakpointRecord>, StandardizeStats) {
        let registry = StandardizerRegistry::default();
        let standardizer = registry.get("lumpy").unwrap();
        let filter = RecordFilter {
            caller_tag: "lumpy",
            settings,
            included_contigs,
        };
        let mut reader = VecRawRecordReader::new(records);
        let mut stats = StandardizeStats::default();
        let records =
            standardize_raw_records(&mut reader, standardizer, &filter, &mut stats).unwrap();
        (records, stats)
    }

    fn get_test_settings() -> cli::StandardizeSettings {
        cli::StandardizeSettings {
            min_size: 50,
            ..Default::default()
        }
    }

    #[test]
    fn test_get_caller_tag() {
        assert_eq!(get_caller_tag(Some("Delly"), Some("lumpy")).unwrap(), "delly");
        assert_eq!(get_caller_tag(None, Some("LUMPY")).unwrap(), "lumpy");
        assert_eq!(get_caller_tag(None, Some(PROGRAM_NAME)).unwrap(), "canonical");
        assert!(get_caller_tag(None, None).is_err());
    }

    #[test]
    fn test_parse_contig_index() {
        let fai = "chr1\t248956422\t112\t70\t71\nchr2\t242193529\t252513167\t70\t71\n";
        let contigs = parse_contig_index(fai.as_bytes()).unwrap();
        assert_eq!(contigs.len(), 2);
        assert_eq!(contigs[1].name, "chr2");
        assert_eq!(contigs[1].length, Some(242193529));

        assert!(parse_contig_index("chr1\tabc\n".as_bytes()).is_err());
    }

    #[test]
    fn test_record_filters() {
        let settings = get_test_settings();
        let (records, stats) = run_test_records(
            vec![
                get_lumpy_deletion("a", 3000, 4000, "0/1"),
                get_lumpy_deletion("b", 1000, 1020, "0/1"),
                get_lumpy_deletion("c", 2000, 3000, "0/0"),
                get_lumpy_deletion("d", 1500, 2500, "1/1"),
            ],
            &settings,
            None,
        );
        let ids = records.iter().map(|x| x.label()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["d", "a"]);
        assert_eq!(stats.input_record_count, 4);
        assert_eq!(stats.below_min_size_record_count, 1);
        assert_eq!(stats.reference_site_record_count, 1);
        assert_eq!(stats.output_record_count, 2);
    }

    #[test]
    fn test_null_site_calls() {
        let mut settings = get_test_settings();
        settings.call_null_sites = true;
        let (records, stats) = run_test_records(
            vec![
                get_lumpy_deletion("a", 1000, 2000, "./."),
                get_lumpy_deletion("b", 3000, 4000, "."),
            ],
            &settings,
            None,
        );
        assert_eq!(stats.reference_site_record_count, 0);
        assert_eq!(records[0].samples["s1"].genotype.to_string(), "0/1");
        assert_eq!(records[1].samples["s1"].genotype.to_string(), "1");
        assert!(records[0].samples["s1"].called_by.contains("lumpy"));
    }

    #[test]
    fn test_excluded_contigs() {
        let settings = get_test_settings();
        let included_contigs = Some(["chr2".to_string()].into_iter().collect());
        let (records, stats) = run_test_records(
            vec![get_lumpy_deletion("a", 1000, 2000, "0/1")],
            &settings,
            included_contigs,
        );
        assert!(records.is_empty());
        assert_eq!(stats.excluded_contig_record_count, 1);
    }

    #[test]
    fn test_prefix_ids() {
        let mut settings = get_test_settings();
        settings.prefix = Some("sample1".to_string());
        let (records, _) = run_test_records(
            vec![
                get_lumpy_deletion("x", 3000, 4000, "0/1"),
                get_lumpy_deletion("y", 1000, 2000, "0/1"),
            ],
            &settings,
            None,
        );
        assert_eq!(records[0].label(), "sample1_lumpy_1");
        assert_eq!(records[1].label(), "sample1_lumpy_2");
    }

    #[test]
    fn test_invalid_record_policy() {
        let invalid = RawRecord::new("chr1", 100, "bad", "N", "N.")
            .with_info("SVTYPE", FieldValue::from_str_value("BND"))
            .with_sample("s1", &[(GT_FORMAT_KEY, FieldValue::from_str_value("0/1"))]);

        let registry = StandardizerRegistry::default();
        let standardizer = registry.get("lumpy").unwrap();

        let mut settings = get_test_settings();
        let filter = RecordFilter {
            caller_tag: "lumpy",
            settings: &settings,
            included_contigs: None,
        };
        let mut reader = VecRawRecordReader::new(vec![invalid.clone()]);
        let mut stats = StandardizeStats::default();
        assert!(standardize_raw_records(&mut reader, standardizer, &filter, &mut stats).is_err());

        settings.skip_invalid = true;
        let filter = RecordFilter {
            caller_tag: "lumpy",
            settings: &settings,
            included_contigs: None,
        };
        let mut reader = VecRawRecordReader::new(vec![invalid]);
        let mut stats = StandardizeStats::default();
        let records =
            standardize_raw_records(&mut reader, standardizer, &filter, &mut stats).unwrap();
        assert!(records.is_empty());
        assert_eq!(stats.invalid_record_count, 1);
    }
}
