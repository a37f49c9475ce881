use regex::Regex;

use crate::breakpoint::{BreakpointRecord, SvType};
use crate::cli;
use crate::errors::PipelineError;
use crate::genome_segment::GenomeSegment;
use crate::record_source::RecordSource;

/// Selection of the records passed on to clustering
///
pub struct ClusterInputFilter {
    svtypes: Vec<SvType>,

    /// Both breakpoint chromosomes must match
    chrom_regex: Regex,
}

impl ClusterInputFilter {
    pub fn new(svtypes: Vec<SvType>, chrom_regex: Regex) -> Self {
        Self {
            svtypes,
            chrom_regex,
        }
    }

    pub fn from_settings(settings: &cli::ClusterVcfSettings) -> Result<Self, PipelineError> {
        let svtypes = cli::parse_svtypes(&settings.svtypes)
            .map_err(|e| PipelineError::Input(e.to_string()))?;
        let chrom_regex = Regex::new(&settings.chrom_regex)
            .map_err(|e| PipelineError::Input(e.to_string()))?;
        Ok(Self::new(svtypes, chrom_regex))
    }

    pub fn is_included(&self, record: &BreakpointRecord) -> bool {
        self.svtypes.contains(&record.sv_type)
            && !record.is_secondary()
            && self.chrom_regex.is_match(&record.chrom_a)
            && self.chrom_regex.is_match(&record.chrom_b)
    }
}

/// Record source which removes records rejected by a [ClusterInputFilter]
///
pub struct FilteredRecordSource<'a> {
    source: Box<dyn RecordSource + 'a>,
    filter: &'a ClusterInputFilter,
    filtered_record_count: usize,
}

impl<'a> FilteredRecordSource<'a> {
    pub fn new(source: Box<dyn RecordSource + 'a>, filter: &'a ClusterInputFilter) -> Self {
        Self {
            source,
            filter,
            filtered_record_count: 0,
        }
    }

    pub fn filtered_record_count(&self) -> usize {
        self.filtered_record_count
    }
}

impl RecordSource for FilteredRecordSource<'_> {
    fn next_record(&mut self) -> Option<Result<BreakpointRecord, PipelineError>> {
        loop {
            match self.source.next_record()? {
                Ok(record) => {
                    if self.filter.is_included(&record) {
                        return Some(Ok(record));
                    }
                    self.filtered_record_count += 1;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }

    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError> {
        self.source.fetch(region)
    }
}
