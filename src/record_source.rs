//! Sequential and region-restricted delivery of breakpoint records
//!

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::breakpoint::{BreakpointRecord, compare_breakpoint_records};
use crate::errors::PipelineError;
use crate::genome_segment::GenomeSegment;
use crate::raw_record::RawRecord;
use crate::standardize::Standardizer;

/// Cursor over breakpoint records
///
/// Records are expected in non-decreasing (chromosome A, position A) order. Sources do not enforce
/// this themselves, the clustering engine checks it as records arrive.
///
pub trait RecordSource {
    /// Next record, or None at the end of the stream
    fn next_record(&mut self) -> Option<Result<BreakpointRecord, PipelineError>>;

    /// Restrict further iteration to records with breakpoint A in `region`
    ///
    /// Iteration restarts from the beginning of the region.
    ///
    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError>;
}

/// Cursor over raw variant file records
///
pub trait RawRecordReader {
    fn next_raw_record(&mut self) -> Option<Result<RawRecord, PipelineError>>;

    /// Restrict further iteration to records overlapping `region`, which requires an index
    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError>;
}

/// In-memory record source
///
pub struct VecRecordSource {
    records: Vec<BreakpointRecord>,
    region: Option<GenomeSegment>,
    index: usize,
}

impl VecRecordSource {
    pub fn new(records: Vec<BreakpointRecord>) -> Self {
        Self {
            records,
            region: None,
            index: 0,
        }
    }
}

impl RecordSource for VecRecordSource {
    fn next_record(&mut self) -> Option<Result<BreakpointRecord, PipelineError>> {
        while self.index < self.records.len() {
            let record = &self.records[self.index];
            self.index += 1;
            let in_region = match &self.region {
                Some(region) => region.contains_pos(&record.chrom_a, record.pos_a),
                None => true,
            };
            if in_region {
                return Some(Ok(record.clone()));
            }
        }
        None
    }

    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError> {
        self.region = Some(region.clone());
        self.index = 0;
        Ok(())
    }
}

/// Record source which reads raw records and converts them with one standardizer
///
/// The cluster pipeline uses this to read standardized variant files back with the canonical
/// standardizer.
///
pub struct StandardizedRecordSource<'a, R: RawRecordReader> {
    reader: R,
    standardizer: &'a dyn Standardizer,
    region: Option<GenomeSegment>,
}

impl<'a, R: RawRecordReader> StandardizedRecordSource<'a, R> {
    pub fn new(reader: R, standardizer: &'a dyn Standardizer) -> Self {
        Self {
            reader,
            standardizer,
            region: None,
        }
    }
}

impl<R: RawRecordReader> RecordSource for StandardizedRecordSource<'_, R> {
    fn next_record(&mut self) -> Option<Result<BreakpointRecord, PipelineError>> {
        loop {
            let raw = match self.reader.next_raw_record()? {
                Ok(x) => x,
                Err(e) => return Some(Err(e)),
            };

            // Indexed fetch returns any record overlapping the region, so records starting
            // before the region are filtered here
            if let Some(region) = &self.region {
                if !region.contains_pos(&raw.chrom, raw.pos) {
                    continue;
                }
            }

            let record = crate::standardize::standardize_with(self.standardizer, &raw)
                .map_err(PipelineError::from);
            return Some(record);
        }
    }

    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError> {
        self.reader.fetch(region)?;
        self.region = Some(region.clone());
        Ok(())
    }
}

struct MergeHeapItem {
    record: BreakpointRecord,
    source_index: usize,
}

impl PartialEq for MergeHeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeHeapItem {}

impl PartialOrd for MergeHeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeHeapItem {
    /// Reversed so that the max-heap yields the smallest record first
    fn cmp(&self, other: &Self) -> Ordering {
        compare_breakpoint_records(&other.record, &self.record)
            .then(other.source_index.cmp(&self.source_index))
    }
}

/// K-way merge of several sorted record sources into one sorted stream
///
/// Ties between sources are broken by source order, so the merged order is deterministic.
///
pub struct MergedRecordSource<'a> {
    sources: Vec<Box<dyn RecordSource + 'a>>,
    heap: BinaryHeap<MergeHeapItem>,
    primed: bool,
}

impl<'a> MergedRecordSource<'a> {
    pub fn new(sources: Vec<Box<dyn RecordSource + 'a>>) -> Self {
        Self {
            sources,
            heap: BinaryHeap::new(),
            primed: false,
        }
    }

    fn push_next(&mut self, source_index: usize) -> Result<(), PipelineError> {
        if let Some(record) = self.sources[source_index].next_record() {
            self.heap.push(MergeHeapItem {
                record: record?,
                source_index,
            });
        }
        Ok(())
    }

    fn prime(&mut self) -> Result<(), PipelineError> {
        self.heap.clear();
        for source_index in 0..self.sources.len() {
            self.push_next(source_index)?;
        }
        self.primed = true;
        Ok(())
    }
}

impl RecordSource for MergedRecordSource<'_> {
    fn next_record(&mut self) -> Option<Result<BreakpointRecord, PipelineError>> {
        if !self.primed {
            if let Err(e) = self.prime() {
                return Some(Err(e));
            }
        }
        let item = self.heap.pop()?;
        if let Err(e) = self.push_next(item.source_index) {
            return Some(Err(e));
        }
        Some(Ok(item.record))
    }

    fn fetch(&mut self, region: &GenomeSegment) -> Result<(), PipelineError> {
        for source in self.sources.iter_mut() {
            source.fetch(region)?;
        }
        self.primed = false;
        self.heap.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::SvType;
    use crate::breakpoint::test_utils::get_test_record;

    fn drain(source: &mut dyn RecordSource) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(record) = source.next_record() {
            ids.push(record.unwrap().label());
        }
        ids
    }

    #[test]
    fn test_merged_record_source() {
        let s1 = VecRecordSource::new(vec![
            get_test_record("a", SvType::Deletion, "chr1", 100, "chr1", 500),
            get_test_record("c", SvType::Deletion, "chr2", 100, "chr2", 500),
        ]);
        let s2 = VecRecordSource::new(vec![
            get_test_record("b", SvType::Deletion, "chr1", 300, "chr1", 500),
            get_test_record("d", SvType::Deletion, "chr10", 50, "chr10", 500),
        ]);
        let mut merged = MergedRecordSource::new(vec![Box::new(s1), Box::new(s2)]);
        assert_eq!(drain(&mut merged), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_fetch_region() {
        let mut source = VecRecordSource::new(vec![
            get_test_record("a", SvType::Deletion, "chr1", 100, "chr1", 500),
            get_test_record("b", SvType::Deletion, "chr1", 300, "chr1", 500),
            get_test_record("c", SvType::Deletion, "chr2", 300, "chr2", 500),
        ]);
        assert_eq!(drain(&mut source), vec!["a", "b", "c"]);

        let region = GenomeSegment::from_region_str("chr1:200-400").unwrap();
        source.fetch(&region).unwrap();
        assert_eq!(drain(&mut source), vec!["b"]);

        let region = GenomeSegment::from_region_str("chr2").unwrap();
        let mut merged = MergedRecordSource::new(vec![Box::new(source)]);
        merged.fetch(&region).unwrap();
        assert_eq!(drain(&mut merged), vec!["c"]);
    }
}
