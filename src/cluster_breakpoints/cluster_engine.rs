use std::collections::{BTreeMap, VecDeque};

use log::debug;

use super::union_find::StreamingUnionFind;
use super::{ClusterSettings, is_clusterable};
use crate::breakpoint::BreakpointRecord;
use crate::chrom_order::GenomePosKey;
use crate::errors::{ClusterError, PipelineError};
use crate::log_utils::debug_msg;
use crate::record_source::RecordSource;

/// A finalized set of records linked by the clusterable test
///
#[derive(Debug)]
pub struct Cluster {
    /// Arrival index of the first record in the cluster
    pub id: usize,

    /// Records in arrival order
    pub members: Vec<BreakpointRecord>,
}

/// Streaming single-linkage clustering over records sorted by breakpoint A
///
/// Each new record is compared to the records still inside the window horizon of its breakpoint
/// A. Records which fall out of the window can't be linked to any later record, so a cluster is
/// final once all of its members have left the window.
///
pub struct ClusterEngine {
    settings: ClusterSettings,

    /// Records of all clusters which are not yet final, keyed on arrival index
    pending: BTreeMap<usize, BreakpointRecord>,

    /// Arrival indices of records still inside the window, in arrival order
    window: VecDeque<usize>,

    union_find: StreamingUnionFind,
    next_index: usize,
    last_key: Option<GenomePosKey>,
}

impl ClusterEngine {
    pub fn new(settings: &ClusterSettings) -> Self {
        Self {
            settings: settings.clone(),
            pending: BTreeMap::new(),
            window: VecDeque::new(),
            union_find: StreamingUnionFind::default(),
            next_index: 0,
            last_key: None,
        }
    }

    fn check_order(&mut self, record: &BreakpointRecord) -> Result<(), ClusterError> {
        let key = record.pos_a_key();
        if let Some(last_key) = &self.last_key {
            if key < *last_key {
                return Err(ClusterError::OrderingViolation {
                    previous: last_key.to_string(),
                    current: key.to_string(),
                    current_id: record.label(),
                });
            }
        }
        self.last_key = Some(key);
        Ok(())
    }

    /// Drop records from the front of the window which are out of range of `record`
    fn advance_window(&mut self, record: &BreakpointRecord) {
        let horizon = self.settings.window_horizon();
        while let Some(&index) = self.window.front() {
            let front = &self.pending[&index];
            if front.chrom_a == record.chrom_a && record.pos_a - front.pos_a <= horizon {
                break;
            }
            self.window.pop_front();
        }
    }

    fn take_complete_clusters(&mut self) -> Vec<Cluster> {
        let min_open_index = self.window.front().copied().unwrap_or(self.next_index);
        self.union_find
            .take_complete(min_open_index)
            .into_iter()
            .map(|(id, member_indices)| {
                let members = member_indices
                    .iter()
                    .filter_map(|x| self.pending.remove(x))
                    .collect::<Vec<_>>();
                Cluster { id, members }
            })
            .collect()
    }

    /// Add the next record from the sorted input stream
    ///
    /// Returns all clusters which became final as a result, in order of cluster id.
    ///
    pub fn add_record(&mut self, record: BreakpointRecord) -> Result<Vec<Cluster>, ClusterError> {
        let debug = false;

        self.check_order(&record)?;
        self.advance_window(&record);

        let index = self.next_index;
        self.next_index += 1;
        self.union_find.insert(index);

        for &other_index in self.window.iter() {
            if is_clusterable(&self.pending[&other_index], &record, &self.settings) {
                debug_msg!(debug, "Linking record {other_index} to {index}");
                self.union_find.union(other_index, index);
            }
        }

        self.pending.insert(index, record);
        self.window.push_back(index);

        Ok(self.take_complete_clusters())
    }

    /// Finalize all remaining clusters at the end of the input stream
    pub fn finish(mut self) -> Vec<Cluster> {
        self.window.clear();
        let clusters = self.take_complete_clusters();
        assert!(self.union_find.is_empty());
        clusters
    }
}

/// Cluster every record from `source`, passing each cluster to `process_cluster` as soon as it is
/// final
///
/// Returns the number of records read.
///
pub fn cluster_records(
    source: &mut dyn RecordSource,
    settings: &ClusterSettings,
    mut process_cluster: impl FnMut(Cluster),
) -> Result<usize, PipelineError> {
    let mut engine = ClusterEngine::new(settings);
    let mut record_count = 0;
    while let Some(record) = source.next_record() {
        for cluster in engine.add_record(record?)? {
            process_cluster(cluster);
        }
        record_count += 1;
    }
    for cluster in engine.finish() {
        process_cluster(cluster);
    }
    debug!("Clustered {record_count} records");
    Ok(record_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::SvType;
    use crate::breakpoint::test_utils::get_test_record;
    use crate::record_source::VecRecordSource;

    fn get_cluster_ids(records: Vec<BreakpointRecord>) -> Vec<Vec<String>> {
        let mut source = VecRecordSource::new(records);
        let mut clusters = Vec::new();
        cluster_records(&mut source, &ClusterSettings::default(), |c| {
            clusters.push(c.members.iter().map(|x| x.label()).collect::<Vec<_>>())
        })
        .unwrap();
        clusters
    }

    #[test]
    fn test_single_linkage_chain() {
        // a-b and b-c are within 500, a-c is not
        let clusters = get_cluster_ids(vec![
            get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000),
            get_test_record("b", SvType::Deletion, "chr1", 1400, "chr1", 5400),
            get_test_record("c", SvType::Deletion, "chr1", 1800, "chr1", 5800),
        ]);
        assert_eq!(clusters, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_chain_linked_by_later_record() {
        // a and b are only linked through c, which arrives after both
        let clusters = get_cluster_ids(vec![
            get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000),
            get_test_record("b", SvType::Deletion, "chr1", 1100, "chr1", 6000),
            get_test_record("c", SvType::Deletion, "chr1", 1200, "chr1", 5500),
        ]);
        assert_eq!(clusters, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_separate_clusters() {
        let clusters = get_cluster_ids(vec![
            get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000),
            get_test_record("b", SvType::Duplication, "chr1", 1000, "chr1", 5000),
            get_test_record("c", SvType::Deletion, "chr1", 2000, "chr1", 6000),
            get_test_record("d", SvType::Deletion, "chr2", 1000, "chr2", 5000),
            get_test_record("e", SvType::Deletion, "chr2", 1010, "chr2", 5010),
        ]);
        assert_eq!(
            clusters,
            vec![vec!["a"], vec!["b"], vec!["c"], vec!["d", "e"]]
        );
    }

    #[test]
    fn test_ordering_violation() {
        let mut engine = ClusterEngine::new(&ClusterSettings::default());
        engine
            .add_record(get_test_record(
                "a",
                SvType::Deletion,
                "chr2",
                1000,
                "chr2",
                5000,
            ))
            .unwrap();
        let result = engine.add_record(get_test_record(
            "b",
            SvType::Deletion,
            "chr1",
            2000,
            "chr1",
            5000,
        ));
        assert_eq!(
            result.unwrap_err(),
            ClusterError::OrderingViolation {
                previous: "chr2:1000".to_string(),
                current: "chr1:2000".to_string(),
                current_id: "b".to_string(),
            }
        );
    }

    #[test]
    fn test_clusters_emitted_when_window_passes() {
        let mut engine = ClusterEngine::new(&ClusterSettings::default());
        let record =
            |id, pos| get_test_record(id, SvType::Deletion, "chr1", pos, "chr1", pos + 4000);

        assert!(engine.add_record(record("a", 1000)).unwrap().is_empty());
        assert!(engine.add_record(record("b", 1200)).unwrap().is_empty());

        // The default horizon is 1000 beyond breakpoint A
        let clusters = engine.add_record(record("c", 2201)).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, 0);
        assert_eq!(clusters[0].members.len(), 2);

        let clusters = engine.finish();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].id, 2);
    }
}
