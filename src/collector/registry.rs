use super::pipeline::{HashDigests, SamplePipeline};
use super::spec::ContentSpec;
use crate::filesystem::ntfs::{AttributeType, StandardInfoAttr};
use crate::finder::{MatchingName, Term, VolumeInfo};
use std::collections::BTreeMap;
use std::rc::Rc;
use uuid::Uuid;

/// Identity of a collected sample: one attribute instance of one file record
/// on one volume. Two matches agreeing on this key are the same sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct SampleKey {
    pub(crate) volume_serial: u64,
    pub(crate) frn: u64,
    pub(crate) instance_id: u32,
}

/// The match-level metadata shared by every sample carved from the same
/// match (one per matching attribute)
#[derive(Debug)]
pub(crate) struct MatchInfo {
    pub(crate) term: Term,
    pub(crate) volume: VolumeInfo,
    pub(crate) frn: u64,
    pub(crate) standard_info: StandardInfoAttr,
    pub(crate) names: Vec<MatchingName>,
}

/// A registered sample. Owns its pipeline; digests are filled in once the
/// pipeline has been drained
pub(crate) struct SampleRef {
    pub(crate) key: SampleKey,
    pub(crate) info: Rc<MatchInfo>,
    pub(crate) snapshot_id: Option<Uuid>,
    pub(crate) content: ContentSpec,
    pub(crate) collection_date: u64,
    pub(crate) sample_name: String,
    pub(crate) off_limits: bool,
    pub(crate) sample_size: u64,
    pub(crate) attr_type: AttributeType,
    pub(crate) attr_name: String,
    pub(crate) yara_rules: Option<Vec<String>>,
    pub(crate) pipeline: Option<SamplePipeline>,
    pub(crate) digests: HashDigests,
}

impl SampleRef {
    /// Whether the payload may be written to the sink
    pub(crate) fn payload_eligible(&self) -> bool {
        !self.off_limits && self.pipeline.is_some()
    }

    /// Off-limits for reporting purposes. A sample whose pipeline could not
    /// be configured is reported but never written
    pub(crate) fn reported_off_limits(&self) -> bool {
        self.off_limits || self.pipeline.is_none()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum InsertStatus {
    Inserted,
    Duplicate,
}

/// Deduplicating set of samples keyed on `SampleKey`. Iteration order is
/// deterministic for identical input
pub(crate) struct SampleRegistry {
    samples: BTreeMap<SampleKey, SampleRef>,
}

impl SampleRegistry {
    pub(crate) fn new() -> SampleRegistry {
        SampleRegistry {
            samples: BTreeMap::new(),
        }
    }

    pub(crate) fn contains(&self, key: &SampleKey) -> bool {
        self.samples.contains_key(key)
    }

    /// Insert a sample unless its key is already present. The duplicate
    /// candidate is discarded without disturbing the existing entry
    pub(crate) fn find_or_insert(&mut self, sample: SampleRef) -> InsertStatus {
        if self.samples.contains_key(&sample.key) {
            return InsertStatus::Duplicate;
        }
        self.samples.insert(sample.key, sample);
        InsertStatus::Inserted
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &SampleRef> {
        self.samples.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut SampleRef> {
        self.samples.values_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    /// Run teardown: release any still-open pipelines and their sources
    pub(crate) fn close_all(&mut self) {
        for sample in self.samples.values_mut() {
            sample.pipeline = None;
        }
    }
}
