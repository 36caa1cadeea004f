use super::limits::{classify, LimitStatus, Limits};
use super::naming::NameRegistry;
use super::pipeline::{HashDigests, SamplePipeline};
use super::registry::{InsertStatus, MatchInfo, SampleKey, SampleRef, SampleRegistry};
use super::spec::{ContentSpec, FuzzyHashes, Hashes, SampleSpec};
use crate::finder::{attribute_full_name, Match, MatchingAttribute};
use log::{error, info, warn};
use std::rc::Rc;

/// Ingest one finder match: pick the governing spec, classify each matching
/// attribute against the quotas, and register the resulting samples
pub(crate) fn ingest_match(
    m: Match,
    specs: &mut [SampleSpec],
    global_limits: &mut Limits,
    registry: &mut SampleRegistry,
    names: &mut NameRegistry,
    global_content: &ContentSpec,
    hashes: &Hashes,
    fuzzy: &FuzzyHashes,
    collection_date: u64,
) {
    let spec_position = specs
        .iter()
        .position(|spec| spec.terms.iter().any(|term| term.name == m.term.name));
    let Some(spec_position) = spec_position else {
        error!(
            "[ingest] Could not find sample spec for match {}",
            m.term.description
        );
        return;
    };

    if m.attributes.is_empty() {
        let path = m
            .names
            .first()
            .map(|name| name.full_path.clone())
            .unwrap_or_default();
        warn!(
            "[ingest] \"{path}\" matched \"{}\" but no data related attribute was associated",
            m.term.description
        );
        return;
    }

    let Match {
        term,
        volume,
        frn,
        standard_info,
        names: matching_names,
        attributes,
    } = m;
    let info = Rc::new(MatchInfo {
        term,
        volume,
        frn,
        standard_info,
        names: matching_names,
    });

    for attr in attributes {
        let display = match info.names.first() {
            Some(name) => attribute_full_name(name, &attr.name),
            None => attr.name.clone(),
        };

        let data_size = attr.data.size();
        let spec = &mut specs[spec_position];
        let status = classify(global_limits, &spec.limits, data_size);

        let key = SampleKey {
            volume_serial: info.volume.serial,
            frn: info.frn,
            instance_id: attr.instance_id,
        };
        if registry.contains(&key) {
            info!("[ingest] {display} is already collected");
            continue;
        }

        // Every hard link allocates an output name. They all share one
        // payload, the last allocated name is the one the sample keeps
        let mut sample_name = String::new();
        for name in &info.names {
            sample_name = names.reserve(
                &spec.name,
                &name.filename,
                &attr.name,
                spec.content.content_type,
            );
        }

        let MatchingAttribute {
            attr_type,
            name: attr_name,
            instance_id: _,
            data,
            raw,
            yara_rules,
        } = attr;

        let pipeline_result =
            SamplePipeline::build(&spec.content, global_content, data, raw, hashes, fuzzy);
        let pipeline = match pipeline_result {
            Ok(result) => Some(result),
            Err(err) => {
                error!("[ingest] Failed to configure sample streams for {sample_name}: {err:?}");
                None
            }
        };

        // Until the pipeline runs, the best size estimate is the expected
        // post-transform size, falling back to the attribute size
        let sample_size = match pipeline.as_ref() {
            Some(pipeline) => pipeline.size(),
            None => data_size.unwrap_or(0),
        };

        let sample = SampleRef {
            key,
            info: info.clone(),
            snapshot_id: info.volume.snapshot_id,
            content: spec.content,
            collection_date,
            sample_name,
            off_limits: !status.within_limits(),
            sample_size,
            attr_type,
            attr_name,
            yara_rules,
            pipeline,
            digests: HashDigests::default(),
        };

        if registry.find_or_insert(sample) == InsertStatus::Duplicate {
            info!("[ingest] {display} is already collected");
            continue;
        }

        record_status(status, &display, data_size, global_limits, spec);
    }
}

/// Update accumulators for accepted samples and sticky flags for rejected
/// ones. Flags are informational and never gate further classification
fn record_status(
    status: LimitStatus,
    display: &str,
    data_size: Option<u64>,
    global_limits: &mut Limits,
    spec: &mut SampleSpec,
) {
    match status {
        LimitStatus::NoLimits | LimitStatus::SampleWithinLimits => {
            let size = data_size.unwrap_or(0);
            info!("[ingest] {display} matched ({size} bytes)");
            spec.limits.record_sample(size);
            global_limits.record_sample(size);
        }
        LimitStatus::GlobalSampleCountLimitReached => {
            info!(
                "[ingest] {display}: global sample count reached ({})",
                global_limits.max_sample_count
            );
            global_limits.count_reached = true;
        }
        LimitStatus::GlobalMaxBytesPerSample => {
            info!(
                "[ingest] {display}: exceeds global per sample size limit ({})",
                global_limits.max_bytes_per_sample
            );
            global_limits.per_sample_reached = true;
        }
        LimitStatus::GlobalMaxBytesTotal => {
            info!(
                "[ingest] {display}: global total sample size limit reached ({})",
                global_limits.max_bytes_total
            );
            global_limits.total_reached = true;
        }
        LimitStatus::LocalSampleCountLimitReached => {
            info!(
                "[ingest] {display}: sample count reached ({})",
                spec.limits.max_sample_count
            );
            spec.limits.count_reached = true;
        }
        LimitStatus::LocalMaxBytesPerSample => {
            info!(
                "[ingest] {display}: exceeds per sample size limit ({})",
                spec.limits.max_bytes_per_sample
            );
            spec.limits.per_sample_reached = true;
        }
        LimitStatus::LocalMaxBytesTotal => {
            info!(
                "[ingest] {display}: total sample size limit reached ({})",
                spec.limits.max_bytes_total
            );
            spec.limits.total_reached = true;
        }
        LimitStatus::FailedToComputeLimits => {
            warn!("[ingest] {display}: could not determine sample size, not collecting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ingest_match;
    use crate::collector::limits::Limits;
    use crate::collector::naming::NameRegistry;
    use crate::collector::registry::SampleRegistry;
    use crate::collector::spec::{ContentSpec, ContentType, FuzzyHashes, Hashes, SampleSpec};
    use crate::filesystem::ntfs::{
        AttributeType, FileReference, FilenameAttr, StandardInfoAttr,
    };
    use crate::finder::{
        ByteSource, Match, MatchingAttribute, MatchingName, Term, VolumeInfo,
    };

    fn test_spec(term: &str) -> SampleSpec {
        SampleSpec {
            name: String::new(),
            terms: vec![Term::new(term, term)],
            content: ContentSpec::default(),
            limits: Limits::default(),
        }
    }

    fn test_match(term: &str, frn: u64, instance_id: u32, payload: &[u8]) -> Match {
        Match {
            term: Term::new(term, term),
            volume: VolumeInfo {
                serial: 1,
                snapshot_id: None,
            },
            frn,
            standard_info: StandardInfoAttr::default(),
            names: vec![MatchingName {
                full_path: format!("\\files\\file{frn}.bin"),
                filename: FilenameAttr {
                    parent: FileReference {
                        sequence: 1,
                        segment_high: 0,
                        segment_low: 5,
                    },
                    name: format!("file{frn}.bin"),
                    created: 0,
                    modified: 0,
                    accessed: 0,
                    changed: 0,
                },
            }],
            attributes: vec![MatchingAttribute {
                attr_type: AttributeType::Data,
                name: String::new(),
                instance_id,
                data: ByteSource::Memory(payload.to_vec()),
                raw: None,
                yara_rules: None,
            }],
        }
    }

    struct TestState {
        specs: Vec<SampleSpec>,
        global_limits: Limits,
        registry: SampleRegistry,
        names: NameRegistry,
        content: ContentSpec,
    }

    impl TestState {
        fn new(specs: Vec<SampleSpec>) -> TestState {
            TestState {
                specs,
                global_limits: Limits::default(),
                registry: SampleRegistry::new(),
                names: NameRegistry::new(),
                content: ContentSpec {
                    content_type: ContentType::Data,
                    min_chars: 3,
                    max_chars: 1024,
                },
            }
        }

        fn ingest(&mut self, m: Match) {
            ingest_match(
                m,
                &mut self.specs,
                &mut self.global_limits,
                &mut self.registry,
                &mut self.names,
                &self.content,
                &Hashes::default(),
                &FuzzyHashes::default(),
                0,
            );
        }
    }

    #[test]
    fn test_ingest_match() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        state.ingest(test_match("hosts", 42, 0, b"data bytes"));

        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.global_limits.accumulated_count, 1);
        assert_eq!(state.global_limits.accumulated_bytes_total, 10);
        assert_eq!(state.specs[0].limits.accumulated_count, 1);

        let sample = state.registry.iter().next().unwrap();
        assert!(!sample.off_limits);
        assert_eq!(sample.sample_size, 10);
        assert_eq!(sample.sample_name, "00010000000000000005__file42.bin_data")
    }

    #[test]
    fn test_ingest_duplicate_match() {
        let mut state = TestState::new(vec![test_spec("hosts"), test_spec("backup")]);

        state.ingest(test_match("hosts", 42, 0, b"data bytes"));
        // Same identity through a different term
        state.ingest(test_match("backup", 42, 0, b"data bytes"));

        assert_eq!(state.registry.len(), 1);
        assert_eq!(state.global_limits.accumulated_count, 1);
        assert_eq!(state.specs[1].limits.accumulated_count, 0)
    }

    #[test]
    fn test_ingest_unknown_term() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        state.ingest(test_match("unrelated", 42, 0, b"data bytes"));
        assert_eq!(state.registry.len(), 0)
    }

    #[test]
    fn test_ingest_no_attributes() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        let mut m = test_match("hosts", 42, 0, b"data bytes");
        m.attributes.clear();

        state.ingest(m);
        assert_eq!(state.registry.len(), 0)
    }

    #[test]
    fn test_ingest_global_count_limit() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        state.global_limits.max_sample_count = 2;

        state.ingest(test_match("hosts", 1, 0, b"aaaa"));
        state.ingest(test_match("hosts", 2, 0, b"bbbb"));
        state.ingest(test_match("hosts", 3, 0, b"cccc"));

        assert_eq!(state.registry.len(), 3);
        let off_limits: Vec<bool> = state.registry.iter().map(|s| s.off_limits).collect();
        assert_eq!(off_limits, vec![false, false, true]);
        assert!(state.global_limits.count_reached);
        assert_eq!(state.global_limits.accumulated_count, 2)
    }

    #[test]
    fn test_ingest_local_bytes_total() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        state.specs[0].limits.max_bytes_total = 1000;

        let payload = vec![0x41u8; 400];
        state.ingest(test_match("hosts", 1, 0, &payload));
        state.ingest(test_match("hosts", 2, 0, &payload));
        state.ingest(test_match("hosts", 3, 0, &payload));

        assert_eq!(state.specs[0].limits.accumulated_bytes_total, 800);
        assert!(state.specs[0].limits.total_reached);
        assert!(!state.global_limits.total_reached);

        let off_limits: Vec<bool> = state.registry.iter().map(|s| s.off_limits).collect();
        assert_eq!(off_limits, vec![false, false, true])
    }

    #[test]
    fn test_ingest_multiple_hard_links_keep_last_name() {
        let mut state = TestState::new(vec![test_spec("hosts")]);
        let mut m = test_match("hosts", 42, 0, b"data bytes");
        let mut second = m.names[0].clone();
        second.full_path = String::from("\\files\\other_link.bin");
        second.filename.name = String::from("other_link.bin");
        m.names.push(second);

        state.ingest(m);

        let sample = state.registry.iter().next().unwrap();
        // Both links reserve names, the sample keeps the last one
        assert_eq!(state.names.len(), 2);
        assert_eq!(
            sample.sample_name,
            "00010000000000000005__other_link.bin_data"
        )
    }
}
