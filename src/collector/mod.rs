/**
 * The sample collection pipeline.
 *
 * Matches delivered by a finder are deduplicated on `(volume, file record,
 * attribute instance)`, classified against global and per-spec quotas, given
 * unique output names synthesized from NTFS metadata, and wired to streaming
 * hash-and-transform pipelines. Once ingestion is done the registry drains
 * into an archive or a directory tree alongside a CSV manifest covering
 * every sample, including the ones rejected by the quotas.
 */
use self::error::CollectionError;
use self::limits::Limits;
use self::naming::NameRegistry;
use self::registry::SampleRegistry;
use self::sink::{collect_samples, hash_off_limit_samples};
use self::spec::{CollectionConfig, ContentSpec, FuzzyHashes, Hashes, OutputSpec, SampleSpec};
use crate::finder::Match;
use crate::utils::logging::{collector_log_sink, LogSink};
use crate::utils::time::{time_now, unixepoch_to_filetime};
use std::path::PathBuf;

pub mod error;
mod ingest;
pub mod limits;
mod manifest;
mod naming;
mod pipeline;
mod registry;
mod sink;
pub mod spec;

/// Tallies for a finished collection run
#[derive(Debug)]
pub struct CollectionSummary {
    pub samples_registered: usize,
    pub collected: usize,
    pub off_limits: usize,
    pub bytes_collected: u64,
    pub manifest_rows: usize,
    pub output_path: PathBuf,
}

/// One collection run. Feed it matches from a finder, then `finish` to drain
/// everything into the configured sink
pub struct Collector {
    output: OutputSpec,
    content: ContentSpec,
    hashes: Hashes,
    fuzzy: FuzzyHashes,
    report_all: bool,
    global_limits: Limits,
    specs: Vec<SampleSpec>,
    registry: SampleRegistry,
    names: NameRegistry,
    collection_date: u64,
    log: LogSink,
}

impl Collector {
    pub fn new(config: CollectionConfig) -> Collector {
        Collector::with_log_sink(config, collector_log_sink().clone())
    }

    /// Build a collector around an explicit log sink instead of the process
    /// wide one
    pub fn with_log_sink(config: CollectionConfig, log: LogSink) -> Collector {
        let CollectionConfig {
            output,
            content,
            hashes,
            fuzzy,
            limits,
            report_all,
            specs,
            logging: _,
        } = config;

        Collector {
            output,
            content,
            hashes,
            fuzzy,
            report_all,
            global_limits: limits,
            specs,
            registry: SampleRegistry::new(),
            names: NameRegistry::new(),
            collection_date: unixepoch_to_filetime(&time_now()),
            log,
        }
    }

    /// Ingest one match from the finder
    pub fn ingest(&mut self, m: Match) {
        let content = self.content;
        let hashes = self.hashes;
        let fuzzy = self.fuzzy;
        let collection_date = self.collection_date;

        ingest::ingest_match(
            m,
            &mut self.specs,
            &mut self.global_limits,
            &mut self.registry,
            &mut self.names,
            &content,
            &hashes,
            &fuzzy,
            collection_date,
        );
    }

    /// Ingest every match the finder produced
    pub fn ingest_all(&mut self, matches: impl IntoIterator<Item = Match>) {
        for m in matches {
            self.ingest(m);
        }
    }

    /// Number of samples registered so far
    pub fn registered(&self) -> usize {
        self.registry.len()
    }

    pub fn global_limits(&self) -> &Limits {
        &self.global_limits
    }

    pub fn spec_limits(&self, spec: usize) -> Option<&Limits> {
        self.specs.get(spec).map(|spec| &spec.limits)
    }

    /// Hash off-limits samples when configured to report them, drain the
    /// registry into the sink, and tear the run down
    pub fn finish(mut self) -> Result<CollectionSummary, CollectionError> {
        if self.report_all && self.hashes.any() {
            hash_off_limit_samples(&mut self.registry);
        }

        let result = collect_samples(&self.output, &mut self.registry, &self.log);

        let samples_registered = self.registry.len();
        let off_limits = self
            .registry
            .iter()
            .filter(|sample| sample.reported_off_limits())
            .count();
        self.registry.close_all();

        let summary = result?;
        Ok(CollectionSummary {
            samples_registered,
            collected: summary.collected,
            off_limits,
            bytes_collected: summary.bytes_collected,
            manifest_rows: summary.manifest_rows,
            output_path: self.output.path,
        })
    }
}
