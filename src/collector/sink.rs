use super::error::CollectionError;
use super::manifest::{sample_rows, ManifestWriter};
use super::registry::SampleRegistry;
use super::spec::{OutputSpec, SinkType};
use crate::finder::attribute_full_name;
use crate::output::archive::ArchiveWriter;
use crate::output::directory::{create_output_dir, create_sample_file};
use crate::utils::environment::get_hostname;
use crate::utils::logging::{create_log_file, LogSink};
use crate::utils::spool::{SharedSpool, SpoolStream};
use log::{error, info};
use std::fs::{create_dir_all, File};
use std::io::sink as null_sink;
use std::path::Path;

/// Spool thresholds for the temporary manifest and log streams
const MANIFEST_SPOOL_BYTES: usize = 1048576;
const LOG_SPOOL_BYTES: usize = 5242880;

/// Archive member names for the manifest and the captured run log
const MANIFEST_NAME: &str = "GetThis.csv";
const LOG_NAME: &str = "GetThis.log";

/// What the sink did with the registry
pub(crate) struct SinkSummary {
    pub(crate) collected: usize,
    pub(crate) bytes_collected: u64,
    pub(crate) manifest_rows: usize,
}

/// Drain the pipelines of off-limits samples into a null sink so their hash
/// taps still produce digests for the manifest
pub(crate) fn hash_off_limit_samples(registry: &mut SampleRegistry) {
    info!("[sink] Computing hashes of off limit samples");

    let mut devnull = null_sink();
    for sample in registry.iter_mut() {
        if !sample.off_limits {
            continue;
        }
        let Some(pipeline) = sample.pipeline.as_mut() else {
            continue;
        };
        if pipeline.consumed() {
            continue;
        }

        match pipeline.copy_to(&mut devnull) {
            Ok((bytes, digests)) => {
                sample.sample_size = bytes;
                sample.digests = digests;
            }
            Err(err) => {
                error!(
                    "[sink] Failed while computing hash of off limit sample {}: {err:?}",
                    sample.sample_name
                );
            }
        }
    }
}

/// Drive the registry into the configured sink and emit the manifest
pub(crate) fn collect_samples(
    output: &OutputSpec,
    registry: &mut SampleRegistry,
    log: &LogSink,
) -> Result<SinkSummary, CollectionError> {
    match output.sink {
        SinkType::Archive => collect_to_archive(output, registry, log),
        SinkType::Directory => collect_to_directory(output, registry, log),
    }
}

/// Archive sink: temporary manifest and log streams live next to the archive,
/// the run log is redirected into its spool for the duration of collection,
/// and both streams become the final archive members
fn collect_to_archive(
    output: &OutputSpec,
    registry: &mut SampleRegistry,
    log: &LogSink,
) -> Result<SinkSummary, CollectionError> {
    let parent = output.path.parent().unwrap_or_else(|| Path::new("."));
    let status = create_dir_all(parent);
    if let Err(err) = status {
        error!("[sink] Failed to create archive parent directory {parent:?}: {err:?}");
        return Err(CollectionError::CreateDirectory);
    }

    let manifest = ManifestWriter::new(
        SpoolStream::create(parent, "GetThisCsvStream", MANIFEST_SPOOL_BYTES),
        output.line_ending,
    );
    let log_spool = SharedSpool::create(parent, "GetThisLogStream", LOG_SPOOL_BYTES);
    let previous_log = log.redirect(Box::new(log_spool.clone()));

    let result = archive_samples(output, registry, manifest, &log_spool, log);

    // The spool target is detached on the success path already, drop it on
    // error paths too before putting the previous target back
    log.detach();
    log.restore(previous_log);
    result
}

fn archive_samples(
    output: &OutputSpec,
    registry: &mut SampleRegistry,
    mut manifest: ManifestWriter<SpoolStream>,
    log_spool: &SharedSpool,
    log: &LogSink,
) -> Result<SinkSummary, CollectionError> {
    let archive_result = ArchiveWriter::open(&output.path, &output.password, output.compression);
    let mut archive = match archive_result {
        Ok(result) => result,
        Err(err) => {
            error!("[sink] Failed to open archive {:?}: {err:?}", output.path);
            return Err(CollectionError::Archive);
        }
    };

    info!("[sink] Adding matching samples to archive");
    let mut collected = 0;
    let mut bytes_collected = 0;
    for sample in registry.iter_mut() {
        if !sample.payload_eligible() {
            continue;
        }

        let display = match sample.info.names.first() {
            Some(name) => attribute_full_name(name, &sample.attr_name),
            None => sample.sample_name.clone(),
        };
        if archive.start_member(&sample.sample_name, &display).is_err() {
            // Logged by the archive component, sample row still gets emitted
            continue;
        }

        let Some(pipeline) = sample.pipeline.as_mut() else {
            continue;
        };
        match pipeline.copy_to(&mut archive) {
            Ok((bytes, digests)) => {
                sample.sample_size = bytes;
                sample.digests = digests;
                collected += 1;
                bytes_collected += bytes;
            }
            Err(err) => {
                error!("[sink] Failed to add sample {}: {err:?}", sample.sample_name);
            }
        }
    }

    if archive.flush_queue().is_err() {
        return Err(CollectionError::Archive);
    }

    // Every sample lands in the manifest, off limits ones included
    let hostname = get_hostname();
    for sample in registry.iter() {
        manifest.append(sample_rows(&hostname, sample))?;
    }
    let manifest_rows = manifest.rows_written();

    let mut manifest_spool = manifest.finish()?;
    if manifest_spool.len() > 0 {
        if manifest_spool.rewind().is_err() {
            return Err(CollectionError::Manifest);
        }
        let status = archive.add_stream(MANIFEST_NAME, MANIFEST_NAME, &mut manifest_spool);
        if let Err(err) = status {
            error!("[sink] Failed to add {MANIFEST_NAME}: {err:?}");
        }
    }

    // Stop logging into the spool before splicing it into the archive
    log.detach();
    if log_spool.len() > 0 {
        match log_spool.rewind() {
            Ok(_) => {
                let mut log_reader = log_spool.clone();
                let status = archive.add_stream(LOG_NAME, LOG_NAME, &mut log_reader);
                if let Err(err) = status {
                    error!("[sink] Failed to add {LOG_NAME}: {err:?}");
                }
            }
            Err(err) => {
                error!("[sink] Failed to rewind log stream: {err:?}");
            }
        }
    }

    if archive.complete().is_err() {
        return Err(CollectionError::Archive);
    }

    Ok(SinkSummary {
        collected,
        bytes_collected,
        manifest_rows,
    })
}

/// Directory sink: one file per payload plus the manifest and log file in
/// the output directory
fn collect_to_directory(
    output: &OutputSpec,
    registry: &mut SampleRegistry,
    log: &LogSink,
) -> Result<SinkSummary, CollectionError> {
    let status = create_output_dir(&output.path);
    if status.is_err() {
        return Err(CollectionError::CreateDirectory);
    }

    let log_file = match create_log_file(&output.path.join(LOG_NAME)) {
        Ok(result) => result,
        Err(err) => {
            error!("[sink] Failed to create collection log file: {err:?}");
            return Err(CollectionError::LogStream);
        }
    };
    let previous_log = log.redirect(Box::new(log_file));

    let result = directory_samples(output, registry);

    log.detach();
    log.restore(previous_log);
    result
}

fn directory_samples(
    output: &OutputSpec,
    registry: &mut SampleRegistry,
) -> Result<SinkSummary, CollectionError> {
    info!("[sink] Copying matching samples to {:?}", output.path);

    let manifest_file = match File::create(output.path.join(MANIFEST_NAME)) {
        Ok(result) => result,
        Err(err) => {
            error!("[sink] Failed to create {MANIFEST_NAME}: {err:?}");
            return Err(CollectionError::Manifest);
        }
    };
    let mut manifest = ManifestWriter::new(manifest_file, output.line_ending);

    let mut collected = 0;
    let mut bytes_collected = 0;
    for sample in registry.iter_mut() {
        if !sample.payload_eligible() {
            continue;
        }

        let mut sample_file = match create_sample_file(&output.path, &sample.sample_name) {
            Ok(result) => result,
            Err(err) => {
                error!(
                    "[sink] Failed to create sample file {}: {err:?}",
                    sample.sample_name
                );
                continue;
            }
        };

        let Some(pipeline) = sample.pipeline.as_mut() else {
            continue;
        };
        match pipeline.copy_to(&mut sample_file) {
            Ok((bytes, digests)) => {
                sample.sample_size = bytes;
                sample.digests = digests;
                collected += 1;
                bytes_collected += bytes;
                info!("[sink] {} copied ({bytes} bytes)", sample.sample_name);
            }
            Err(err) => {
                error!("[sink] Failed while writing sample {}: {err:?}", sample.sample_name);
            }
        }
    }

    let hostname = get_hostname();
    for sample in registry.iter() {
        manifest.append(sample_rows(&hostname, sample))?;
    }
    let manifest_rows = manifest.rows_written();
    manifest.finish()?;

    Ok(SinkSummary {
        collected,
        bytes_collected,
        manifest_rows,
    })
}
