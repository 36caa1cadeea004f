use crate::collector::spec::CollectionConfig;
use crate::collector::{CollectionSummary, Collector};
use crate::error::CollectorError;
use crate::finder::Match;
use crate::structs::toml::CollectorToml;
use crate::utils::logging::init_logging;
use log::{error, info};
use std::fs::read;

/// Run a collection defined by the TOML file at the provided path against
/// the matches a finder produced
pub fn collect_from_file(
    path: &str,
    matches: impl IntoIterator<Item = Match>,
) -> Result<CollectionSummary, CollectorError> {
    let buffer_results = read(path);
    let buffer = match buffer_results {
        Ok(results) => results,
        Err(err) => {
            error!("[core] Failed to read TOML file {path}: {err:?}");
            return Err(CollectorError::NoFile);
        }
    };

    collect_from_data(&buffer, matches)
}

/// Run a collection defined by already read TOML data
pub fn collect_from_data(
    data: &[u8],
    matches: impl IntoIterator<Item = Match>,
) -> Result<CollectionSummary, CollectorError> {
    let toml_data = CollectorToml::parse_collector_toml(data)?;
    let config = CollectionConfig::from_toml(&toml_data)?;

    let sink = init_logging(&config.logging);
    let mut collector = Collector::with_log_sink(config, sink.clone());
    collector.ingest_all(matches);

    let result = collector.finish();
    match result {
        Ok(summary) => {
            info!(
                "[core] Collected {} samples ({} bytes)",
                summary.collected, summary.bytes_collected
            );
            Ok(summary)
        }
        Err(err) => {
            error!("[core] Failed to collect samples: {err:?}");
            Err(CollectorError::CollectionFailed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::collect_from_data;
    use crate::filesystem::ntfs::{
        AttributeType, FileReference, FilenameAttr, StandardInfoAttr,
    };
    use crate::finder::{ByteSource, Match, MatchingAttribute, MatchingName, Term, VolumeInfo};

    fn test_match() -> Match {
        Match {
            term: Term::new("hosts", "hosts file"),
            volume: VolumeInfo {
                serial: 1,
                snapshot_id: None,
            },
            frn: 7,
            standard_info: StandardInfoAttr::default(),
            names: vec![MatchingName {
                full_path: String::from("\\Windows\\System32\\drivers\\etc\\hosts"),
                filename: FilenameAttr {
                    parent: FileReference {
                        sequence: 1,
                        segment_high: 0,
                        segment_low: 5,
                    },
                    name: String::from("hosts"),
                    created: 0,
                    modified: 0,
                    accessed: 0,
                    changed: 0,
                },
            }],
            attributes: vec![MatchingAttribute {
                attr_type: AttributeType::Data,
                name: String::new(),
                instance_id: 0,
                data: ByteSource::Memory(b"127.0.0.1 localhost".to_vec()),
                raw: None,
                yara_rules: None,
            }],
        }
    }

    #[test]
    fn test_collect_from_data() {
        let config = r#"
[output]
name = "core_collect_test"
directory = "./tmp"
format = "directory"

[collection]

[collection.hashes]
md5 = true

[[samples]]
terms = [{ name = "hosts", description = "hosts file" }]
"#;

        let summary = collect_from_data(config.as_bytes(), vec![test_match()]).unwrap();
        assert_eq!(summary.samples_registered, 1);
        assert_eq!(summary.collected, 1);
        assert_eq!(summary.off_limits, 0);
        assert_eq!(summary.bytes_collected, 19);
        assert_eq!(summary.manifest_rows, 1)
    }

    #[test]
    fn test_collect_from_missing_file() {
        let result = super::collect_from_file("./tmp/does_not_exist.toml", Vec::new());
        assert!(result.is_err())
    }
}
