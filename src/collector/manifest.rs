use super::error::CollectionError;
use super::registry::SampleRef;
use super::spec::LineEnding;
use crate::utils::uuid::format_snapshot_guid;
use csv::{Terminator, Writer, WriterBuilder};
use log::error;
use serde::Serialize;
use std::io::Write;

/// One manifest record: a single hard link of a single collected sample
#[derive(Debug, Serialize)]
pub(crate) struct ManifestRow {
    #[serde(rename = "ComputerName")]
    pub(crate) computer_name: String,
    #[serde(rename = "VolumeSerialNumber")]
    pub(crate) volume_serial_number: u64,
    #[serde(rename = "ParentFRN")]
    pub(crate) parent_frn: u64,
    #[serde(rename = "FRN")]
    pub(crate) frn: u64,
    #[serde(rename = "FullPath")]
    pub(crate) full_path: String,
    #[serde(rename = "SampleName")]
    pub(crate) sample_name: String,
    #[serde(rename = "SampleSize")]
    pub(crate) sample_size: u64,
    #[serde(rename = "MD5")]
    pub(crate) md5: String,
    #[serde(rename = "SHA1")]
    pub(crate) sha1: String,
    #[serde(rename = "Description")]
    pub(crate) description: String,
    #[serde(rename = "ContentType")]
    pub(crate) content_type: String,
    #[serde(rename = "CollectionDate")]
    pub(crate) collection_date: u64,
    #[serde(rename = "CreationDate")]
    pub(crate) creation_date: u64,
    #[serde(rename = "LastModificationDate")]
    pub(crate) last_modification_date: u64,
    #[serde(rename = "LastAccessDate")]
    pub(crate) last_access_date: u64,
    #[serde(rename = "LastAttrChangeDate")]
    pub(crate) last_attr_change_date: u64,
    #[serde(rename = "FileNameCreationDate")]
    pub(crate) filename_creation_date: u64,
    #[serde(rename = "FileNameLastModificationDate")]
    pub(crate) filename_last_modification_date: u64,
    #[serde(rename = "FileNameLastAccessDate")]
    pub(crate) filename_last_access_date: u64,
    #[serde(rename = "FileNameLastAttrModificationDate")]
    pub(crate) filename_last_attr_modification_date: u64,
    #[serde(rename = "AttributeType")]
    pub(crate) attribute_type: String,
    #[serde(rename = "AttributeName")]
    pub(crate) attribute_name: String,
    #[serde(rename = "InstanceID")]
    pub(crate) instance_id: u32,
    #[serde(rename = "SnapshotID")]
    pub(crate) snapshot_id: String,
    #[serde(rename = "SHA256")]
    pub(crate) sha256: String,
    #[serde(rename = "SSDeep")]
    pub(crate) ssdeep: String,
    #[serde(rename = "TLSH")]
    pub(crate) tlsh: String,
    #[serde(rename = "YaraRules")]
    pub(crate) yara_rules: String,
}

/// Build the manifest rows for one sample, one per hard link. Off-limits
/// samples are enumerated but carry no output name
pub(crate) fn sample_rows(computer_name: &str, sample: &SampleRef) -> Vec<ManifestRow> {
    let mut rows = Vec::new();
    let info = &sample.info;

    for name in &info.names {
        let sample_name = if sample.reported_off_limits() {
            String::new()
        } else {
            sample.sample_name.clone()
        };

        rows.push(ManifestRow {
            computer_name: computer_name.to_string(),
            volume_serial_number: info.volume.serial,
            parent_frn: name.filename.parent.to_frn(),
            frn: info.frn,
            full_path: name.full_path.clone(),
            sample_name,
            sample_size: sample.sample_size,
            md5: sample.digests.md5.clone(),
            sha1: sample.digests.sha1.clone(),
            description: info.term.description.clone(),
            content_type: sample.content.content_type.manifest_label().to_string(),
            collection_date: sample.collection_date,
            creation_date: info.standard_info.created,
            last_modification_date: info.standard_info.modified,
            last_access_date: info.standard_info.accessed,
            last_attr_change_date: info.standard_info.changed,
            filename_creation_date: name.filename.created,
            filename_last_modification_date: name.filename.modified,
            filename_last_access_date: name.filename.accessed,
            filename_last_attr_modification_date: name.filename.changed,
            attribute_type: sample.attr_type.as_str().to_string(),
            attribute_name: sample.attr_name.clone(),
            instance_id: sample.key.instance_id,
            snapshot_id: format_snapshot_guid(&sample.snapshot_id),
            sha256: sample.digests.sha256.clone(),
            ssdeep: sample.digests.ssdeep.clone(),
            tlsh: sample.digests.tlsh.clone(),
            yara_rules: sample.yara_rules.as_deref().unwrap_or(&[]).join("; "),
        });
    }

    rows
}

/// CSV manifest writer over any byte sink
pub(crate) struct ManifestWriter<W: Write> {
    writer: Writer<W>,
    rows: usize,
}

impl<W: Write> ManifestWriter<W> {
    pub(crate) fn new(sink: W, line_ending: LineEnding) -> ManifestWriter<W> {
        let terminator = match line_ending {
            LineEnding::Lf => Terminator::Any(b'\n'),
            LineEnding::Crlf => Terminator::CRLF,
        };
        ManifestWriter {
            writer: WriterBuilder::new().terminator(terminator).from_writer(sink),
            rows: 0,
        }
    }

    /// Append rows for one sample
    pub(crate) fn append(&mut self, rows: Vec<ManifestRow>) -> Result<(), CollectionError> {
        for row in rows {
            let status = self.writer.serialize(row);
            if let Err(err) = status {
                error!("[manifest] Failed to serialize manifest row: {err:?}");
                return Err(CollectionError::Manifest);
            }
            self.rows += 1;
        }
        Ok(())
    }

    pub(crate) fn rows_written(&self) -> usize {
        self.rows
    }

    /// Flush and hand the underlying sink back
    pub(crate) fn finish(self) -> Result<W, CollectionError> {
        match self.writer.into_inner() {
            Ok(sink) => Ok(sink),
            Err(err) => {
                error!("[manifest] Failed to flush manifest: {err:?}");
                Err(CollectionError::Manifest)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{sample_rows, ManifestWriter};
    use crate::collector::pipeline::HashDigests;
    use crate::collector::registry::{MatchInfo, SampleKey, SampleRef};
    use crate::collector::spec::{ContentSpec, ContentType, LineEnding};
    use crate::filesystem::ntfs::{
        AttributeType, FileReference, FilenameAttr, StandardInfoAttr,
    };
    use crate::finder::{MatchingName, Term, VolumeInfo};
    use std::rc::Rc;

    fn test_sample(names: usize) -> SampleRef {
        let mut matching_names = Vec::new();
        for idx in 0..names {
            matching_names.push(MatchingName {
                full_path: format!("\\Users\\public\\link{idx}.txt"),
                filename: FilenameAttr {
                    parent: FileReference {
                        sequence: 1,
                        segment_high: 0,
                        segment_low: 10,
                    },
                    name: format!("link{idx}.txt"),
                    created: 1,
                    modified: 2,
                    accessed: 3,
                    changed: 4,
                },
            });
        }

        let info = MatchInfo {
            term: Term::new("hosts", "hosts file"),
            volume: VolumeInfo {
                serial: 77,
                snapshot_id: None,
            },
            frn: 0x1122_3344_5566_7788,
            standard_info: StandardInfoAttr {
                created: 5,
                modified: 6,
                accessed: 7,
                changed: 8,
            },
            names: matching_names,
        };

        SampleRef {
            key: SampleKey {
                volume_serial: 77,
                frn: 0x1122_3344_5566_7788,
                instance_id: 2,
            },
            info: Rc::new(info),
            snapshot_id: None,
            content: ContentSpec {
                content_type: ContentType::Data,
                min_chars: 0,
                max_chars: 0,
            },
            collection_date: 132244766410000000,
            sample_name: String::from("0001000000000000000A__link0.txt_data"),
            off_limits: false,
            sample_size: 11,
            attr_type: AttributeType::Data,
            attr_name: String::new(),
            yara_rules: Some(vec![String::from("rule_a"), String::from("rule_b")]),
            pipeline: None,
            digests: HashDigests {
                md5: String::from("9195d0beb2a889e1be05ed6bb1954837"),
                ..HashDigests::default()
            },
        }
    }

    #[test]
    fn test_sample_rows() {
        let sample = test_sample(2);
        let rows = sample_rows("WORKSTATION", &sample);
        assert_eq!(rows.len(), 2);

        // No pipeline attached, so the sample reports as off-limits
        assert_eq!(rows[0].sample_name, "");
        assert_eq!(rows[0].full_path, "\\Users\\public\\link0.txt");
        assert_eq!(rows[1].full_path, "\\Users\\public\\link1.txt");
        assert_eq!(rows[0].parent_frn, 0x0001_0000_0000_000a);
        assert_eq!(rows[0].frn, 0x1122_3344_5566_7788);
        assert_eq!(rows[0].md5, "9195d0beb2a889e1be05ed6bb1954837");
        assert_eq!(rows[0].content_type, "data");
        assert_eq!(rows[0].attribute_type, "$DATA");
        assert_eq!(rows[0].instance_id, 2);
        assert_eq!(rows[0].snapshot_id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(rows[0].yara_rules, "rule_a; rule_b")
    }

    #[test]
    fn test_manifest_writer() {
        let sample = test_sample(1);
        let mut manifest = ManifestWriter::new(Vec::new(), LineEnding::Lf);
        manifest.append(sample_rows("WORKSTATION", &sample)).unwrap();
        assert_eq!(manifest.rows_written(), 1);

        let bytes = manifest.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("ComputerName,VolumeSerialNumber,ParentFRN,FRN,FullPath"));
        assert!(header.ends_with("SHA256,SSDeep,TLSH,YaraRules"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("WORKSTATION,77,"));
        assert!(row.contains("rule_a; rule_b"))
    }

    #[test]
    fn test_manifest_writer_crlf() {
        let sample = test_sample(1);
        let mut manifest = ManifestWriter::new(Vec::new(), LineEnding::Crlf);
        manifest.append(sample_rows("WORKSTATION", &sample)).unwrap();

        let bytes = manifest.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\r\n"))
    }
}
