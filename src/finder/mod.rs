/**
 * Contract types for the filesystem finder feeding the collector.
 *
 * The finder itself (MFT walking, location enumeration, YARA scanning) lives
 * outside this crate. It delivers one `Match` per filesystem object that
 * satisfied a configured term, carrying every piece of metadata the
 * collection pipeline needs: the term, volume identity, file reference,
 * hard-link names, and the matching attributes with their byte sources.
 */
use crate::filesystem::ntfs::{AttributeType, FilenameAttr, StandardInfoAttr};
use std::fs::File;
use std::io::{Cursor, Error, Read};
use std::path::PathBuf;
use uuid::Uuid;

/// A single filesystem query inside a sample spec. The finder reports which
/// term produced each match; the description feeds the collection manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub name: String,
    pub description: String,
}

impl Term {
    pub fn new(name: &str, description: &str) -> Term {
        Term {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

/// Identity of the volume a match came from. Snapshot-backed readers expose
/// the shadow copy ID, live readers leave it empty
#[derive(Debug, Clone, Copy)]
pub struct VolumeInfo {
    pub serial: u64,
    pub snapshot_id: Option<Uuid>,
}

/// Where the bytes of an attribute come from. Resident attribute data
/// arrives in memory, non-resident data is opened lazily from disk when the
/// pipeline is first consumed
#[derive(Debug)]
pub enum ByteSource {
    Memory(Vec<u8>),
    File { path: PathBuf, size: Option<u64> },
}

impl ByteSource {
    /// Size of the source when known without opening it
    pub fn size(&self) -> Option<u64> {
        match self {
            ByteSource::Memory(data) => Some(data.len() as u64),
            ByteSource::File { size, .. } => *size,
        }
    }

    /// Open the source for a single forward read
    pub(crate) fn open(self) -> Result<SourceReader, Error> {
        match self {
            ByteSource::Memory(data) => Ok(SourceReader::Memory(Cursor::new(data))),
            ByteSource::File { path, .. } => Ok(SourceReader::Disk(File::open(path)?)),
        }
    }
}

/// An opened byte source
pub(crate) enum SourceReader {
    Memory(Cursor<Vec<u8>>),
    Disk(File),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self {
            SourceReader::Memory(cursor) => cursor.read(buf),
            SourceReader::Disk(file) => file.read(buf),
        }
    }
}

/// One hard link of a matched file
#[derive(Debug, Clone)]
pub struct MatchingName {
    pub full_path: String,
    pub filename: FilenameAttr,
}

/// One attribute of a matched file that satisfied the term. `data` is the
/// parsed stream, `raw` the unparsed on-disk bytes when the finder can
/// provide them
#[derive(Debug)]
pub struct MatchingAttribute {
    pub attr_type: AttributeType,
    pub name: String,
    pub instance_id: u32,
    pub data: ByteSource,
    pub raw: Option<ByteSource>,
    pub yara_rules: Option<Vec<String>>,
}

/// One filesystem object reported by the finder
#[derive(Debug)]
pub struct Match {
    pub term: Term,
    pub volume: VolumeInfo,
    pub frn: u64,
    pub standard_info: StandardInfoAttr,
    pub names: Vec<MatchingName>,
    pub attributes: Vec<MatchingAttribute>,
}

/// Display path for an attribute of a match: the hard-link path, with the
/// stream name appended for named streams
pub(crate) fn attribute_full_name(name: &MatchingName, attr_name: &str) -> String {
    if attr_name.is_empty() {
        name.full_path.clone()
    } else {
        format!("{}:{}", name.full_path, attr_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{attribute_full_name, ByteSource, MatchingName};
    use crate::filesystem::ntfs::{FileReference, FilenameAttr};
    use std::io::Read;

    fn test_name() -> MatchingName {
        MatchingName {
            full_path: String::from("\\Users\\public\\note.txt"),
            filename: FilenameAttr {
                parent: FileReference {
                    sequence: 1,
                    segment_high: 0,
                    segment_low: 5,
                },
                name: String::from("note.txt"),
                created: 0,
                modified: 0,
                accessed: 0,
                changed: 0,
            },
        }
    }

    #[test]
    fn test_byte_source_memory() {
        let source = ByteSource::Memory(b"resident data".to_vec());
        assert_eq!(source.size(), Some(13));

        let mut reader = source.open().unwrap();
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"resident data")
    }

    #[test]
    fn test_attribute_full_name() {
        let name = test_name();
        assert_eq!(attribute_full_name(&name, ""), "\\Users\\public\\note.txt");
        assert_eq!(
            attribute_full_name(&name, "Zone.Identifier"),
            "\\Users\\public\\note.txt:Zone.Identifier"
        )
    }
}
