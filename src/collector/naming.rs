use super::spec::ContentType;
use crate::filesystem::ntfs::FilenameAttr;
use std::collections::HashSet;

/// Characters that never appear in a synthesized sample name
const FORBIDDEN: [char; 10] = [':', '#', '<', '>', '"', '/', '\\', '|', '?', '*'];

/// Output names already allocated in the current run. Names must be unique
/// within the sink namespace, so candidates are probed with an increasing
/// deduplication index until a free one is found
pub(crate) struct NameRegistry {
    names: HashSet<String>,
}

impl NameRegistry {
    pub(crate) fn new() -> NameRegistry {
        NameRegistry {
            names: HashSet::new(),
        }
    }

    /// Allocate a unique output name for one hard link of a sample. A
    /// non-empty spec name becomes a path prefix inside the sink
    pub(crate) fn reserve(
        &mut self,
        spec_name: &str,
        filename: &FilenameAttr,
        data_name: &str,
        content: ContentType,
    ) -> String {
        let mut idx = 0;
        loop {
            let synthesized = sample_file_name(content, filename, data_name, idx);
            let candidate = if spec_name.is_empty() {
                synthesized
            } else {
                format!("{spec_name}\\{synthesized}")
            };

            if !self.names.contains(&candidate) {
                self.names.insert(candidate.clone());
                return candidate;
            }
            idx += 1;
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

/// Synthesize a sample file name from NTFS metadata: the parent reference in
/// fixed-width uppercase hex, the link name, the data stream name when the
/// attribute is named, the deduplication index when non-zero, and the
/// content tag
fn sample_file_name(
    content: ContentType,
    filename: &FilenameAttr,
    data_name: &str,
    idx: u32,
) -> String {
    let parent = &filename.parent;
    let prefix = format!(
        "{:04X}{:08X}{:08X}",
        parent.sequence, parent.segment_high, parent.segment_low
    );
    let tag = content.tag();

    let name = if data_name.is_empty() {
        if idx == 0 {
            format!("{prefix}__{}_{tag}", filename.name)
        } else {
            format!("{prefix}__{}_{idx}_{tag}", filename.name)
        }
    } else if idx == 0 {
        format!("{prefix}_{}_{data_name}_{tag}", filename.name)
    } else {
        format!("{prefix}_{}_{data_name}_{idx}_{tag}", filename.name)
    };

    sanitize_sample_name(&name)
}

/// Replace anything the sink namespace cannot carry with underscores
fn sanitize_sample_name(name: &str) -> String {
    name.chars()
        .map(|value| {
            if value.is_whitespace() || FORBIDDEN.contains(&value) {
                '_'
            } else {
                value
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_file_name, sanitize_sample_name, NameRegistry};
    use crate::collector::spec::ContentType;
    use crate::filesystem::ntfs::{FileReference, FilenameAttr};

    fn test_filename(name: &str) -> FilenameAttr {
        FilenameAttr {
            parent: FileReference {
                sequence: 0x0001,
                segment_high: 0x0000,
                segment_low: 0x000a,
            },
            name: name.to_string(),
            created: 0,
            modified: 0,
            accessed: 0,
            changed: 0,
        }
    }

    #[test]
    fn test_sample_file_name() {
        let filename = test_filename("foo.txt");
        let name = sample_file_name(ContentType::Data, &filename, "", 0);
        assert_eq!(name, "0001000000000000000A__foo.txt_data")
    }

    #[test]
    fn test_sample_file_name_with_stream() {
        let filename = test_filename("foo.txt");
        let name = sample_file_name(ContentType::Strings, &filename, "Zone.Identifier", 0);
        assert_eq!(name, "0001000000000000000A_foo.txt_Zone.Identifier_strings")
    }

    #[test]
    fn test_sample_file_name_with_index() {
        let filename = test_filename("foo.txt");
        let name = sample_file_name(ContentType::Raw, &filename, "", 3);
        assert_eq!(name, "0001000000000000000A__foo.txt_3_raw");

        let name = sample_file_name(ContentType::Data, &filename, "ads", 2);
        assert_eq!(name, "0001000000000000000A_foo.txt_ads_2_data")
    }

    #[test]
    fn test_sanitize_sample_name() {
        let result = sanitize_sample_name("spaced name:alt#<>\"/\\|?*stream");
        assert_eq!(result, "spaced_name_alt__________stream")
    }

    #[test]
    fn test_reserve_unique_names() {
        let mut registry = NameRegistry::new();
        let filename = test_filename("foo.txt");

        let first = registry.reserve("", &filename, "", ContentType::Data);
        let second = registry.reserve("", &filename, "", ContentType::Data);
        let third = registry.reserve("", &filename, "", ContentType::Data);

        assert_eq!(first, "0001000000000000000A__foo.txt_data");
        assert_eq!(second, "0001000000000000000A__foo.txt_1_data");
        assert_eq!(third, "0001000000000000000A__foo.txt_2_data");
        assert_eq!(registry.len(), 3)
    }

    #[test]
    fn test_reserve_with_spec_prefix() {
        let mut registry = NameRegistry::new();
        let filename = test_filename("foo.txt");

        let name = registry.reserve("config", &filename, "", ContentType::Data);
        assert_eq!(name, "config\\0001000000000000000A__foo.txt_data");

        // Same synthesized name under a different spec does not collide
        let other = registry.reserve("persist", &filename, "", ContentType::Data);
        assert_eq!(other, "persist\\0001000000000000000A__foo.txt_data")
    }
}
