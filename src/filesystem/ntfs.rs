/// NTFS file reference: 48-bit segment number plus a reuse sequence number.
/// The segment high part is kept wide so synthesized sample names keep their
/// fixed hex widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileReference {
    pub sequence: u16,
    pub segment_high: u32,
    pub segment_low: u32,
}

impl FileReference {
    /// Pack the reference into the 64-bit value NTFS stores on disk
    pub fn to_frn(&self) -> u64 {
        ((self.sequence as u64) << 48)
            | (((self.segment_high & 0xffff) as u64) << 32)
            | self.segment_low as u64
    }

    /// Split a packed 64-bit reference back into its parts
    pub fn from_frn(frn: u64) -> FileReference {
        FileReference {
            sequence: (frn >> 48) as u16,
            segment_high: ((frn >> 32) & 0xffff) as u32,
            segment_low: (frn & 0xffff_ffff) as u32,
        }
    }
}

/// The pieces of a $FILE_NAME attribute the collector consumes. One exists
/// per hard link. Timestamps are raw FILETIME values
#[derive(Debug, Clone)]
pub struct FilenameAttr {
    pub parent: FileReference,
    pub name: String,
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub changed: u64,
}

/// $STANDARD_INFORMATION timestamps, raw FILETIME values
#[derive(Debug, Clone, Default)]
pub struct StandardInfoAttr {
    pub created: u64,
    pub modified: u64,
    pub accessed: u64,
    pub changed: u64,
}

/// NTFS attribute type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    StandardInformation,
    AttributeList,
    FileName,
    ObjectId,
    SecurityDescriptor,
    VolumeName,
    VolumeInformation,
    Data,
    IndexRoot,
    IndexAllocation,
    Bitmap,
    ReparsePoint,
    EaInformation,
    Ea,
    LoggedUtilityStream,
}

impl AttributeType {
    /// Symbolic attribute name as reported in collection output
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::StandardInformation => "$STANDARD_INFORMATION",
            AttributeType::AttributeList => "$ATTRIBUTE_LIST",
            AttributeType::FileName => "$FILE_NAME",
            AttributeType::ObjectId => "$OBJECT_ID",
            AttributeType::SecurityDescriptor => "$SECURITY_DESCRIPTOR",
            AttributeType::VolumeName => "$VOLUME_NAME",
            AttributeType::VolumeInformation => "$VOLUME_INFORMATION",
            AttributeType::Data => "$DATA",
            AttributeType::IndexRoot => "$INDEX_ROOT",
            AttributeType::IndexAllocation => "$INDEX_ALLOCATION",
            AttributeType::Bitmap => "$BITMAP",
            AttributeType::ReparsePoint => "$REPARSE_POINT",
            AttributeType::EaInformation => "$EA_INFORMATION",
            AttributeType::Ea => "$EA",
            AttributeType::LoggedUtilityStream => "$LOGGED_UTILITY_STREAM",
        }
    }
}
