use uuid::Uuid;

/// Create a UUID and return as a string
pub(crate) fn generate_uuid() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Format an optional snapshot GUID. Absent snapshots render as the nil GUID
pub(crate) fn format_snapshot_guid(snapshot: &Option<Uuid>) -> String {
    snapshot
        .unwrap_or_else(Uuid::nil)
        .hyphenated()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::{format_snapshot_guid, generate_uuid};
    use uuid::Uuid;

    #[test]
    fn test_generate_uuid() {
        let result = generate_uuid();
        assert_eq!(result.is_empty(), false);

        let result2 = generate_uuid();
        assert_ne!(result, result2)
    }

    #[test]
    fn test_format_snapshot_guid() {
        let guid = format_snapshot_guid(&None);
        assert_eq!(guid, "00000000-0000-0000-0000-000000000000");

        let snap = Uuid::parse_str("76b07067-2ccd-3ed4-bfbb-590463d0ebe0").unwrap();
        let guid = format_snapshot_guid(&Some(snap));
        assert_eq!(guid, "76b07067-2ccd-3ed4-bfbb-590463d0ebe0")
    }
}
