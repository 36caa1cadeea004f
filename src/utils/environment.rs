/// Get the hostname used to identify this system in collection output
pub(crate) fn get_hostname() -> String {
    sysinfo::System::host_name().unwrap_or_else(|| String::from("Unknown hostname"))
}

#[cfg(test)]
mod tests {
    use super::get_hostname;

    #[test]
    fn test_get_hostname() {
        let name = get_hostname();
        assert_eq!(name.is_empty(), false)
    }
}
