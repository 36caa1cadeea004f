use std::fmt;

#[derive(Debug)]
pub enum UtilsError {
    LogFile,
    SpoolRewind,
}

impl std::error::Error for UtilsError {}

impl fmt::Display for UtilsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UtilsError::LogFile => write!(f, "Could not create log file"),
            UtilsError::SpoolRewind => write!(f, "Could not rewind spool stream"),
        }
    }
}
