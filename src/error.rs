use std::fmt;

#[derive(Debug)]
pub enum CollectorError {
    NoFile,
    BadToml,
    NoSampleSpecs,
    NoTerms,
    UnknownContentType,
    UnknownOutputFormat,
    UnknownLineEnding,
    CollectionFailed,
}

impl std::error::Error for CollectorError {}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectorError::NoFile => write!(f, "Failed to read TOML file"),
            CollectorError::BadToml => write!(f, "Failed to parse TOML data"),
            CollectorError::NoSampleSpecs => write!(f, "Configuration contains no sample specs"),
            CollectorError::NoTerms => write!(f, "Sample spec contains no terms"),
            CollectorError::UnknownContentType => write!(f, "Unknown content type"),
            CollectorError::UnknownOutputFormat => write!(f, "Unknown output format"),
            CollectorError::UnknownLineEnding => write!(f, "Unknown manifest line ending"),
            CollectorError::CollectionFailed => write!(f, "Failed to collect samples"),
        }
    }
}
