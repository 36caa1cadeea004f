use std::fmt;

#[derive(Debug)]
pub enum CollectionError {
    RawStreamUnavailable,
    PipelineConsumed,
    SourceOpen,
    SourceRead,
    SinkWrite,
    CreateDirectory,
    Manifest,
    LogStream,
    Archive,
}

impl std::error::Error for CollectionError {}

impl fmt::Display for CollectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionError::RawStreamUnavailable => {
                write!(f, "Raw content requested but the match carries no raw stream")
            }
            CollectionError::PipelineConsumed => {
                write!(f, "Sample pipeline was already consumed")
            }
            CollectionError::SourceOpen => write!(f, "Could not open sample byte source"),
            CollectionError::SourceRead => write!(f, "Could not read sample byte source"),
            CollectionError::SinkWrite => write!(f, "Could not write sample bytes to sink"),
            CollectionError::CreateDirectory => write!(f, "Could not create output directory(ies)"),
            CollectionError::Manifest => write!(f, "Could not write collection manifest"),
            CollectionError::LogStream => write!(f, "Could not set up collection log stream"),
            CollectionError::Archive => write!(f, "Could not finalize collection archive"),
        }
    }
}
