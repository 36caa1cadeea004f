use super::limits::Limits;
use crate::error::CollectorError;
use crate::finder::Term;
use crate::structs::toml::{CollectorToml, ContentOptions, FuzzyOptions, HashOptions};
use log::error;
use std::path::PathBuf;

/// Default printable run bounds when neither the spec nor the global
/// configuration provides them
const DEFAULT_MIN_CHARS: u32 = 3;
const DEFAULT_MAX_CHARS: u32 = 1024;

/// What to extract from a matched attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Data,
    Strings,
    Raw,
}

impl ContentType {
    /// Tag appended to synthesized sample names
    pub(crate) fn tag(&self) -> &'static str {
        match self {
            ContentType::Data => "data",
            ContentType::Strings => "strings",
            ContentType::Raw => "raw",
        }
    }

    /// Value reported in the manifest. Raw extraction reports nothing
    pub(crate) fn manifest_label(&self) -> &'static str {
        match self {
            ContentType::Data => "data",
            ContentType::Strings => "strings",
            ContentType::Raw => "",
        }
    }

    fn parse(value: &str) -> Result<ContentType, CollectorError> {
        match value.to_lowercase().as_str() {
            "data" => Ok(ContentType::Data),
            "strings" => Ok(ContentType::Strings),
            "raw" => Ok(ContentType::Raw),
            _ => {
                error!("[spec] Unknown content type: {value}");
                Err(CollectorError::UnknownContentType)
            }
        }
    }
}

/// Content selection for a spec or for the whole run. `min_chars` and
/// `max_chars` only apply to strings extraction; zero means inherit the
/// global bounds
#[derive(Debug, Clone, Copy)]
pub struct ContentSpec {
    pub content_type: ContentType,
    pub min_chars: u32,
    pub max_chars: u32,
}

impl Default for ContentSpec {
    fn default() -> ContentSpec {
        ContentSpec {
            content_type: ContentType::Data,
            min_chars: 0,
            max_chars: 0,
        }
    }
}

/// Which cryptographic digests the pipeline should compute
#[derive(Debug, Clone, Copy, Default)]
pub struct Hashes {
    pub md5: bool,
    pub sha1: bool,
    pub sha256: bool,
}

impl Hashes {
    pub fn any(&self) -> bool {
        self.md5 || self.sha1 || self.sha256
    }

    fn from_options(options: &Option<HashOptions>) -> Hashes {
        let Some(options) = options else {
            return Hashes::default();
        };
        Hashes {
            md5: options.md5.unwrap_or(false),
            sha1: options.sha1.unwrap_or(false),
            sha256: options.sha256.unwrap_or(false),
        }
    }
}

/// Which fuzzy digests the pipeline should compute
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyHashes {
    pub ssdeep: bool,
    pub tlsh: bool,
}

impl FuzzyHashes {
    pub fn any(&self) -> bool {
        self.ssdeep || self.tlsh
    }

    fn from_options(options: &Option<FuzzyOptions>) -> FuzzyHashes {
        let Some(options) = options else {
            return FuzzyHashes::default();
        };
        FuzzyHashes {
            ssdeep: options.ssdeep.unwrap_or(false),
            tlsh: options.tlsh.unwrap_or(false),
        }
    }
}

/// Manifest row terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    Crlf,
}

/// Where collected bytes go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkType {
    Archive,
    Directory,
}

/// Resolved output destination
#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub sink: SinkType,
    pub path: PathBuf,
    pub password: Option<String>,
    pub compression: u32,
    pub line_ending: LineEnding,
}

/// One group of terms with its own content selection and quotas
#[derive(Debug, Clone)]
pub struct SampleSpec {
    pub name: String,
    pub terms: Vec<Term>,
    pub content: ContentSpec,
    pub limits: Limits,
}

/// Fully resolved collection run configuration
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub output: OutputSpec,
    pub content: ContentSpec,
    pub hashes: Hashes,
    pub fuzzy: FuzzyHashes,
    pub limits: Limits,
    pub report_all: bool,
    pub specs: Vec<SampleSpec>,
    pub logging: Option<String>,
}

impl CollectionConfig {
    /// Validate and resolve the TOML definition into runtime form
    pub fn from_toml(data: &CollectorToml) -> Result<CollectionConfig, CollectorError> {
        if data.samples.is_empty() {
            error!("[spec] Collection defines no sample specs");
            return Err(CollectorError::NoSampleSpecs);
        }

        let output = resolve_output(data)?;
        let content = resolve_global_content(&data.collection.content)?;

        let mut specs = Vec::new();
        for entry in &data.samples {
            if entry.terms.is_empty() {
                error!("[spec] Sample spec has no terms");
                return Err(CollectorError::NoTerms);
            }

            let terms = entry
                .terms
                .iter()
                .map(|term| {
                    Term::new(&term.name, term.description.as_deref().unwrap_or(&term.name))
                })
                .collect();

            specs.push(SampleSpec {
                name: entry.name.clone().unwrap_or_default(),
                terms,
                content: resolve_spec_content(&entry.content, &content)?,
                limits: Limits::from_options(&entry.limits),
            });
        }

        Ok(CollectionConfig {
            output,
            content,
            hashes: Hashes::from_options(&data.collection.hashes),
            fuzzy: FuzzyHashes::from_options(&data.collection.fuzzy),
            limits: Limits::from_options(&data.collection.limits),
            report_all: data.collection.report_all.unwrap_or(false),
            specs,
            logging: data.output.logging.clone(),
        })
    }
}

fn resolve_output(data: &CollectorToml) -> Result<OutputSpec, CollectorError> {
    let sink = match data.output.format.to_lowercase().as_str() {
        "archive" => SinkType::Archive,
        "directory" => SinkType::Directory,
        other => {
            error!("[spec] Unknown output format: {other}");
            return Err(CollectorError::UnknownOutputFormat);
        }
    };

    let path = match sink {
        SinkType::Archive => {
            PathBuf::from(&data.output.directory).join(format!("{}.zip", data.output.name))
        }
        SinkType::Directory => PathBuf::from(&data.output.directory).join(&data.output.name),
    };

    let line_ending = match &data.output.line_ending {
        None => LineEnding::Lf,
        Some(value) => match value.to_lowercase().as_str() {
            "lf" => LineEnding::Lf,
            "crlf" => LineEnding::Crlf,
            other => {
                error!("[spec] Unknown manifest line ending: {other}");
                return Err(CollectorError::UnknownLineEnding);
            }
        },
    };

    // Deflate levels beyond nine are meaningless
    let max_level = 9;
    Ok(OutputSpec {
        sink,
        path,
        password: data.output.password.clone().filter(|pass| !pass.is_empty()),
        compression: data.output.compression.unwrap_or(5).min(max_level),
        line_ending,
    })
}

/// The global content entry is the inheritance fallback, so its strings
/// bounds are always concrete
fn resolve_global_content(
    options: &Option<ContentOptions>,
) -> Result<ContentSpec, CollectorError> {
    let Some(options) = options else {
        return Ok(ContentSpec {
            content_type: ContentType::Data,
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
        });
    };

    let content_type = match &options.content_type {
        Some(value) => ContentType::parse(value)?,
        None => ContentType::Data,
    };

    let min_chars = options.min_chars.unwrap_or(0);
    let max_chars = options.max_chars.unwrap_or(0);
    Ok(ContentSpec {
        content_type,
        min_chars: if min_chars == 0 { DEFAULT_MIN_CHARS } else { min_chars },
        max_chars: if max_chars == 0 { DEFAULT_MAX_CHARS } else { max_chars },
    })
}

/// Per-spec content keeps zero bounds so strings extraction can fall back to
/// the global values
fn resolve_spec_content(
    options: &Option<ContentOptions>,
    global: &ContentSpec,
) -> Result<ContentSpec, CollectorError> {
    let Some(options) = options else {
        return Ok(ContentSpec {
            content_type: global.content_type,
            min_chars: 0,
            max_chars: 0,
        });
    };

    let content_type = match &options.content_type {
        Some(value) => ContentType::parse(value)?,
        None => global.content_type,
    };

    Ok(ContentSpec {
        content_type,
        min_chars: options.min_chars.unwrap_or(0),
        max_chars: options.max_chars.unwrap_or(0),
    })
}
