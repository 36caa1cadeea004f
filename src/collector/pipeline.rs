use super::error::CollectionError;
use super::spec::{ContentSpec, ContentType, FuzzyHashes, Hashes};
use crate::finder::ByteSource;
use crate::utils::strings::StringsScanner;
use fuzzyhash::FuzzyHash;
use log::{error, warn};
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;
use std::io::{Read, Write};
use tlsh2::TlshDefaultBuilder;

/// Read samples in 64KB chunks
const CHUNK_SIZE: usize = 65536;

/// ssdeep digests are computed over a contiguous buffer. Samples beyond this
/// bound skip the ssdeep column rather than report a digest of a prefix
const SSDEEP_MAX_BYTES: usize = 268435456;

/// Final digest strings for one sample. Empty when an algorithm was not
/// requested or could not produce a result
#[derive(Debug, Clone, Default)]
pub(crate) struct HashDigests {
    pub(crate) md5: String,
    pub(crate) sha1: String,
    pub(crate) sha256: String,
    pub(crate) ssdeep: String,
    pub(crate) tlsh: String,
}

/// Streaming MD5/SHA1/SHA256 over the bytes passing through the pipeline
struct CryptoTap {
    md5: Option<Md5>,
    sha1: Option<Sha1>,
    sha256: Option<Sha256>,
}

impl CryptoTap {
    fn new(hashes: &Hashes) -> Option<CryptoTap> {
        if !hashes.any() {
            return None;
        }
        Some(CryptoTap {
            md5: hashes.md5.then(Md5::new),
            sha1: hashes.sha1.then(Sha1::new),
            sha256: hashes.sha256.then(Sha256::new),
        })
    }

    fn update(&mut self, data: &[u8]) {
        if let Some(md5) = self.md5.as_mut() {
            md5.update(data);
        }
        if let Some(sha1) = self.sha1.as_mut() {
            sha1.update(data);
        }
        if let Some(sha256) = self.sha256.as_mut() {
            sha256.update(data);
        }
    }

    fn finalize(self, digests: &mut HashDigests) {
        if let Some(md5) = self.md5 {
            let hash = md5.finalize();
            digests.md5 = format!("{hash:x}");
        }
        if let Some(sha1) = self.sha1 {
            let hash = sha1.finalize();
            digests.sha1 = format!("{hash:x}");
        }
        if let Some(sha256) = self.sha256 {
            let hash = sha256.finalize();
            digests.sha256 = format!("{hash:x}");
        }
    }
}

/// Streaming ssdeep/TLSH over the bytes passing through the pipeline
struct FuzzyTap {
    ssdeep: Option<Vec<u8>>,
    ssdeep_overflow: bool,
    tlsh: Option<TlshDefaultBuilder>,
}

impl FuzzyTap {
    fn new(fuzzy: &FuzzyHashes) -> Option<FuzzyTap> {
        if !fuzzy.any() {
            return None;
        }
        Some(FuzzyTap {
            ssdeep: fuzzy.ssdeep.then(Vec::new),
            ssdeep_overflow: false,
            tlsh: fuzzy.tlsh.then(TlshDefaultBuilder::new),
        })
    }

    fn update(&mut self, data: &[u8]) {
        if let Some(buffer) = self.ssdeep.as_mut() {
            if buffer.len() + data.len() > SSDEEP_MAX_BYTES {
                self.ssdeep = None;
                self.ssdeep_overflow = true;
            } else {
                buffer.extend_from_slice(data);
            }
        }
        if let Some(tlsh) = self.tlsh.as_mut() {
            tlsh.update(data);
        }
    }

    fn finalize(self, digests: &mut HashDigests) {
        if self.ssdeep_overflow {
            warn!("[pipeline] Sample too large for ssdeep, skipping fuzzy digest");
        }
        if let Some(buffer) = self.ssdeep {
            digests.ssdeep = FuzzyHash::new(buffer.as_slice()).to_string();
        }
        // TLSH needs enough input and entropy. Too little simply means no digest
        if let Some(tlsh) = self.tlsh {
            if let Some(hash) = tlsh.build() {
                digests.tlsh = String::from_utf8_lossy(&hash.hash()).to_string();
            }
        }
    }
}

enum PipelineSource {
    Plain(Option<ByteSource>),
    Strings {
        source: Option<ByteSource>,
        min_chars: u32,
        max_chars: u32,
    },
}

/// The per-sample read pipeline: a lazily opened byte source, an optional
/// strings transform, and optional hash taps observing the post-transform
/// bytes. The pipeline is consumed at most once; digests become available
/// when consumption completes
pub(crate) struct SamplePipeline {
    source: PipelineSource,
    crypto: Option<CryptoTap>,
    fuzzy: Option<FuzzyTap>,
    expected: u64,
    consumed: bool,
}

impl SamplePipeline {
    /// Compose the pipeline for one matching attribute. `data` is the parsed
    /// stream, `raw` the on-disk bytes when available. Strings bounds of
    /// zero inherit the global content configuration
    pub(crate) fn build(
        content: &ContentSpec,
        global_content: &ContentSpec,
        data: ByteSource,
        raw: Option<ByteSource>,
        hashes: &Hashes,
        fuzzy: &FuzzyHashes,
    ) -> Result<SamplePipeline, CollectionError> {
        let (source, expected) = match content.content_type {
            ContentType::Data => {
                let expected = data.size().unwrap_or(0);
                (PipelineSource::Plain(Some(data)), expected)
            }
            ContentType::Raw => {
                let Some(raw) = raw else {
                    error!("[pipeline] Raw content requested but no raw stream is attached");
                    return Err(CollectionError::RawStreamUnavailable);
                };
                let expected = raw.size().unwrap_or(0);
                (PipelineSource::Plain(Some(raw)), expected)
            }
            ContentType::Strings => {
                let (min_chars, max_chars) = if content.min_chars == 0 && content.max_chars == 0 {
                    (global_content.min_chars, global_content.max_chars)
                } else {
                    (content.min_chars, content.max_chars)
                };
                // Post-transform size is unknown until the stream is drained
                let source = PipelineSource::Strings {
                    source: Some(data),
                    min_chars,
                    max_chars,
                };
                (source, 0)
            }
        };

        Ok(SamplePipeline {
            source,
            crypto: CryptoTap::new(hashes),
            fuzzy: FuzzyTap::new(fuzzy),
            expected,
            consumed: false,
        })
    }

    /// Expected post-transform size when known before consumption
    pub(crate) fn size(&self) -> u64 {
        self.expected
    }

    pub(crate) fn consumed(&self) -> bool {
        self.consumed
    }

    /// Drain the pipeline into `sink`, feeding the hash taps along the way.
    /// Returns the number of post-transform bytes produced along with the
    /// final digests. A second consumption attempt is an error
    pub(crate) fn copy_to(
        &mut self,
        sink: &mut dyn Write,
    ) -> Result<(u64, HashDigests), CollectionError> {
        if self.consumed {
            return Err(CollectionError::PipelineConsumed);
        }
        self.consumed = true;

        let (source, mut scanner) = match &mut self.source {
            PipelineSource::Plain(source) => (source.take(), None),
            PipelineSource::Strings {
                source,
                min_chars,
                max_chars,
            } => (source.take(), Some(StringsScanner::new(*min_chars, *max_chars))),
        };

        let Some(source) = source else {
            return Err(CollectionError::SourceOpen);
        };
        let mut reader = match source.open() {
            Ok(result) => result,
            Err(err) => {
                error!("[pipeline] Failed to open sample source: {err:?}");
                return Err(CollectionError::SourceOpen);
            }
        };

        let mut produced = 0;
        let mut staged = Vec::new();
        let mut buffer = vec![0u8; CHUNK_SIZE];
        loop {
            let bytes = match reader.read(&mut buffer) {
                Ok(result) => result,
                Err(err) => {
                    error!("[pipeline] Failed to read sample source: {err:?}");
                    return Err(CollectionError::SourceRead);
                }
            };
            let finished = 0;
            if bytes == finished {
                break;
            }

            match scanner.as_mut() {
                Some(scanner) => {
                    scanner.feed(&buffer[0..bytes], &mut staged);
                    if !staged.is_empty() {
                        forward(&staged, &mut self.crypto, &mut self.fuzzy, sink, &mut produced)?;
                        staged.clear();
                    }
                }
                None => {
                    forward(
                        &buffer[0..bytes],
                        &mut self.crypto,
                        &mut self.fuzzy,
                        sink,
                        &mut produced,
                    )?;
                }
            }
        }

        if let Some(scanner) = scanner.as_mut() {
            scanner.finish(&mut staged);
            if !staged.is_empty() {
                forward(&staged, &mut self.crypto, &mut self.fuzzy, sink, &mut produced)?;
            }
        }

        let mut digests = HashDigests::default();
        if let Some(crypto) = self.crypto.take() {
            crypto.finalize(&mut digests);
        }
        if let Some(fuzzy) = self.fuzzy.take() {
            fuzzy.finalize(&mut digests);
        }

        Ok((produced, digests))
    }
}

/// Push one chunk of post-transform bytes through the taps and into the sink
fn forward(
    data: &[u8],
    crypto: &mut Option<CryptoTap>,
    fuzzy: &mut Option<FuzzyTap>,
    sink: &mut dyn Write,
    produced: &mut u64,
) -> Result<(), CollectionError> {
    if let Some(crypto) = crypto.as_mut() {
        crypto.update(data);
    }
    if let Some(fuzzy) = fuzzy.as_mut() {
        fuzzy.update(data);
    }

    let status = sink.write_all(data);
    if let Err(err) = status {
        error!("[pipeline] Failed to write sample bytes to sink: {err:?}");
        return Err(CollectionError::SinkWrite);
    }
    *produced += data.len() as u64;
    Ok(())
}
