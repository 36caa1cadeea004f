use super::error::ArchiveError;
use log::{error, info};
use std::fs::{create_dir_all, File};
use std::io::{copy, Error, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::{FileOptions, SimpleFileOptions};
use zip::{AesMode, CompressionMethod, ZipWriter};

/// Streaming archive sink. Members are written in the order they are added;
/// the archive is unusable until `complete` seals it
pub(crate) struct ArchiveWriter {
    zip: ZipWriter<File>,
    path: PathBuf,
    password: Option<String>,
    compression: u32,
}

/// Member options carry a borrow of the password, so they are rebuilt for
/// every member instead of stored
fn member_options(password: &Option<String>, compression: u32) -> FileOptions<'_, ()> {
    let options: FileOptions<'_, ()> = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression as i64))
        .large_file(true);

    match password {
        Some(password) => options.with_aes_encryption(AesMode::Aes256, password),
        None => options,
    }
}

impl ArchiveWriter {
    /// Create the archive file with the requested compression level and
    /// optional AES-256 password
    pub(crate) fn open(
        path: &Path,
        password: &Option<String>,
        compression: u32,
    ) -> Result<ArchiveWriter, ArchiveError> {
        if let Some(parent) = path.parent() {
            let status = create_dir_all(parent);
            if let Err(err) = status {
                error!("[archive] Failed to create archive parent directory: {err:?}");
                return Err(ArchiveError::Create);
            }
        }

        let file = match File::create(path) {
            Ok(result) => result,
            Err(err) => {
                error!("[archive] Failed to create archive at {path:?}: {err:?}");
                return Err(ArchiveError::Create);
            }
        };

        Ok(ArchiveWriter {
            zip: ZipWriter::new(file),
            path: path.to_path_buf(),
            password: password.clone(),
            compression,
        })
    }

    /// Start a new member. Bytes written to the archive afterwards belong to
    /// this member until the next one starts
    pub(crate) fn start_member(&mut self, name: &str, display: &str) -> Result<(), ArchiveError> {
        let options = member_options(&self.password, self.compression);
        let status = self.zip.start_file(name, options);
        match status {
            Ok(_) => {
                info!("[archive] Adding {name} ({display})");
                Ok(())
            }
            Err(err) => {
                error!("[archive] Failed to start archive member {name}: {err:?}");
                Err(ArchiveError::Member)
            }
        }
    }

    /// Add a whole member from a reader
    pub(crate) fn add_stream(
        &mut self,
        name: &str,
        display: &str,
        reader: &mut dyn Read,
    ) -> Result<u64, ArchiveError> {
        self.start_member(name, display)?;
        match copy(reader, &mut self.zip) {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                error!("[archive] Failed to add archive member {name}: {err:?}");
                Err(ArchiveError::Member)
            }
        }
    }

    /// Force queued member bytes out to the backing file
    pub(crate) fn flush_queue(&mut self) -> Result<(), ArchiveError> {
        let status = self.zip.flush();
        match status {
            Ok(_) => Ok(()),
            Err(err) => {
                error!("[archive] Failed to flush archive queue: {err:?}");
                Err(ArchiveError::Flush)
            }
        }
    }

    /// Write the central directory and seal the archive
    pub(crate) fn complete(self) -> Result<(), ArchiveError> {
        let path = self.path;
        match self.zip.finish() {
            Ok(_) => {
                info!("[archive] Completed archive at {path:?}");
                Ok(())
            }
            Err(err) => {
                error!("[archive] Failed to complete archive at {path:?}: {err:?}");
                Err(ArchiveError::Complete)
            }
        }
    }
}

impl Write for ArchiveWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        self.zip.write(buf)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.zip.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::ArchiveWriter;
    use std::fs::File;
    use std::io::{Read, Write};
    use std::path::PathBuf;
    use zip::ZipArchive;

    #[test]
    fn test_archive_member_order() {
        let path = PathBuf::from("./tmp/archive_order_test.zip");
        let mut archive = ArchiveWriter::open(&path, &None, 5).unwrap();

        archive
            .add_stream("first.bin", "\\first.bin", &mut b"one".as_slice())
            .unwrap();
        archive.start_member("second.bin", "\\second.bin").unwrap();
        archive.write_all(b"two").unwrap();
        archive.flush_queue().unwrap();
        archive.complete().unwrap();

        let mut reader = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(reader.len(), 2);
        assert_eq!(reader.by_index(0).unwrap().name(), "first.bin");
        assert_eq!(reader.by_index(1).unwrap().name(), "second.bin");

        let mut content = String::new();
        reader
            .by_name("second.bin")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "two")
    }

    #[test]
    fn test_archive_with_password() {
        let path = PathBuf::from("./tmp/archive_password_test.zip");
        let password = Some(String::from("infected"));
        let mut archive = ArchiveWriter::open(&path, &password, 5).unwrap();
        archive
            .add_stream("secret.bin", "\\secret.bin", &mut b"payload".as_slice())
            .unwrap();
        archive.complete().unwrap();

        let mut reader = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut content = Vec::new();
        reader
            .by_index_decrypt(0, b"infected")
            .unwrap()
            .read_to_end(&mut content)
            .unwrap();
        assert_eq!(content, b"payload")
    }
}
