use super::error::UtilsError;
use crate::utils::uuid::generate_uuid;
use log::error;
use std::fs::{remove_file, File, OpenOptions};
use std::io::{Cursor, Error, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// A temporary stream that buffers in memory and spills to a uniquely named
/// file in the chosen directory once the threshold is exceeded. The backing
/// file is removed when the stream is dropped.
#[derive(Debug)]
pub(crate) struct SpoolStream {
    state: SpoolState,
    threshold: usize,
    dir: PathBuf,
    hint: String,
    written: u64,
}

#[derive(Debug)]
enum SpoolState {
    Memory(Cursor<Vec<u8>>),
    Disk { file: File, path: PathBuf },
}

impl SpoolStream {
    /// Create a spool stream. No file is touched until the memory threshold is reached
    pub(crate) fn create(dir: &Path, hint: &str, threshold: usize) -> SpoolStream {
        SpoolStream {
            state: SpoolState::Memory(Cursor::new(Vec::new())),
            threshold,
            dir: dir.to_path_buf(),
            hint: hint.to_string(),
            written: 0,
        }
    }

    /// Total number of bytes written to the stream
    pub(crate) fn len(&self) -> u64 {
        self.written
    }

    /// Seek back to the start so the content can be read out
    pub(crate) fn rewind(&mut self) -> Result<(), UtilsError> {
        let status = match &mut self.state {
            SpoolState::Memory(cursor) => cursor.seek(SeekFrom::Start(0)),
            SpoolState::Disk { file, .. } => file.seek(SeekFrom::Start(0)),
        };
        match status {
            Ok(_) => Ok(()),
            Err(err) => {
                error!("[spool] Failed to rewind spool stream: {err:?}");
                Err(UtilsError::SpoolRewind)
            }
        }
    }

    /// Move the buffered bytes into a backing file once the threshold is hit
    fn spill(&mut self) -> Result<(), Error> {
        let buffer = match &mut self.state {
            SpoolState::Memory(cursor) => std::mem::take(cursor.get_mut()),
            SpoolState::Disk { .. } => return Ok(()),
        };

        let path = self.dir.join(format!("{}-{}.tmp", self.hint, generate_uuid()));
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;
        file.write_all(&buffer)?;

        self.state = SpoolState::Disk { file, path };
        Ok(())
    }
}

impl Write for SpoolStream {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let needs_spill = match &self.state {
            SpoolState::Memory(cursor) => cursor.get_ref().len() + buf.len() > self.threshold,
            SpoolState::Disk { .. } => false,
        };
        if needs_spill {
            self.spill()?;
        }

        let bytes = match &mut self.state {
            SpoolState::Memory(cursor) => cursor.write(buf)?,
            SpoolState::Disk { file, .. } => file.write(buf)?,
        };
        self.written += bytes as u64;
        Ok(bytes)
    }

    fn flush(&mut self) -> Result<(), Error> {
        match &mut self.state {
            SpoolState::Memory(_) => Ok(()),
            SpoolState::Disk { file, .. } => file.flush(),
        }
    }
}

impl Read for SpoolStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match &mut self.state {
            SpoolState::Memory(cursor) => cursor.read(buf),
            SpoolState::Disk { file, .. } => file.read(buf),
        }
    }
}

impl Drop for SpoolStream {
    fn drop(&mut self) {
        if let SpoolState::Disk { path, .. } = &self.state {
            let _ = remove_file(path);
        }
    }
}

/// A clonable handle over a `SpoolStream` so the same buffer can serve as a
/// log target while another owner reads it back during finalization
#[derive(Clone)]
pub(crate) struct SharedSpool {
    inner: Arc<Mutex<SpoolStream>>,
}

impl SharedSpool {
    pub(crate) fn create(dir: &Path, hint: &str, threshold: usize) -> SharedSpool {
        SharedSpool {
            inner: Arc::new(Mutex::new(SpoolStream::create(dir, hint, threshold))),
        }
    }

    pub(crate) fn len(&self) -> u64 {
        match self.inner.lock() {
            Ok(stream) => stream.len(),
            Err(_) => 0,
        }
    }

    pub(crate) fn rewind(&self) -> Result<(), UtilsError> {
        match self.inner.lock() {
            Ok(mut stream) => stream.rewind(),
            Err(_) => Err(UtilsError::SpoolRewind),
        }
    }
}

impl Write for SharedSpool {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let mut stream = self.inner.lock().map_err(poisoned_lock)?;
        stream.write(buf)
    }

    fn flush(&mut self) -> Result<(), Error> {
        let mut stream = self.inner.lock().map_err(poisoned_lock)?;
        stream.flush()
    }
}

impl Read for SharedSpool {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut stream = self.inner.lock().map_err(poisoned_lock)?;
        stream.read(buf)
    }
}

fn poisoned_lock<T>(_err: T) -> Error {
    Error::new(ErrorKind::Other, "spool lock poisoned")
}
