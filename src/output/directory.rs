use super::error::LocalError;
use log::error;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

/// Create the output directory tree for a directory sink
pub(crate) fn create_output_dir(path: &Path) -> Result<(), LocalError> {
    let result = create_dir_all(path);
    match result {
        Ok(_) => Ok(()),
        Err(err) => {
            error!("[directory] Failed to create output directory for {path:?}. Error: {err:?}");
            Err(LocalError::CreateDirectory)
        }
    }
}

/// Map a sample name to a path under the output directory. Sample names use
/// backslash-separated components, which become subdirectories locally
pub(crate) fn sample_file_path(dir: &Path, sample_name: &str) -> PathBuf {
    let mut path = dir.to_path_buf();
    for part in sample_name.split('\\') {
        path.push(part);
    }
    path
}

/// Create the file a sample payload is copied into, including any spec
/// subdirectory components
pub(crate) fn create_sample_file(dir: &Path, sample_name: &str) -> Result<File, LocalError> {
    let path = sample_file_path(dir, sample_name);
    if let Some(parent) = path.parent() {
        let status = create_dir_all(parent);
        if let Err(err) = status {
            error!("[directory] Failed to create sample directory for {path:?}. Error: {err:?}");
            return Err(LocalError::CreateDirectory);
        }
    }

    match File::create(&path) {
        Ok(result) => Ok(result),
        Err(err) => {
            error!("[directory] Failed to create sample file {path:?}. Error: {err:?}");
            Err(LocalError::CreateFile)
        }
    }
}
