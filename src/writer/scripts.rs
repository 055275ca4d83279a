//! Write every compiled bundle below the output directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::model::CompileOutput;

/// Write each output, keeping its path relative to `entry_dir`. Outputs
/// from outside that directory land at the top of `out_dir`.
pub fn emit(outputs: &CompileOutput, entry_dir: &Path, out_dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(outputs.len());
    for (target, code) in outputs {
        let path = out_dir.join(relative_path(Path::new(target), entry_dir));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, code)?;
        info!(path = %path.display(), bytes = code.len(), "wrote output");
        written.push(path);
    }
    Ok(written)
}

fn relative_path(target: &Path, entry_dir: &Path) -> PathBuf {
    match target.strip_prefix(entry_dir) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => target.file_name().map(PathBuf::from).unwrap_or_default(),
    }
}
