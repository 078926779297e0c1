use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;

/// Create parent directories for a path when missing.
pub fn make_parent_dirs<P: AsRef<Path>>(path: P) -> io::Result<()> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Detect whether a path uses a gzip/BGZF-compatible extension.
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        path.as_ref().extension().unwrap_or_else(|| OsStr::new("")),
        ext if ext == "gz" || ext == "gzip" || ext == "bgz" || ext == "bgzf"
    )
}

/// Returns `true` for the conventional stdin/stdout placeholder.
#[inline]
pub fn is_stdio<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref() == Path::new("-")
}
