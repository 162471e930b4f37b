//! Utility functions shared by the pipeline stages.
//!
//! ## Modules
//!
//! - [`encoding`] - Little-endian integer and word codecs for table files
//! - [`progress`] - Progress bars (no-op without the `progress` feature)

pub mod encoding;
pub mod progress;

pub use encoding::*;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Path of the file holding one table of an index.
///
/// The extension is appended rather than substituted, so an index named
/// `u8.reads` keeps its full name (`u8.reads.suf`).
pub fn index_file(index_name: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(index_name.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Directory an index lives in (`.` for bare names)
pub fn index_dir(index_name: &Path) -> PathBuf {
    match index_name.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Human-readable byte size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
