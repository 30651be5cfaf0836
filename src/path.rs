//! Output file naming

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Suffix that distinguishes the repaired trace from its source
const FIXED_SUFFIX: &str = "-fixed";

/// Where the repaired version of a trace should go
///
/// The suffix goes before the file extension (`trace.data` becomes
/// `trace-fixed.data`), or at the end if there is no extension.
///
pub fn destination_path(source: &Path) -> PathBuf {
    let mut file_name = source.file_stem().map(OsString::from).unwrap_or_default();
    file_name.push(FIXED_SUFFIX);
    if let Some(extension) = source.extension() {
        file_name.push(".");
        file_name.push(extension);
    }
    source.with_file_name(file_name)
}
