//! Repair of main thread samples whose stack walk stopped short of the root

mod resolve;
mod stitch;
#[cfg(test)]
mod testing;

use self::{resolve::resolve_main_thread, stitch::stitch_main_thread};
pub use self::{
    resolve::ResolveError,
    stitch::{StitchError, StitchStats},
};
use simpleperf_trace::{FormatError, ThreadId, TraceReader, TraceWriter, WriteError};
use std::{
    fs,
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Summary of a successful repair
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RepairReport {
    /// Trace format version, carried over to the output
    pub version: u16,

    /// Id of the main thread
    pub main_thread: ThreadId,

    /// Main thread sample statistics
    pub stats: StitchStats,
}

/// Copy the `source` trace to `destination`, reattaching detached main thread
/// samples to the main thread's root along the way
///
/// The output is first written to a temporary file next to `destination`,
/// which then replaces `destination` once complete. Therefore, on failure,
/// `destination` is left as it was. On success, `destination` has the same
/// permissions as `source`.
///
pub fn fix_detached_main_samples(
    source: &Path,
    destination: &Path,
) -> Result<RepairReport, RepairError> {
    let read_error = |e| RepairError::ReadSource(source.to_path_buf(), e);
    let trace = fs::read(source).map_err(read_error)?;

    // First pass tells what a well-rooted main thread sample looks like
    let main_thread = resolve_main_thread(TraceReader::new(&trace)?)?;

    // Second pass writes the repaired trace into a temporary file
    let write_error = |e| RepairError::WriteDestination(destination.to_path_buf(), e);
    let directory = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tmpfile = NamedTempFile::new_in(directory).map_err(write_error)?;
    let permissions = fs::metadata(source).map_err(read_error)?.permissions();
    fs::set_permissions(tmpfile.path(), permissions).map_err(write_error)?;
    //
    let reader = TraceReader::new(&trace)?;
    let version = reader.version();
    let mut output = TraceWriter::new(BufWriter::new(tmpfile), version)?;
    let stats = stitch_main_thread(reader, &main_thread, &mut output)?;
    log::debug!("Wrote {} records", output.num_records());
    let tmpfile = output
        .finish()?
        .into_inner()
        .map_err(|e| write_error(e.into_error()))?;

    // Move it into place
    if destination.exists() {
        log::info!("Replacing pre-existing {}", destination.display());
    }
    tmpfile
        .persist(destination)
        .map_err(|e| write_error(e.error))?;
    Ok(RepairReport {
        version,
        main_thread: main_thread.thread_id,
        stats,
    })
}

/// What can go wrong while repairing a trace
#[derive(Debug, Error)]
pub enum RepairError {
    /// Failed to load the input trace
    #[error("failed to read {}", .0.display())]
    ReadSource(PathBuf, #[source] io::Error),

    /// The input is not a simpleperf trace
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The main thread could not be identified
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Call chains could not be stitched
    #[error(transparent)]
    Stitch(#[from] StitchError),

    /// The output trace could not be encoded
    #[error(transparent)]
    Write(#[from] WriteError),

    /// Failed to produce the output file
    #[error("failed to write {}", .0.display())]
    WriteDestination(PathBuf, #[source] io::Error),
}
