//! First pass: find the main thread and the root of its call stacks

use simpleperf_trace::{
    is_main_thread, sample_thread_id, CallChainEntry, ReadError, RecordKind, Thread, ThreadId,
    TraceReader,
};
use std::collections::HashMap;
use thiserror::Error;

/// What the second pass needs to know about the main thread
#[derive(Clone, Debug, PartialEq)]
pub struct MainThread {
    /// Kernel id of the main thread (which is also the process id)
    pub thread_id: ThreadId,

    /// Outermost frame of the first main thread sample
    ///
    /// Any main thread sample whose call chain does not end with this frame
    /// is considered to have been detached from its root.
    ///
    pub root: CallChainEntry,
}

/// First sample observed for a given thread
#[derive(Debug)]
struct FirstSample {
    /// Offset of the sample record in the trace
    offset: usize,

    /// Outermost frame, if the call chain is not empty
    outermost: Option<CallChainEntry>,
}

/// Go through the whole trace once to locate the main thread and its root
pub fn resolve_main_thread(reader: TraceReader) -> Result<MainThread, ResolveError> {
    let mut threads = HashMap::<ThreadId, Thread>::new();
    let mut first_samples = HashMap::<ThreadId, FirstSample>::new();
    let mut num_records = 0usize;
    for raw in reader {
        let raw = raw?;
        num_records += 1;
        match RecordKind::of(&raw.record) {
            RecordKind::Sample(sample) => {
                first_samples
                    .entry(sample_thread_id(sample))
                    .or_insert_with(|| FirstSample {
                        offset: raw.offset,
                        outermost: sample.callchain.last().cloned(),
                    });
            }
            RecordKind::Thread(thread) => {
                if let Some(old) = threads.insert(thread.thread_id(), thread.clone()) {
                    log::warn!(
                        "Thread {} is described twice, {old:?} is superseded by {thread:?}",
                        thread.thread_id()
                    );
                }
            }
            RecordKind::Lost(lost) => {
                log::info!(
                    "Trace reports {} lost samples out of {}",
                    lost.lost_count(),
                    lost.sample_count()
                );
            }
            RecordKind::MetaInfo(meta_info) => {
                log::debug!(
                    "Trace of {:?} recording event types {:?}",
                    meta_info.app_package_name(),
                    meta_info.event_type
                );
            }
            RecordKind::File(_) | RecordKind::Other => {}
        }
    }
    log::debug!(
        "Found {num_records} records, {} threads, samples from {} threads",
        threads.len(),
        first_samples.len()
    );

    // There must be exactly one main thread
    let main_threads = threads
        .values()
        .filter(|thread| is_main_thread(thread))
        .collect::<Vec<_>>();
    let [main_thread] = main_threads.as_slice() else {
        return Err(ResolveError::MultipleOrNoMainThread(main_threads.len()));
    };
    let thread_id = main_thread.thread_id();
    log::info!(
        "Main thread is {thread_id} ({})",
        main_thread.thread_name.as_deref().unwrap_or("unnamed")
    );

    // Its first sample tells what the root of the call stack should be
    let first_sample = first_samples
        .remove(&thread_id)
        .ok_or(ResolveError::NoMainThreadSample(thread_id))?;
    let root = first_sample
        .outermost
        .ok_or(ResolveError::EmptyRootCallChain(first_sample.offset))?;
    log::debug!("Main thread call stacks should end with {root:?}");
    Ok(MainThread { thread_id, root })
}

/// What can go wrong while looking for the main thread
#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    /// The trace could not be read
    #[error(transparent)]
    Read(#[from] ReadError),

    /// There must be exactly one thread whose id is the process id
    #[error("expected exactly one main thread, found {0}")]
    MultipleOrNoMainThread(usize),

    /// The main thread was never sampled
    #[error("main thread {0} has no sample")]
    NoMainThreadSample(ThreadId),

    /// The first main thread sample has no frame to act as a root
    #[error("first main thread sample (at offset {0}) has an empty call chain")]
    EmptyRootCallChain(usize),
}
