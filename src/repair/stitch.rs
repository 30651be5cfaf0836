//! Second pass: reattach detached main thread samples to their root

use super::resolve::MainThread;
use simpleperf_trace::{
    same_frame, sample_record, sample_thread_id, CallChainEntry, ReadError, RecordData, Sample,
    TraceReader, TraceWriter, WriteError,
};
use std::io::Write;
use thiserror::Error;

/// Outcome of the stitching pass
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StitchStats {
    /// Number of samples taken on the main thread
    pub main_thread_samples: usize,

    /// Number of main thread samples whose call chain was repaired
    pub repaired_samples: usize,
}

/// Record held back until the current run of detached samples is resolved
#[derive(Debug)]
enum Pending<'buf> {
    /// Detached main thread sample, along with its offset in the trace
    Detached { offset: usize, sample: Sample },

    /// Record that comes after a detached sample and goes out unchanged
    Unchanged(&'buf [u8]),
}

/// Copy a trace, reattaching detached main thread samples on the way
///
/// Main thread samples whose outermost frame is not the main thread root are
/// held back until the next well-rooted main thread sample is found. The
/// frames that this sample shares with the previous well-rooted one, starting
/// from the root, are then appended to every held back sample. Samples that are
/// still detached at the end of the trace get the whole call chain of the last
/// well-rooted sample appended instead.
///
/// All other records are copied byte for byte, and file order is preserved.
///
pub fn stitch_main_thread<'buf>(
    reader: TraceReader<'buf>,
    main_thread: &MainThread,
    output: &mut TraceWriter<impl Write>,
) -> Result<StitchStats, StitchError> {
    let mut stats = StitchStats::default();
    let mut last_valid_callchain = None::<Vec<CallChainEntry>>;
    let mut pending = Vec::<Pending<'buf>>::new();
    for raw in reader {
        let raw = raw?;
        let sample = match raw.record.record_data {
            Some(RecordData::Sample(sample))
                if sample_thread_id(&sample) == main_thread.thread_id =>
            {
                sample
            }
            _ => {
                if pending.is_empty() {
                    output.write_raw(raw.bytes)?;
                } else {
                    pending.push(Pending::Unchanged(raw.bytes));
                }
                continue;
            }
        };

        stats.main_thread_samples += 1;
        let is_rooted = sample
            .callchain
            .last()
            .is_some_and(|outermost| same_frame(outermost, &main_thread.root));
        if !is_rooted {
            stats.repaired_samples += 1;
            pending.push(Pending::Detached {
                offset: raw.offset,
                sample,
            });
            continue;
        }

        if !pending.is_empty() {
            let last_valid = prior_valid_callchain(&last_valid_callchain, &pending)?;
            let shared = shared_call_chain(last_valid, &sample.callchain);
            flush_pending(&mut pending, shared, output)?;
        }
        output.write_raw(raw.bytes)?;
        last_valid_callchain = Some(sample.callchain);
    }

    // Trailing detached samples have no next valid sample to compare with
    if !pending.is_empty() {
        let last_valid = prior_valid_callchain(&last_valid_callchain, &pending)?;
        flush_pending(&mut pending, last_valid, output)?;
    }
    Ok(stats)
}

/// Frames that two well-rooted call chains have in common, starting from the
/// root, in leaf-first order
pub fn shared_call_chain<'chain>(
    last_valid: &[CallChainEntry],
    next_valid: &'chain [CallChainEntry],
) -> &'chain [CallChainEntry] {
    let divergence_idx = last_valid
        .iter()
        .rev()
        .zip(next_valid.iter().rev())
        .take_while(|(e1, e2)| same_frame(e1, e2))
        .count();
    &next_valid[next_valid.len() - divergence_idx..]
}

/// Call chain of the last valid sample, which must exist if samples are pending
fn prior_valid_callchain<'chain>(
    last_valid_callchain: &'chain Option<Vec<CallChainEntry>>,
    pending: &[Pending],
) -> Result<&'chain [CallChainEntry], StitchError> {
    last_valid_callchain.as_deref().ok_or_else(|| {
        let offset = pending
            .iter()
            .find_map(|pending| match pending {
                Pending::Detached { offset, .. } => Some(*offset),
                Pending::Unchanged(_) => None,
            })
            .unwrap_or_default();
        StitchError::NoPriorValidSample(offset)
    })
}

/// Write out held back records, appending `shared` to detached samples
fn flush_pending(
    pending: &mut Vec<Pending>,
    shared: &[CallChainEntry],
    output: &mut TraceWriter<impl Write>,
) -> Result<(), WriteError> {
    for record in pending.drain(..) {
        match record {
            Pending::Detached { offset, mut sample } => {
                log::trace!(
                    "Reattaching sample at offset {offset} with {} frames",
                    shared.len()
                );
                sample.callchain.extend_from_slice(shared);
                output.write_record(&sample_record(sample))?;
            }
            Pending::Unchanged(bytes) => output.write_raw(bytes)?,
        }
    }
    Ok(())
}

/// What can go wrong while stitching call chains
#[derive(Debug, Error)]
pub enum StitchError {
    /// The trace could not be read
    #[error(transparent)]
    Read(#[from] ReadError),

    /// The repaired trace could not be written
    #[error(transparent)]
    Write(#[from] WriteError),

    /// A detached sample came before any well-rooted main thread sample
    #[error("detached main thread sample at offset {0} has no prior well-rooted sample")]
    NoPriorValidSample(usize),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::{
        resolve::resolve_main_thread,
        testing::{entry, frames, records, sample, thread, trace},
    };
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use simpleperf_trace::{
        proto::ContextSwitch, LostSituation, MetaInfo, Record, HEADER_LEN, INVALID_SYMBOL_ID,
    };

    /// Run both passes over a trace, return the output trace and statistics
    fn repair(input: &[u8]) -> Result<(Vec<u8>, StitchStats), StitchError> {
        let reader = TraceReader::new(input).unwrap();
        let main_thread = resolve_main_thread(reader).unwrap();
        stitch(input, &main_thread)
    }

    /// Run the stitching pass with a known main thread
    fn stitch(
        input: &[u8],
        main_thread: &MainThread,
    ) -> Result<(Vec<u8>, StitchStats), StitchError> {
        let reader = TraceReader::new(input).unwrap();
        let mut output = TraceWriter::new(Vec::new(), reader.version()).unwrap();
        let stats = stitch_main_thread(reader, main_thread, &mut output)?;
        Ok((output.finish().unwrap(), stats))
    }

    #[test]
    fn shared_call_chain() {
        let [a, b, c, d, x, y] = [1, 2, 3, 4, 5, 6].map(|symbol| entry(0, symbol));

        // Root-first [A, B, C, D] and [A, B, X, Y] share [A, B]
        let last = [d, c.clone(), b.clone(), a.clone()];
        let next = [y, x.clone(), b.clone(), a.clone()];
        assert_eq!(
            super::shared_call_chain(&last, &next),
            &[b.clone(), a.clone()][..]
        );

        // Sharing stops at the end of the shortest chain
        assert_eq!(
            super::shared_call_chain(&[a.clone()], &next),
            &[a.clone()][..]
        );
        assert_eq!(
            super::shared_call_chain(&next, &[b.clone(), a.clone()]),
            &[b.clone(), a.clone()][..]
        );

        // Sharing nothing is possible, if unexpected
        assert!(super::shared_call_chain(&[c], &[x]).is_empty());
        assert!(super::shared_call_chain(&[], &[a]).is_empty());
    }

    #[test]
    fn single_detached_sample() {
        let [root, f, g, h, other] = [1, 2, 3, 4, 5].map(|symbol| entry(0, symbol));
        let input = [
            thread(1, 1),
            sample(1, &[f.clone(), root.clone()]),
            sample(1, &[g.clone(), other.clone()]),
            sample(1, &[h.clone(), root.clone()]),
        ];
        let (output, stats) = repair(&trace(&input)).unwrap();
        assert_eq!(
            stats,
            StitchStats {
                main_thread_samples: 3,
                repaired_samples: 1,
            }
        );
        assert_eq!(
            records(&output),
            vec![
                input[0].clone(),
                input[1].clone(),
                sample(1, &[g, other, root]),
                input[3].clone(),
            ]
        );
    }

    #[test]
    fn run_of_detached_samples() {
        let [root, main, work, a, b, c] = [1, 2, 3, 4, 5, 6].map(|symbol| entry(0, symbol));
        let input = [
            thread(1, 1),
            thread(2, 1),
            sample(1, &[a.clone(), work.clone(), main.clone(), root.clone()]),
            sample(1, &[b.clone()]),
            sample(2, &[c.clone()]),
            sample(1, &[c.clone(), b.clone()]),
            sample(1, &[b.clone(), work.clone(), main.clone(), root.clone()]),
        ];
        let (output, stats) = repair(&trace(&input)).unwrap();
        assert_eq!(stats.main_thread_samples, 4);
        assert_eq!(stats.repaired_samples, 2);

        // Other threads keep their position within the detached run
        let shared = [work, main, root];
        assert_eq!(
            records(&output),
            vec![
                input[0].clone(),
                input[1].clone(),
                input[2].clone(),
                sample(1, &[&[b.clone()][..], &shared[..]].concat()),
                input[4].clone(),
                sample(1, &[&[c, b][..], &shared[..]].concat()),
                input[6].clone(),
            ]
        );
    }

    #[test]
    fn trailing_detached_samples() {
        let [root, main, work, a, b] = [1, 2, 3, 4, 5].map(|symbol| entry(0, symbol));
        let last_valid = [work.clone(), main.clone(), root.clone()];
        let input = [
            thread(1, 1),
            sample(1, &[main.clone(), root.clone()]),
            sample(1, &last_valid),
            sample(1, &[a.clone()]),
            sample(1, &[b.clone(), a.clone()]),
        ];
        let (output, stats) = repair(&trace(&input)).unwrap();
        assert_eq!(stats.repaired_samples, 2);
        assert_eq!(
            records(&output),
            vec![
                input[0].clone(),
                input[1].clone(),
                input[2].clone(),
                sample(1, &[&[a.clone()][..], &last_valid[..]].concat()),
                sample(1, &[&[b, a][..], &last_valid[..]].concat()),
            ]
        );
    }

    #[test]
    fn unresolved_symbols_compare_by_address() {
        let root = entry(0, 1);
        let mut unknown = entry(3, INVALID_SYMBOL_ID);
        let mut elsewhere = unknown.clone();
        unknown.vaddr_in_file = Some(0x1000);
        elsewhere.vaddr_in_file = Some(0x2000);
        let (detached, valid) = (entry(0, 4), entry(0, 5));

        let input = [
            thread(1, 1),
            sample(1, &[valid.clone(), unknown.clone(), root.clone()]),
            sample(1, &[detached.clone(), elsewhere.clone()]),
            sample(1, &[valid.clone(), elsewhere.clone(), root.clone()]),
        ];
        let (output, _stats) = repair(&trace(&input)).unwrap();
        assert_eq!(records(&output)[2], sample(1, &[detached, elsewhere, root]));
    }

    #[test]
    fn rooted_trace_is_unchanged() {
        let [root, a, b] = [1, 2, 3].map(|symbol| entry(0, symbol));
        let input = trace(&[
            thread(1, 1),
            thread(2, 1),
            sample(1, &[a.clone(), root.clone()]),
            sample(2, &[b.clone()]),
            sample(1, &[b, a, root.clone()]),
            sample(1, &[root]),
        ]);
        let (output, stats) = repair(&input).unwrap();
        assert_eq!(stats.main_thread_samples, 3);
        assert_eq!(stats.repaired_samples, 0);
        assert_eq!(output, input);
    }

    #[test]
    fn detached_before_any_valid_sample() {
        let [root, a] = [1, 2].map(|symbol| entry(0, symbol));
        let input = trace(&[
            thread(1, 1),
            sample(1, &[a.clone()]),
            sample(1, &[a.clone(), root.clone()]),
        ]);
        let main_thread = MainThread { thread_id: 1, root };
        let detached_offset = HEADER_LEN + 4 + frames(&input)[0].len();
        assert_matches!(
            stitch(&input, &main_thread),
            Err(StitchError::NoPriorValidSample(offset)) if offset == detached_offset
        );
    }

    #[test]
    fn detached_without_any_valid_sample() {
        let [root, a, b] = [1, 2, 3].map(|symbol| entry(0, symbol));
        let input = trace(&[
            thread(1, 1),
            sample(1, &[a.clone()]),
            thread(2, 1),
            sample(1, &[b, a]),
        ]);
        let main_thread = MainThread { thread_id: 1, root };
        let first_detached_offset = HEADER_LEN + 4 + frames(&input)[0].len();
        assert_matches!(
            stitch(&input, &main_thread),
            Err(StitchError::NoPriorValidSample(offset)) if offset == first_detached_offset
        );
    }

    #[test]
    fn empty_call_chain_is_detached() {
        let root = entry(0, 1);
        let input = [
            thread(1, 1),
            sample(1, &[root.clone()]),
            sample(1, &[]),
            sample(1, &[root.clone()]),
        ];
        let (output, stats) = repair(&trace(&input)).unwrap();
        assert_eq!(stats.repaired_samples, 1);
        assert_eq!(records(&output)[2], sample(1, &[root]));
    }

    /// Strategy for generating simple call chains
    fn callchain() -> impl Strategy<Value = Vec<CallChainEntry>> {
        prop::collection::vec(
            (0u32..2, -1i32..2, 0u64..2).prop_map(|(file_id, symbol_id, vaddr)| {
                let mut frame = entry(file_id, symbol_id);
                frame.vaddr_in_file = Some(vaddr);
                frame
            }),
            0..5,
        )
    }

    proptest! {
        #[test]
        fn every_main_sample_ends_up_rooted(
            samples in prop::collection::vec((any::<bool>(), callchain()), 1..20)
        ) {
            // First main thread sample needs a root
            let first_main = samples.iter().find(|(is_main, _)| *is_main);
            prop_assume!(first_main.is_some_and(|(_, chain)| !chain.is_empty()));

            let mut input = vec![thread(1, 1), thread(2, 1)];
            input.extend(samples.iter().map(|(is_main, chain)| {
                sample(if *is_main { 1 } else { 2 }, chain)
            }));
            let input_trace = trace(&input);
            let main_thread = resolve_main_thread(TraceReader::new(&input_trace).unwrap()).unwrap();
            let (output_trace, stats) = stitch(&input_trace, &main_thread).unwrap();
            let output = records(&output_trace);

            prop_assert_eq!(output.len(), input.len());
            let mut num_main = 0;
            let mut num_repaired = 0;
            for (before, after) in input.iter().zip(&output) {
                let (Some(RecordData::Sample(before)), Some(RecordData::Sample(after))) =
                    (&before.record_data, &after.record_data)
                else {
                    prop_assert_eq!(before, after);
                    continue;
                };
                prop_assert_eq!(before.thread_id, after.thread_id);
                if before.thread_id != Some(1) {
                    prop_assert_eq!(before, after);
                    continue;
                }
                num_main += 1;
                if before != after {
                    num_repaired += 1;
                }
                prop_assert!(after.callchain.starts_with(&before.callchain));
                let outermost = after.callchain.last().unwrap();
                prop_assert!(same_frame(outermost, &main_thread.root));
            }
            prop_assert_eq!(stats.main_thread_samples, num_main);
            prop_assert_eq!(stats.repaired_samples, num_repaired);
        }
    }

    #[test]
    fn other_records_are_copied_verbatim() {
        let root = entry(0, 1);
        let input = trace(&[
            thread(1, 1),
            Record {
                record_data: Some(RecordData::MetaInfo(MetaInfo {
                    event_type: vec!["cpu-clock".into()],
                    ..Default::default()
                })),
            },
            sample(1, &[root.clone()]),
            sample(1, &[entry(0, 2)]),
            Record {
                record_data: Some(RecordData::Lost(LostSituation {
                    sample_count: Some(10),
                    lost_count: Some(1),
                })),
            },
            Record {
                record_data: Some(RecordData::ContextSwitch(ContextSwitch {
                    switch_on: Some(true),
                    time: Some(42),
                    thread_id: Some(1),
                })),
            },
        ]);
        let (output, stats) = repair(&input).unwrap();
        assert_eq!(stats.repaired_samples, 1);

        let (input, output) = (frames(&input), frames(&output));
        assert_eq!(input.len(), output.len());
        for (idx, (before, after)) in input.iter().zip(&output).enumerate() {
            if idx == 3 {
                assert!(after.len() > before.len());
            } else {
                assert_eq!(before, after);
            }
        }
    }
}
