//! Helpers for building and inspecting traces in tests

use simpleperf_trace::{
    sample_record, CallChainEntry, Record, RecordData, Sample, Thread, TraceReader, TraceWriter,
};

/// Call chain entry with a resolved symbol
pub fn entry(file_id: u32, symbol_id: i32) -> CallChainEntry {
    CallChainEntry {
        vaddr_in_file: Some(0),
        file_id: Some(file_id),
        symbol_id: Some(symbol_id),
        execution_type: None,
    }
}

/// Sample record
pub fn sample(thread_id: i32, callchain: &[CallChainEntry]) -> Record {
    sample_record(Sample {
        thread_id: Some(thread_id),
        callchain: callchain.to_vec(),
        ..Sample::default()
    })
}

/// Thread record
pub fn thread(thread_id: u32, process_id: u32) -> Record {
    Record {
        record_data: Some(RecordData::Thread(Thread {
            thread_id: Some(thread_id),
            process_id: Some(process_id),
            thread_name: Some(format!("thread-{thread_id}")),
        })),
    }
}

/// Complete version 1 trace
pub fn trace(records: &[Record]) -> Vec<u8> {
    let mut writer = TraceWriter::new(Vec::new(), 1).unwrap();
    for record in records {
        writer.write_record(record).unwrap();
    }
    writer.finish().unwrap()
}

/// Decoded records of a trace
pub fn records(trace: &[u8]) -> Vec<Record> {
    TraceReader::new(trace)
        .unwrap()
        .map(|raw| raw.unwrap().record)
        .collect()
}

/// Encoded records of a trace
pub fn frames(trace: &[u8]) -> Vec<&[u8]> {
    TraceReader::new(trace)
        .unwrap()
        .map(|raw| raw.unwrap().bytes)
        .collect()
}
