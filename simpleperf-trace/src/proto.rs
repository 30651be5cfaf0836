//! Protobuf records emitted by simpleperf's `report_sample.py --protobuf`
//!
//! These mirror simpleperf's `report_sample.proto` (proto2 syntax), so every
//! scalar field is optional and absent fields read back as their default.

/// One sample of a thread's call stack
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Sample {
    /// Wall clock time of the sample (perf clock by default)
    #[prost(uint64, optional, tag = "1")]
    pub time: ::core::option::Option<u64>,

    /// Kernel id of the sampled thread
    #[prost(int32, optional, tag = "2")]
    pub thread_id: ::core::option::Option<i32>,

    /// Stack frames, innermost first
    #[prost(message, repeated, tag = "3")]
    pub callchain: ::prost::alloc::vec::Vec<sample::CallChainEntry>,

    /// Number of events since the previous sample of the same type and thread
    #[prost(uint64, optional, tag = "4")]
    pub event_count: ::core::option::Option<u64>,

    /// Index into `MetaInfo::event_type`
    #[prost(uint32, optional, tag = "5")]
    pub event_type_id: ::core::option::Option<u32>,

    /// Outcome of stack unwinding, when report_sample.py was asked for it
    #[prost(message, optional, tag = "6")]
    pub unwinding_result: ::core::option::Option<sample::UnwindingResult>,
}
//
/// Nested message and enum types in `Sample`
pub mod sample {
    /// One stack frame
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CallChainEntry {
        /// Virtual address of the instruction in the ELF file
        #[prost(uint64, optional, tag = "1")]
        pub vaddr_in_file: ::core::option::Option<u64>,

        /// Id of the `File` containing the instruction
        #[prost(uint32, optional, tag = "2")]
        pub file_id: ::core::option::Option<u32>,

        /// Index in the symbol table of the `File`, or -1 if unknown
        #[prost(int32, optional, tag = "3")]
        pub symbol_id: ::core::option::Option<i32>,

        /// Kind of code this frame is running
        #[prost(
            enumeration = "call_chain_entry::ExecutionType",
            optional,
            tag = "4",
            default = "NativeMethod"
        )]
        pub execution_type: ::core::option::Option<i32>,
    }
    //
    /// Nested types in `CallChainEntry`
    pub mod call_chain_entry {
        /// Kind of code a frame is running
        #[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum ExecutionType {
            /// Native libraries, AOT-compiled JVM code, and ART methods not
            /// used near JVM methods
            NativeMethod = 0,

            /// Interpreted JVM method
            InterpretedJvmMethod = 1,

            /// JIT-compiled JVM method
            JitJvmMethod = 2,

            /// ART method used near JVM methods
            ArtMethod = 3,
        }
    }

    /// Unwinding diagnostics
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct UnwindingResult {
        /// Error code reported by libunwindstack
        #[prost(uint32, optional, tag = "1")]
        pub raw_error_code: ::core::option::Option<u32>,

        /// Address at which unwinding failed
        #[prost(uint64, optional, tag = "2")]
        pub error_addr: ::core::option::Option<u64>,

        /// Error code as interpreted by simpleperf
        #[prost(enumeration = "unwinding_result::ErrorCode", optional, tag = "3")]
        pub error_code: ::core::option::Option<i32>,
    }
    //
    /// Nested types in `UnwindingResult`
    pub mod unwinding_result {
        /// Unwinding error as interpreted by simpleperf
        #[derive(Clone, Copy, Debug, PartialEq, Eq, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum ErrorCode {
            /// No error
            ErrorNone = 0,
            /// See `raw_error_code`
            ErrorUnknown = 1,
            /// Not enough stack data was recorded
            ErrorNotEnoughStack = 2,
            /// Memory read failed
            ErrorMemoryInvalid = 3,
            /// No unwinding info in the binary
            ErrorUnwindInfo = 4,
            /// Unwinding entered an invalid map
            ErrorInvalidMap = 5,
            /// Hit the maximal number of unwound frames
            ErrorMaxFrameExceeded = 6,
            /// The last frame has the same pc/sp as the next one
            ErrorRepeatedFrame = 7,
            /// Unwinding entered an invalid ELF file
            ErrorInvalidElf = 8,
        }
    }
}

/// Sample bookkeeping, normally emitted once per trace
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LostSituation {
    /// Number of samples that were recorded
    #[prost(uint64, optional, tag = "1")]
    pub sample_count: ::core::option::Option<u64>,

    /// Number of samples that were lost
    #[prost(uint64, optional, tag = "2")]
    pub lost_count: ::core::option::Option<u64>,
}

/// Binary or library referenced by call chain entries
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct File {
    /// Unique id, as referenced by `CallChainEntry::file_id`
    #[prost(uint32, optional, tag = "1")]
    pub id: ::core::option::Option<u32>,

    /// Path on the device
    #[prost(string, optional, tag = "2")]
    pub path: ::core::option::Option<::prost::alloc::string::String>,

    /// Symbol table
    #[prost(string, repeated, tag = "3")]
    pub symbol: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,

    /// Mangled symbol table
    #[prost(string, repeated, tag = "4")]
    pub mangled_symbol: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// Thread of the profiled process
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Thread {
    /// Kernel thread id
    #[prost(uint32, optional, tag = "1")]
    pub thread_id: ::core::option::Option<u32>,

    /// Kernel process id
    #[prost(uint32, optional, tag = "2")]
    pub process_id: ::core::option::Option<u32>,

    /// Thread name
    #[prost(string, optional, tag = "3")]
    pub thread_name: ::core::option::Option<::prost::alloc::string::String>,
}

/// Global information about the recording
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct MetaInfo {
    /// Recorded event types, indexed by `Sample::event_type_id`
    #[prost(string, repeated, tag = "1")]
    pub event_type: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,

    /// Package name of the profiled app
    #[prost(string, optional, tag = "2")]
    pub app_package_name: ::core::option::Option<::prost::alloc::string::String>,

    /// debuggable, profileable or non_profileable
    #[prost(string, optional, tag = "3")]
    pub app_type: ::core::option::Option<::prost::alloc::string::String>,

    /// Android SDK version of the device
    #[prost(string, optional, tag = "4")]
    pub android_sdk_version: ::core::option::Option<::prost::alloc::string::String>,

    /// user, userdebug or eng
    #[prost(string, optional, tag = "5")]
    pub android_build_type: ::core::option::Option<::prost::alloc::string::String>,

    /// Truth that the profile was recorded with --trace-offcpu
    #[prost(bool, optional, tag = "6")]
    pub trace_offcpu: ::core::option::Option<bool>,
}

/// Thread context switch, only present when `MetaInfo::trace_offcpu` is set
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContextSwitch {
    /// Truth that the thread is switched on cpu (otherwise off cpu)
    #[prost(bool, optional, tag = "1")]
    pub switch_on: ::core::option::Option<bool>,

    /// Time of the switch, same clock as `Sample::time`
    #[prost(uint64, optional, tag = "2")]
    pub time: ::core::option::Option<u64>,

    /// Thread running on cpu
    #[prost(uint32, optional, tag = "3")]
    pub thread_id: ::core::option::Option<u32>,
}

/// Top-level record of the trace
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Record {
    /// Record payload, unset if written by a newer simpleperf
    #[prost(oneof = "record::RecordData", tags = "1, 2, 3, 4, 5, 6")]
    pub record_data: ::core::option::Option<record::RecordData>,
}
//
/// Nested types in `Record`
pub mod record {
    /// Record payload
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum RecordData {
        /// Stack sample
        #[prost(message, tag = "1")]
        Sample(super::Sample),

        /// Lost sample statistics
        #[prost(message, tag = "2")]
        Lost(super::LostSituation),

        /// Binary or library
        #[prost(message, tag = "3")]
        File(super::File),

        /// Thread description
        #[prost(message, tag = "4")]
        Thread(super::Thread),

        /// Recording metadata
        #[prost(message, tag = "5")]
        MetaInfo(super::MetaInfo),

        /// Context switch
        #[prost(message, tag = "6")]
        ContextSwitch(super::ContextSwitch),
    }
}
