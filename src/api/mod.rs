//! Purpose: Define the stable public Rust API boundary for jsonl-reduce.
//! Exports: Core types and operations needed by the CLI and embedders.
//! Role: Public, additive-only surface; hides internal parsing modules.
//! Invariants: This module is the only public path to the transfer engine.

mod file;

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::project::Projection;
pub use crate::core::reduce::{DEFAULT_MAX_RECORDS, ReduceConfig, ReduceOutcome, reduce};
pub use crate::core::sink::{ArraySink, JsonlSink, OutputFormat, RecordSink, sink_for};
pub use file::{ApiResult, ReduceOptions, ReduceReport, reduce_file};
