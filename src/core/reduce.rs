//! Purpose: Copy the first N line-delimited JSON records from a reader to a consumer.
//! Exports: `ReduceConfig`, `ReduceOutcome`, `reduce`, `DEFAULT_MAX_RECORDS`.
//! Role: Transfer engine behind `api::reduce_file`; knows nothing about paths.
//! Invariants: At most `max_records` lines are read; the rest of the input is never touched.
//! Invariants: Every physical line is one record; a line that does not decode aborts the run.
//! Invariants: One record in flight; memory does not grow with the bound.
use std::io::BufRead;

use bstr::ByteSlice;
use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::json::parse;

pub const DEFAULT_MAX_RECORDS: u64 = 1000;

#[derive(Copy, Clone, Debug)]
pub struct ReduceConfig {
    pub max_records: u64,
    pub max_snippet_bytes: usize,
}

impl Default for ReduceConfig {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            max_snippet_bytes: 80,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ReduceOutcome {
    pub records: u64,
    pub bound_reached: bool,
}

/// Decode up to `config.max_records` lines from `reader`, handing each record
/// to `on_record` in input order. Stops at the bound or at end of input.
pub fn reduce<R, F>(
    mut reader: R,
    config: ReduceConfig,
    mut on_record: F,
) -> Result<ReduceOutcome, Error>
where
    R: BufRead,
    F: FnMut(Value) -> Result<(), Error>,
{
    let mut outcome = ReduceOutcome::default();
    let mut buf = Vec::new();
    while outcome.records < config.max_records {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|err| Error::from_io(err, "failed to read input"))?;
        if read == 0 {
            break;
        }
        let line_no = outcome.records + 1;
        let value = decode_line(&buf, line_no, config.max_snippet_bytes)?;
        on_record(value)?;
        outcome.records = line_no;
    }
    outcome.bound_reached = outcome.records == config.max_records;
    tracing::debug!(
        records = outcome.records,
        bound_reached = outcome.bound_reached,
        "reduce finished"
    );
    Ok(outcome)
}

fn decode_line(raw: &[u8], line_no: u64, max_snippet_bytes: usize) -> Result<Value, Error> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(err) => {
            let snippet = truncate_snippet(&raw.to_str_lossy(), max_snippet_bytes);
            return Err(Error::new(ErrorKind::Malformed)
                .with_message(format!("line {line_no} is not valid UTF-8"))
                .with_hint(format!(
                    "parse category: {}; context: line {line_no}: {snippet}",
                    parse::ParseFailureCategory::Utf8.as_str()
                ))
                .with_line(line_no)
                .with_source(err));
        }
    };
    parse::from_str::<Value>(text).map_err(|err| {
        let snippet = truncate_snippet(text, max_snippet_bytes);
        let context = format!("line {line_no}: {snippet}");
        Error::new(ErrorKind::Malformed)
            .with_message(format!("invalid json on line {line_no}"))
            .with_hint(parse::hint_for_error(&err, &context))
            .with_line(line_no)
            .with_source(err)
    })
}

fn truncate_snippet(input: &str, max: usize) -> String {
    if input.len() <= max {
        return input.to_string();
    }
    let suffix = "...";
    if max <= suffix.len() {
        return suffix[..max].to_string();
    }
    let mut take = max - suffix.len();
    while !input.is_char_boundary(take) {
        take -= 1;
    }
    format!("{}{suffix}", &input[..take])
}
