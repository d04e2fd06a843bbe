//! Purpose: Encode retained records onto an output writer.
//! Exports: `OutputFormat`, `RecordSink`, `JsonlSink`, `ArraySink`, `sink_for`.
//! Role: Output side of the transfer; the engine hands records over one at a time.
//! Invariants: JSON Lines output ends every record, including the last, with `\n`.
//! Invariants: Array output is a single indented JSON array; an empty run writes `[]`.
use std::io::Write;

use serde_json::Value;

use crate::core::error::Error;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Array,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Array => "array",
        }
    }
}

pub trait RecordSink {
    fn write_record(&mut self, value: &Value) -> Result<(), Error>;

    /// Terminate the encoding and flush the writer.
    fn finish(&mut self) -> Result<(), Error>;
}

fn write_error(err: std::io::Error) -> Error {
    Error::from_io(err, "failed to write output")
}

pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> RecordSink for JsonlSink<W> {
    fn write_record(&mut self, value: &Value) -> Result<(), Error> {
        serde_json::to_writer(&mut self.writer, value).map_err(|err| {
            Error::from_io(err.into(), "failed to encode record")
        })?;
        self.writer.write_all(b"\n").map_err(write_error)
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(write_error)
    }
}

pub struct ArraySink<W: Write> {
    writer: W,
    count: u64,
}

impl<W: Write> ArraySink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }
}

impl<W: Write> RecordSink for ArraySink<W> {
    fn write_record(&mut self, value: &Value) -> Result<(), Error> {
        let opener: &[u8] = if self.count == 0 { b"[\n" } else { b",\n" };
        self.writer.write_all(opener).map_err(write_error)?;
        let pretty = serde_json::to_string_pretty(value)
            .map_err(|err| Error::from_io(err.into(), "failed to encode record"))?;
        // Pretty output escapes newlines inside strings, so splitting on lines is safe.
        for (idx, line) in pretty.lines().enumerate() {
            if idx > 0 {
                self.writer.write_all(b"\n").map_err(write_error)?;
            }
            write!(self.writer, "  {line}").map_err(write_error)?;
        }
        self.count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        let closer: &[u8] = if self.count == 0 { b"[]\n" } else { b"\n]\n" };
        self.writer.write_all(closer).map_err(write_error)?;
        self.writer.flush().map_err(write_error)
    }
}

pub fn sink_for<'a, W: Write + 'a>(format: OutputFormat, writer: W) -> Box<dyn RecordSink + 'a> {
    match format {
        OutputFormat::Jsonl => Box::new(JsonlSink::new(writer)),
        OutputFormat::Array => Box::new(ArraySink::new(writer)),
    }
}
