//! Purpose: Path-level entrypoint for the bounded record transfer.
//! Exports: `ReduceOptions`, `ReduceReport`, `reduce_file`.
//! Role: Owns file handles around `core::reduce`; mirrors what the CLI needs.
//! Invariants: The input is opened before any output is staged.
//! Invariants: Output is staged beside the destination and renamed into place only on success.
//! Invariants: Every handle is scoped; failure paths drop (and delete) the staged file.
//! Invariants: Input and output may be the same path; reading ends before the rename.
#![allow(clippy::result_large_err)]

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::core::error::{Error, ErrorKind};
use crate::core::project::Projection;
use crate::core::reduce::{DEFAULT_MAX_RECORDS, ReduceConfig, reduce};
use crate::core::sink::{OutputFormat, sink_for};

pub type ApiResult<T> = Result<T, Error>;

#[derive(Clone, Debug)]
pub struct ReduceOptions {
    pub max_records: u64,
    pub format: OutputFormat,
    pub projection: Projection,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self {
            max_records: DEFAULT_MAX_RECORDS,
            format: OutputFormat::Jsonl,
            projection: Projection::default(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReduceReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub max_records: u64,
    pub records: u64,
    pub bound_reached: bool,
    pub format: OutputFormat,
}

/// Copy the first `options.max_records` records of `input` into `output`.
///
/// `output` is created or replaced only when the whole run succeeds; on any
/// error it is left exactly as it was.
pub fn reduce_file(
    input: &Path,
    output: &Path,
    options: &ReduceOptions,
) -> ApiResult<ReduceReport> {
    let source = File::open(input)
        .map_err(|err| Error::from_io(err, "failed to open input").with_path(input))?;
    let is_dir = source
        .metadata()
        .map_err(|err| Error::from_io(err, "failed to stat input").with_path(input))?
        .is_dir();
    if is_dir {
        return Err(Error::new(ErrorKind::Io)
            .with_message("input is a directory")
            .with_path(input));
    }
    tracing::debug!(input = %input.display(), "opened input");

    let mut staged = NamedTempFile::new_in(staging_dir(output))
        .map_err(|err| Error::from_io(err, "failed to stage output").with_path(output))?;
    tracing::debug!(staged = %staged.path().display(), "staged output");

    let config = ReduceConfig {
        max_records: options.max_records,
        ..ReduceConfig::default()
    };
    let outcome = {
        let mut writer = BufWriter::new(staged.as_file_mut());
        let mut sink = sink_for(options.format, &mut writer);
        let outcome = reduce(BufReader::new(source), config, |value| {
            sink.write_record(&options.projection.apply(value))
        })
        .map_err(|err| attach_input_path(err, input))?;
        sink.finish().map_err(|err| err.with_path(output))?;
        outcome
    };

    carry_permissions(&staged, output)?;
    staged.persist(output).map_err(|err| {
        Error::from_io(err.error, "failed to replace output").with_path(output)
    })?;
    tracing::debug!(output = %output.display(), records = outcome.records, "persisted output");

    Ok(ReduceReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        max_records: options.max_records,
        records: outcome.records,
        bound_reached: outcome.bound_reached,
        format: options.format,
    })
}

fn attach_input_path(err: Error, input: &Path) -> Error {
    if err.path().is_some() || err.kind() != ErrorKind::Malformed {
        return err;
    }
    err.with_path(input)
}

fn staging_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn carry_permissions(staged: &NamedTempFile, output: &Path) -> ApiResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = match fs::metadata(output) {
        Ok(meta) => meta.permissions(),
        Err(_) => fs::Permissions::from_mode(0o644),
    };
    staged
        .as_file()
        .set_permissions(permissions)
        .map_err(|err| Error::from_io(err, "failed to set output permissions").with_path(output))
}

#[cfg(not(unix))]
fn carry_permissions(_staged: &NamedTempFile, _output: &Path) -> ApiResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ReduceOptions, reduce_file};
    use crate::core::error::ErrorKind;
    use crate::core::project::Projection;
    use crate::core::sink::OutputFormat;
    use serde_json::Value;
    use std::fs;
    use std::path::Path;

    fn write_lines(path: &Path, lines: &[&str]) {
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(path, text).expect("write input");
    }

    fn read_values(path: &Path) -> Vec<Value> {
        fs::read_to_string(path)
            .expect("read output")
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect()
    }

    fn options(max_records: u64) -> ReduceOptions {
        ReduceOptions {
            max_records,
            ..ReduceOptions::default()
        }
    }

    #[test]
    fn keeps_prefix_and_reports_counts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &[r#"{"a":1}"#, r#"{"a":2}"#, r#"{"a":3}"#, r#"{"a":4}"#, r#"{"a":5}"#]);

        let report = reduce_file(&input, &output, &options(3)).expect("reduce");
        assert_eq!(report.records, 3);
        assert!(report.bound_reached);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "{\"a\":1}\n{\"a\":2}\n{\"a\":3}\n"
        );
    }

    #[test]
    fn bound_equal_and_above_line_count_copy_everything() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        write_lines(&input, &[r#"{"k":[1,2]}"#, "null", r#""s""#]);
        let expected = read_values(&input);

        for max in [3, 1000] {
            let output = temp.path().join(format!("out-{max}.jsonl"));
            let report = reduce_file(&input, &output, &options(max)).expect("reduce");
            assert_eq!(report.records, 3);
            assert_eq!(read_values(&output), expected);
        }
    }

    #[test]
    fn zero_bound_writes_empty_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["1", "2"]);

        let report = reduce_file(&input, &output, &options(0)).expect("reduce");
        assert_eq!(report.records, 0);
        assert_eq!(fs::read(&output).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn overwrites_existing_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["1"]);
        fs::write(&output, "stale\nstale\nstale\n").unwrap();

        reduce_file(&input, &output, &options(10)).expect("reduce");
        assert_eq!(fs::read_to_string(&output).unwrap(), "1\n");
    }

    #[test]
    fn malformed_input_leaves_no_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["1", "{broken", "3"]);

        let err = reduce_file(&input, &output, &options(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.path(), Some(input.as_path()));
        assert!(!output.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn malformed_input_keeps_previous_output() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["not json"]);
        fs::write(&output, "{\"keep\":true}\n").unwrap();

        reduce_file(&input, &output, &options(10)).unwrap_err();
        assert_eq!(fs::read_to_string(&output).unwrap(), "{\"keep\":true}\n");
    }

    #[test]
    fn missing_input_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("absent.jsonl");
        let output = temp.path().join("out.jsonl");

        let err = reduce_file(&input, &output, &options(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!output.exists());
    }

    #[test]
    fn missing_output_directory_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("nope").join("out.jsonl");
        write_lines(&input, &["1"]);

        let err = reduce_file(&input, &output, &options(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.path(), Some(output.as_path()));
    }

    #[test]
    fn in_place_reduction_keeps_prefix() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("data.jsonl");
        write_lines(&path, &[r#"{"a":1}"#, r#"{"a":2}"#, r#"{"a":3}"#, r#"{"a":4}"#]);

        let report = reduce_file(&path, &path, &options(2)).expect("reduce");
        assert_eq!(report.records, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\":1}\n{\"a\":2}\n");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn number_text_passes_through_unchanged() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        let lines = [
            r#"{"id":123456789012345678901234567890}"#,
            "18446744073709551616",
            "-8.551274266649146e+253",
            "1.1332979587418515e-159",
            "0.1000000000000000055511151231257827",
            "1e400",
            r#"[-0.0,5e-324,1.7976931348623157e308,1E5]"#,
        ];
        write_lines(&input, &lines);

        reduce_file(&input, &output, &options(100)).expect("reduce");
        let mut expected = lines.join("\n");
        expected.push('\n');
        assert_eq!(fs::read_to_string(&output).unwrap(), expected);
    }

    #[test]
    fn every_bound_copies_the_exact_prefix() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let corpus = [
            r#"{"z":1,"a":{"nested":[1,[2,[3,{"deep":null}]]]},"m":true}"#,
            r#""café 😀 tab	 quote" slash\ nl
 ctl""#,
            "3.141592653589793238462643383279",
            "-12345678901234567890123",
            r#"[]"#,
            r#"{}"#,
            "false",
            r#"{"k":"","v":[0.5,-1e-7,2.5E+10]}"#,
        ];
        // Canonical compact lines round-trip byte for byte.
        let corpus: Vec<String> = corpus
            .iter()
            .map(|line| {
                let value: Value = serde_json::from_str(line).expect("corpus line");
                serde_json::to_string(&value).expect("encode")
            })
            .collect();
        let lines: Vec<&str> = corpus.iter().map(String::as_str).collect();
        write_lines(&input, &lines);

        for max in 0..=lines.len() as u64 + 2 {
            let output = temp.path().join(format!("out-{max}.jsonl"));
            let report = reduce_file(&input, &output, &options(max)).expect("reduce");
            let kept = (max as usize).min(lines.len());
            assert_eq!(report.records, kept as u64);

            let text = fs::read_to_string(&output).unwrap();
            let expected: String = lines[..kept].iter().map(|line| format!("{line}\n")).collect();
            assert_eq!(text, expected, "bound {max}");

            let reparsed: Vec<Value> = text
                .lines()
                .map(|line| serde_json::from_str(line).expect("output line"))
                .collect();
            assert_eq!(reparsed, read_values(&input)[..kept].to_vec());
        }
    }

    #[test]
    fn escaped_input_reparses_to_equal_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(
            &input,
            &[
                r#"{ "s" : "é😀\/" , "n" : [ 1 , 2.50 ] }"#,
                r#"  "A"  "#,
            ],
        );

        reduce_file(&input, &output, &options(10)).expect("reduce");
        assert_eq!(read_values(&output), read_values(&input));
    }

    #[cfg(unix)]
    fn chmod(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("chmod");
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_input_is_permission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["1"]);
        chmod(&input, 0o000);
        if fs::File::open(&input).is_ok() {
            // Running with privileges that bypass mode bits.
            chmod(&input, 0o644);
            return;
        }

        let err = reduce_file(&input, &output, &options(10)).unwrap_err();
        chmod(&input, 0o644);
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.path(), Some(input.as_path()));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_output_directory_is_permission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        let output = locked.join("out.jsonl");
        write_lines(&input, &["1"]);
        chmod(&locked, 0o500);
        if fs::write(locked.join("check"), b"").is_ok() {
            chmod(&locked, 0o700);
            return;
        }

        let err = reduce_file(&input, &output, &options(10)).unwrap_err();
        chmod(&locked, 0o700);
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.path(), Some(output.as_path()));
        assert!(!output.exists());
    }

    #[test]
    fn array_format_with_projection() {
        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("sample.json");
        write_lines(
            &input,
            &[
                r#"{"business_id":"b1","name":"Cafe","stars":4.5}"#,
                r#"{"business_id":"b2","name":"Deli","stars":3.0}"#,
            ],
        );

        let opts = ReduceOptions {
            max_records: 10,
            format: OutputFormat::Array,
            projection: Projection::new(vec!["business_id".into(), "stars".into()]),
        };
        let report = reduce_file(&input, &output, &opts).expect("reduce");
        assert_eq!(report.format, OutputFormat::Array);

        let text = fs::read_to_string(&output).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&text).expect("array");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1]["business_id"], "b2");
        assert!(parsed[0].get("name").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn new_output_gets_regular_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let input = temp.path().join("in.jsonl");
        let output = temp.path().join("out.jsonl");
        write_lines(&input, &["1"]);

        reduce_file(&input, &output, &options(1)).expect("reduce");
        let mode = fs::metadata(&output).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }
}
