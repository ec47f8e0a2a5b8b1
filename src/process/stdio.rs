//! Line-in / tagged-block-out stdio protocol.
//!
//! The child gets one JSON line on stdin carrying `meta.dataTag`. Anything it
//! prints to stdout outside `<tag>…<tag>` is log output; the tagged block is
//! the JSON result. Text on stderr is the user-facing error.

use std::{process::Stdio, time::{Duration, Instant}};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

use super::ProcessSpawner;
use crate::{
    context::{ExecutionOutput, ProcessInput},
    error::ProcessError,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct StdioSpawner;

#[async_trait]
impl ProcessSpawner for StdioSpawner {
    async fn spawn(
        &self,
        program: &str,
        args: &[String],
        input: &ProcessInput,
        limit: Duration,
    ) -> Result<ExecutionOutput, ProcessError> {
        let tag = new_data_tag();
        let mut payload = serde_json::to_string(&json!({
            "meta": { "dataTag": tag },
            "context": input.context,
            "code": input.code,
            "files": input.files,
        }))?;
        payload.push('\n');

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;
        log::debug!("spawned {} {} (pid {:?})", program, args.join(" "), child.id());

        let run = async move {
            if let Some(mut stdin) = child.stdin.take() {
                // A child that exits before reading still has its stderr collected below.
                match stdin.write_all(payload.as_bytes()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    Err(e) => return Err(ProcessError::Io(e)),
                }
            }
            child.wait_with_output().await.map_err(ProcessError::Io)
        };

        // Dropping the future on timeout drops the child, which kills it.
        let out = match timeout(limit, run).await {
            Ok(res) => res?,
            Err(_) => {
                let timeout_ms = limit.as_millis() as u64;
                log::warn!("{program} exceeded {timeout_ms}ms, killed");
                return Err(ProcessError::Timeout { timeout_ms });
            }
        };
        let elapsed = started.elapsed().as_millis() as u64;

        let stdout = String::from_utf8_lossy(&out.stdout);
        let stderr = String::from_utf8_lossy(&out.stderr);
        if !out.status.success() {
            log::warn!("{program} exited with {:?}", out.status.code());
            return Err(ProcessError::Exited {
                code: out.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let mut output = parse_stdout(&stdout, &tag, stderr.trim())?;
        output.execution_time_ms = elapsed;
        log::debug!("{program} finished in {elapsed}ms");
        Ok(output)
    }
}

fn new_data_tag() -> String {
    format!("__data_{}__", uuid::Uuid::new_v4().simple())
}

pub(crate) fn parse_stdout(
    stdout: &str,
    tag: &str,
    stderr: &str,
) -> Result<ExecutionOutput, ProcessError> {
    let error = (!stderr.is_empty()).then(|| stderr.to_string());

    let (result, rest) = match split_tagged(stdout, tag) {
        Some((before, data, after)) => {
            let value: Value = serde_json::from_str(data)
                .map_err(|e| ProcessError::Protocol(format!("result is not JSON: {e}")))?;
            (value, format!("{before}{after}"))
        }
        None if error.is_some() => (Value::Null, stdout.to_string()),
        None => {
            return Err(ProcessError::Protocol(
                "interpreter produced no result block".into(),
            ))
        }
    };

    // `lines` drops only the empty piece after a final newline.
    let log = rest.lines().map(str::to_string).collect();

    Ok(ExecutionOutput {
        output: result,
        log,
        error,
        execution_time_ms: 0,
    })
}

fn split_tagged<'a>(s: &'a str, tag: &str) -> Option<(&'a str, &'a str, &'a str)> {
    let start = s.find(tag)?;
    let body_start = start + tag.len();
    let end = body_start + s[body_start..].find(tag)?;
    Some((&s[..start], &s[body_start..end], &s[end + tag.len()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG: &str = "__data_x__";

    #[test]
    fn logs_surround_the_result_block() {
        let stdout = format!("hello\nworld\n{TAG}{{\"a\": [1, 2]}}{TAG}");
        let out = parse_stdout(&stdout, TAG, "").unwrap();
        assert_eq!(out.output, json!({"a": [1, 2]}));
        assert_eq!(out.log, vec!["hello", "world"]);
        assert!(out.is_success());
    }

    #[test]
    fn printed_blank_lines_and_spacing_are_kept() {
        let stdout = format!("a  \n\n  b\n{TAG}null{TAG}");
        let out = parse_stdout(&stdout, TAG, "").unwrap();
        assert_eq!(out.log, vec!["a  ", "", "  b"]);
    }

    #[test]
    fn stderr_without_result_is_an_error_output() {
        let out = parse_stdout("partial\n", TAG, "Error on line 2: boom").unwrap();
        assert_eq!(out.output, Value::Null);
        assert_eq!(out.error.as_deref(), Some("Error on line 2: boom"));
        assert_eq!(out.log, vec!["partial"]);
    }

    #[test]
    fn missing_block_is_a_protocol_error() {
        let err = parse_stdout("just logs\n", TAG, "").unwrap_err();
        assert!(matches!(err, ProcessError::Protocol(_)));
    }

    #[test]
    fn result_must_be_json() {
        let stdout = format!("{TAG}not json{TAG}");
        assert!(matches!(
            parse_stdout(&stdout, TAG, ""),
            Err(ProcessError::Protocol(_))
        ));
    }
}
