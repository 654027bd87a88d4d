//! Process execution with bounded output capture.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

// Keep captured compiler output bounded; diagnostics past this point add
// nothing.
const MAX_CAPTURE_BYTES: usize = 4 * 1024 * 1024;

/// Captured output from a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// Indicates stdout/stderr were truncated due to bounded capture.
    pub truncated: bool,
}

impl CommandOutput {
    /// Returns `stdout` + `stderr` concatenated with a newline separator
    /// when needed.
    pub fn combined(&self) -> String {
        let mut s = String::new();
        s.push_str(&self.stdout);
        if !self.stderr.is_empty() {
            if !s.is_empty() && !s.ends_with('\n') {
                s.push('\n');
            }
            s.push_str(&self.stderr);
        }
        s
    }
}

pub trait CommandRunner: Send + Sync + std::fmt::Debug {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput>;
}

#[derive(Debug, Clone, Default)]
pub struct DefaultCommandRunner;

impl CommandRunner for DefaultCommandRunner {
    fn run(&self, cwd: &Path, program: &Path, args: &[String]) -> io::Result<CommandOutput> {
        let command = format_command(program, args);
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| {
                io::Error::new(err.kind(), format!("failed to run `{command}`: {err}"))
            })?;

        let (stdout, stdout_truncated) = bounded_utf8(output.stdout);
        let (stderr, stderr_truncated) = bounded_utf8(output.stderr);
        Ok(CommandOutput {
            status: output.status,
            stdout,
            stderr,
            truncated: stdout_truncated || stderr_truncated,
        })
    }
}

fn bounded_utf8(mut bytes: Vec<u8>) -> (String, bool) {
    let truncated = bytes.len() > MAX_CAPTURE_BYTES;
    if truncated {
        bytes.truncate(MAX_CAPTURE_BYTES);
    }
    (String::from_utf8_lossy(&bytes).into_owned(), truncated)
}

pub(crate) fn format_command(program: &Path, args: &[String]) -> String {
    let mut out = format_command_part(&program.to_string_lossy());
    for arg in args {
        out.push(' ');
        out.push_str(&format_command_part(arg));
    }
    out
}

fn format_command_part(part: &str) -> String {
    if part.contains(' ') || part.contains('\t') {
        format!("\"{}\"", part.replace('"', "\\\""))
    } else {
        part.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn default_runner_captures_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = DefaultCommandRunner;
        let out = runner
            .run(
                dir.path(),
                Path::new("sh"),
                &["-c".to_string(), "echo hello; echo oops >&2".to_string()],
            )
            .unwrap();
        assert!(out.status.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.truncated);
        assert_eq!(out.combined(), "hello\noops\n");
    }

    #[test]
    fn command_formatting_quotes_spaces() {
        let rendered = format_command(
            Path::new("javac"),
            &["-d".to_string(), "out dir".to_string()],
        );
        assert_eq!(rendered, "javac -d \"out dir\"");
    }
}
