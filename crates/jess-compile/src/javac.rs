//! `javac` invocation and diagnostic parsing.

use crate::command::{format_command, CommandRunner, DefaultCommandRunner};
use crate::{CompileError, CompileOracle, CompileOutcome, CompileRequest, Result};
use jess_core::{CompilerDiagnostic, Severity};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// The default compile oracle: shells out to `javac` on the PATH.
#[derive(Debug)]
pub struct JavacCompiler {
    program: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl Default for JavacCompiler {
    fn default() -> Self {
        Self {
            program: PathBuf::from("javac"),
            runner: Arc::new(DefaultCommandRunner),
        }
    }
}

impl JavacCompiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            runner: Arc::new(DefaultCommandRunner),
        }
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl CompileOracle for JavacCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome> {
        let sources: Vec<PathBuf> = WalkDir::new(&request.sources_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some("java")
            })
            .map(|entry| entry.into_path())
            .collect();
        if sources.is_empty() {
            return Err(CompileError::NoSources(request.sources_dir.clone()));
        }

        std::fs::create_dir_all(&request.classes_dir)?;

        let mut args: Vec<String> = Vec::new();
        args.push("-d".to_string());
        args.push(request.classes_dir.display().to_string());
        if !request.classpath.is_empty() {
            let joined = request
                .classpath
                .iter()
                .map(|entry| entry.display().to_string())
                .collect::<Vec<_>>()
                .join(classpath_separator());
            args.push("-classpath".to_string());
            args.push(joined);
        }
        if let Some(release) = &request.release {
            args.push("--release".to_string());
            args.push(release.clone());
        }
        // Stubs trade correctness warnings for compilability; keep the
        // output quiet.
        args.push("-nowarn".to_string());
        for source in &sources {
            args.push(source.display().to_string());
        }

        let command = format_command(&self.program, &args);
        debug!(%command, sources = sources.len(), "invoking javac");
        let output = self
            .runner
            .run(&request.sources_dir, &self.program, &args)?;

        let diagnostics = parse_javac_diagnostics(&output.combined());
        Ok(CompileOutcome {
            success: output.status.success(),
            diagnostics,
            command,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

fn classpath_separator() -> &'static str {
    if cfg!(windows) {
        ";"
    } else {
        ":"
    }
}

/// Parses standard `javac` diagnostics:
///
/// ```text
/// /path/Foo.java:10: error: cannot find symbol
///     foo.bar();
///         ^
///   symbol: method bar()
/// ```
///
/// The parser is intentionally tolerant; unknown lines between diagnostics
/// are skipped, continuation lines are folded into the message.
pub fn parse_javac_diagnostics(output: &str) -> Vec<CompilerDiagnostic> {
    let mut diags: Vec<CompilerDiagnostic> = Vec::new();
    let mut current: Option<CompilerDiagnostic> = None;

    let mut lines = output.lines().peekable();
    while let Some(line) = lines.next() {
        if let Some((severity, file, line_no, message)) = parse_header(line) {
            if let Some(prev) = current.take() {
                diags.push(prev);
            }
            // Best-effort column from the caret line that follows the
            // echoed source line.
            let mut col = 0u32;
            if lines.peek().is_some() {
                let _code_line = lines.next();
                if let Some(caret) = lines.peek() {
                    if let Some(idx) = caret.find('^') {
                        let _ = lines.next();
                        col = idx as u32 + 1;
                    }
                }
            }
            current = Some(CompilerDiagnostic::new(file, line_no, col, severity, message));
            continue;
        }

        if let Some(diag) = current.as_mut() {
            if is_continuation(line) {
                diag.message.push('\n');
                diag.message.push_str(line.trim_end());
            }
        }
    }
    if let Some(diag) = current.take() {
        diags.push(diag);
    }
    diags
}

fn parse_header(line: &str) -> Option<(Severity, PathBuf, u32, String)> {
    let (severity, marker) = if let Some(pos) = line.rfind(": error:") {
        (Severity::Error, (pos, ": error:".len()))
    } else if let Some(pos) = line.rfind(": warning:") {
        (Severity::Warning, (pos, ": warning:".len()))
    } else {
        return None;
    };
    let (left, message_part) = line.split_at(marker.0);
    let message = message_part[marker.1..].trim_start();
    let (path, line_no) = left.rsplit_once(':')?;
    let line_no = line_no.trim().parse::<u32>().ok()?;
    if !Path::new(path).to_string_lossy().ends_with(".java") {
        return None;
    }
    Some((severity, PathBuf::from(path), line_no, message.to_string()))
}

fn is_continuation(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.starts_with("symbol:") || trimmed.starts_with("location:") || line.starts_with(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_error_with_caret_column() {
        let output = "\
/tmp/gen/p/C.java:10: error: cannot find symbol
        foo.bar();
            ^
  symbol:   method bar()
  location: variable foo
1 error
";
        let diags = parse_javac_diagnostics(output);
        assert_eq!(diags.len(), 1);
        let diag = &diags[0];
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.line, 10);
        assert_eq!(diag.col, 13);
        assert!(diag.message.starts_with("cannot find symbol"));
        assert!(diag.message.contains("symbol:   method bar()"));
    }

    #[test]
    fn parses_multiple_diagnostics() {
        let output = "\
/tmp/A.java:1: error: first
x
^
/tmp/B.java:2: warning: second
y
^
";
        let diags = parse_javac_diagnostics(output);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].severity, Severity::Error);
        assert_eq!(diags[1].severity, Severity::Warning);
        assert_eq!(diags[1].line, 2);
    }

    #[test]
    fn ignores_unrelated_lines() {
        let diags = parse_javac_diagnostics("Note: uses unchecked operations\n2 errors\n");
        assert!(diags.is_empty());
    }
}
