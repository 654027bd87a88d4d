//! The compile oracle: drive an external Java compiler over the emitted
//! sources.
//!
//! The pipeline only needs "compile this directory against these archives
//! and tell me what went wrong"; everything else (toolchain discovery,
//! incremental state) is deliberately out of scope.

mod command;
mod javac;

pub use command::{CommandOutput, CommandRunner, DefaultCommandRunner};
pub use javac::{parse_javac_diagnostics, JavacCompiler};

use jess_core::CompilerDiagnostic;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CompileError>;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no Java sources found under {0}")]
    NoSources(PathBuf),
}

/// A single compilation request: sources in, classes out.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Directory of emitted `.java` sources, laid out by package.
    pub sources_dir: PathBuf,
    /// Output directory for `.class` files.
    pub classes_dir: PathBuf,
    /// Archive dependencies for the classpath.
    pub classpath: Vec<PathBuf>,
    /// Language level for `--release`, when pinned.
    pub release: Option<String>,
}

/// What the external compiler reported.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub success: bool,
    pub diagnostics: Vec<CompilerDiagnostic>,
    /// The rendered command line, for result notes.
    pub command: String,
    pub stdout: String,
    pub stderr: String,
}

/// The compiler seam. The default implementation shells out to `javac`;
/// tests substitute their own.
pub trait CompileOracle {
    fn compile(&self, request: &CompileRequest) -> Result<CompileOutcome>;
}
