//! Pipeline orchestration: Resolver → PreSlicer → Slicer → Collector →
//! Stubber → Reconciler → emitted sources → external compiler → target
//! verification.
//!
//! Data flow is strictly linear; each stage consumes the previous stage's
//! output and there is no backtracking. The only terminal failures are a
//! root parse error, a resolution failure under `fail_on_ambiguity`, and an
//! external compile failure; everything else is best-effort.

mod emit;
mod pipeline;
mod verify;

pub use emit::emit_sources;
pub use pipeline::{run, DefaultParseOracle};
pub use verify::{verify_target, TargetCheck};

use std::path::PathBuf;

/// A target method in binary form.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MethodId {
    /// Binary class name (`com.example.Outer$Inner`).
    pub binary_class_name: String,
    pub name: String,
    /// JVM descriptor (`(I[Ljava/lang/String;)V`).
    pub descriptor: String,
}

/// What to slice down to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceTarget {
    Method(MethodId),
    /// Keep every method of the target type.
    WholeClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceMode {
    Method,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StubberKind {
    Default,
    /// Conservative variant: no repeatable-container heuristic, no builder
    /// completion.
    Alternate,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub work_dir: PathBuf,
    pub slice_mode: SliceMode,
    /// Opaque dependency-mode label, recorded in the result.
    pub dep_mode: String,
    pub stubber_kind: StubberKind,
    pub keep_asterisk_imports: bool,
    pub fail_on_ambiguity: bool,
    pub loose_signature_matching: bool,
    /// `--release` value for the external compiler.
    pub target_version: Option<String>,
    pub keep_class_init: bool,
    pub keep_instance_init: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            slice_mode: SliceMode::Method,
            dep_mode: String::new(),
            stubber_kind: StubberKind::Default,
            keep_asterisk_imports: false,
            fail_on_ambiguity: false,
            loose_signature_matching: false,
            target_version: None,
            keep_class_init: false,
            keep_instance_init: false,
        }
    }
}

/// One slicing request.
#[derive(Debug, Clone)]
pub struct SliceRequest {
    pub source_file: PathBuf,
    pub target: SliceTarget,
    pub source_roots: Vec<PathBuf>,
    pub dependencies: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Ok,
    FailedParse,
    FailedResolve,
    FailedCompile,
    TargetMethodNotEmitted,
    InternalError,
}

/// The invocation's outcome record.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SliceResult {
    pub status: Status,
    pub classes_dir: Option<PathBuf>,
    /// Binary name of the primary (target) class.
    pub primary_class: Option<String>,
    /// Binary names of every emitted class.
    pub emitted_binary_names: Vec<String>,
    /// `classes/`-relative path of the primary class file.
    pub class_file_rel: Option<String>,
    pub target_has_code: bool,
    pub used_stubs: bool,
    pub dep_mode: String,
    pub duration_ms: u64,
    pub notes: Vec<String>,
}

impl SliceResult {
    pub(crate) fn failed(status: Status, dep_mode: &str, notes: Vec<String>) -> Self {
        Self {
            status,
            classes_dir: None,
            primary_class: None,
            emitted_binary_names: Vec::new(),
            class_file_rel: None,
            target_has_code: false,
            used_stubs: false,
            dep_mode: dep_mode.to_string(),
            duration_ms: 0,
            notes,
        }
    }
}

/// Exit code for the distinguished soft failures (resolution recursion
/// blowing its depth budget, and kin).
pub const SOFT_FAILURE_EXIT_CODE: i32 = 3;
