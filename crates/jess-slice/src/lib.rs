//! Structural reduction of the resolved model to the keep-set.
//!
//! The pre-slicer computes which declarations must survive for the target
//! to compile (the transitive closure of use from the keep patterns); the
//! slicer then drops everything else, guts foreign method bodies down to
//! default returns, and strips dead imports.

mod preslice;
mod slicer;

pub use preslice::{compute_keep_set, KeepRules, KeepSet, MethodPattern};
pub use slicer::{slice, SliceConfig, SlicedModel};
