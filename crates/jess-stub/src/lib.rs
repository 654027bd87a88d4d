//! Stub planning, materialisation and reconciliation.
//!
//! The collector scans the sliced model and plans a declaration for every
//! reference that did not resolve; the stubber materialises those plans as
//! synthetic types and members; the reconciler then repairs the global type
//! graph (generic arities, SAM uniqueness, interface implementation,
//! builder patterns, ambiguous names, placeholder rebinding).
//!
//! Collection and stubbing are best-effort throughout: a plan that cannot
//! be honoured is logged and skipped, never fatal.

mod collect;
mod plan;
mod reconcile;
mod stub;

pub use collect::collect_plans;
pub use plan::{
    CtorStubPlan, FieldStubPlan, ImplementsPlan, MethodStubPlan, PlanSet, StubPlan, TypeStubPlan,
};
pub use reconcile::reconcile;
pub use stub::{apply_plans, StubbedModel, StubberOptions};

/// Positional names for synthetic type parameters.
pub(crate) const TYPE_PARAM_NAMES: &[&str] = &["T", "R", "U", "V", "W", "X", "Y", "Z"];

/// Ceiling for walks over the materialised type graph.
pub(crate) const MAX_TYPE_WALK_DEPTH: usize = 64;
