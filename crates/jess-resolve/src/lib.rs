//! Symbol resolution and reference annotation.
//!
//! Given the parsed root unit, a resolution oracle (classpath knowledge) and
//! the project source roots, the resolver annotates every reference-shaped
//! node with the symbol it resolves to or an unresolved-kind tag, and loads
//! the foreign compilation units touched transitively by the root's imports
//! and references.

mod cache;
mod oracle;
mod resolver;
mod source_map;
mod typing;

pub use cache::{CachingOracle, ResolutionCacheScope};
pub use oracle::{
    CtorSig, EmptyOracle, FieldSig, JdkOracle, MethodSig, ParseOracle, ResolutionOracle,
    TypeEntry,
};
pub use resolver::{ResolveOutcome, Resolver, ResolverConfig};
pub use source_map::SourceRootIndex;
pub use typing::{ExprTyper, TypeEnv};

/// Recursion ceiling for transitive resolution walks.
///
/// The reference behaviour for blowing past it is a soft failure that aborts
/// the whole run, reported through the internal-error path.
pub const MAX_RESOLVE_DEPTH: usize = 64;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("ambiguous call to `{name}` on `{owner}`: {count} applicable overloads")]
    Ambiguity {
        owner: String,
        name: String,
        count: usize,
    },

    #[error("resolution recursion exceeded {MAX_RESOLVE_DEPTH} levels at `{at}`")]
    DepthExceeded { at: String },

    #[error("failed to load source file {path}: {message}")]
    ForeignUnit { path: String, message: String },
}
