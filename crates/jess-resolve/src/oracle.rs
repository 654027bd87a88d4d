//! The resolution and parse oracle seams.
//!
//! Both are opaque services from the pipeline's point of view: the
//! resolution oracle answers classpath questions, the parse oracle turns
//! source text into the AST model.

use jess_ast::{CompilationUnit, SymbolKind};
use jess_core::{FileId, Fqn};
use std::path::Path;

/// A type known to the classpath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub fqn: Fqn,
    pub kind: SymbolKind,
}

/// A method signature reported by the oracle. Types are source-level
/// spellings (`int`, `java.util.List<java.lang.String>`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub params: Vec<String>,
    pub return_type: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSig {
    pub ty: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtorSig {
    pub params: Vec<String>,
}

/// Classpath knowledge used to classify references as resolvable or not.
pub trait ResolutionOracle {
    /// Exact-FQN type lookup.
    fn lookup_type(&self, fqn: &Fqn) -> Option<TypeEntry>;

    /// All methods named `name` on `owner` (inherited members included, as
    /// far as the oracle knows them).
    fn lookup_methods(&self, owner: &Fqn, name: &str) -> Vec<MethodSig>;

    fn lookup_field(&self, owner: &Fqn, name: &str) -> Option<FieldSig>;

    fn lookup_ctors(&self, owner: &Fqn) -> Vec<CtorSig>;
}

/// An oracle with no classpath at all: every non-source reference is
/// unresolvable and therefore a stub candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyOracle;

impl ResolutionOracle for EmptyOracle {
    fn lookup_type(&self, _fqn: &Fqn) -> Option<TypeEntry> {
        None
    }

    fn lookup_methods(&self, _owner: &Fqn, _name: &str) -> Vec<MethodSig> {
        Vec::new()
    }

    fn lookup_field(&self, _owner: &Fqn, _name: &str) -> Option<FieldSig> {
        None
    }

    fn lookup_ctors(&self, _owner: &Fqn) -> Vec<CtorSig> {
        Vec::new()
    }
}

/// An oracle that recognises a curated set of ubiquitous JDK types.
///
/// This is the default for standalone runs: well-known platform names stay
/// resolvable (so they are never stubbed and compile against the real JDK),
/// while everything else remains a stub candidate. The list is finite on
/// purpose; a blanket "accept anything `java.*`" would also swallow
/// unknown simple names probed against `java.lang` and star imports.
#[derive(Debug, Default, Clone, Copy)]
pub struct JdkOracle;

impl JdkOracle {
    const KNOWN: &'static [(&'static str, SymbolKind)] = &[
        ("java.lang.Object", SymbolKind::Class),
        ("java.lang.String", SymbolKind::Class),
        ("java.lang.CharSequence", SymbolKind::Interface),
        ("java.lang.StringBuilder", SymbolKind::Class),
        ("java.lang.Number", SymbolKind::Class),
        ("java.lang.Integer", SymbolKind::Class),
        ("java.lang.Long", SymbolKind::Class),
        ("java.lang.Short", SymbolKind::Class),
        ("java.lang.Byte", SymbolKind::Class),
        ("java.lang.Double", SymbolKind::Class),
        ("java.lang.Float", SymbolKind::Class),
        ("java.lang.Boolean", SymbolKind::Class),
        ("java.lang.Character", SymbolKind::Class),
        ("java.lang.Void", SymbolKind::Class),
        ("java.lang.Math", SymbolKind::Class),
        ("java.lang.System", SymbolKind::Class),
        ("java.lang.Thread", SymbolKind::Class),
        ("java.lang.Runnable", SymbolKind::Interface),
        ("java.lang.Iterable", SymbolKind::Interface),
        ("java.lang.Comparable", SymbolKind::Interface),
        ("java.lang.Class", SymbolKind::Class),
        ("java.lang.Throwable", SymbolKind::Class),
        ("java.lang.Exception", SymbolKind::Class),
        ("java.lang.RuntimeException", SymbolKind::Class),
        ("java.lang.IllegalArgumentException", SymbolKind::Class),
        ("java.lang.IllegalStateException", SymbolKind::Class),
        ("java.lang.UnsupportedOperationException", SymbolKind::Class),
        ("java.lang.NullPointerException", SymbolKind::Class),
        ("java.lang.Error", SymbolKind::Class),
        ("java.lang.AssertionError", SymbolKind::Class),
        ("java.lang.Override", SymbolKind::Annotation),
        ("java.lang.Deprecated", SymbolKind::Annotation),
        ("java.lang.SuppressWarnings", SymbolKind::Annotation),
        ("java.lang.SafeVarargs", SymbolKind::Annotation),
        ("java.lang.FunctionalInterface", SymbolKind::Annotation),
        ("java.lang.annotation.Annotation", SymbolKind::Interface),
        ("java.lang.annotation.Target", SymbolKind::Annotation),
        ("java.lang.annotation.Retention", SymbolKind::Annotation),
        ("java.lang.annotation.Repeatable", SymbolKind::Annotation),
        ("java.lang.annotation.Documented", SymbolKind::Annotation),
        ("java.lang.annotation.Inherited", SymbolKind::Annotation),
        ("java.lang.annotation.ElementType", SymbolKind::Enum),
        ("java.lang.annotation.RetentionPolicy", SymbolKind::Enum),
        ("java.util.List", SymbolKind::Interface),
        ("java.util.Map", SymbolKind::Interface),
        ("java.util.Set", SymbolKind::Interface),
        ("java.util.Collection", SymbolKind::Interface),
        ("java.util.Iterator", SymbolKind::Interface),
        ("java.util.Optional", SymbolKind::Class),
        ("java.util.ArrayList", SymbolKind::Class),
        ("java.util.HashMap", SymbolKind::Class),
        ("java.util.HashSet", SymbolKind::Class),
        ("java.util.Arrays", SymbolKind::Class),
        ("java.util.Collections", SymbolKind::Class),
        ("java.util.Objects", SymbolKind::Class),
        ("java.util.function.Function", SymbolKind::Interface),
        ("java.util.function.BiFunction", SymbolKind::Interface),
        ("java.util.function.Supplier", SymbolKind::Interface),
        ("java.util.function.Consumer", SymbolKind::Interface),
        ("java.util.function.Predicate", SymbolKind::Interface),
        ("java.io.IOException", SymbolKind::Class),
        ("java.io.UncheckedIOException", SymbolKind::Class),
        ("java.io.File", SymbolKind::Class),
        ("java.io.InputStream", SymbolKind::Class),
        ("java.io.OutputStream", SymbolKind::Class),
        ("java.io.PrintStream", SymbolKind::Class),
        ("java.nio.file.Path", SymbolKind::Interface),
        ("java.nio.file.Paths", SymbolKind::Class),
        ("java.nio.file.Files", SymbolKind::Class),
    ];
}

impl ResolutionOracle for JdkOracle {
    fn lookup_type(&self, fqn: &Fqn) -> Option<TypeEntry> {
        JdkOracle::KNOWN
            .iter()
            .find(|(name, _)| *name == fqn.as_str())
            .map(|(name, kind)| TypeEntry {
                fqn: Fqn::new(*name),
                kind: *kind,
            })
    }

    fn lookup_methods(&self, _owner: &Fqn, _name: &str) -> Vec<MethodSig> {
        Vec::new()
    }

    fn lookup_field(&self, _owner: &Fqn, _name: &str) -> Option<FieldSig> {
        None
    }

    fn lookup_ctors(&self, _owner: &Fqn) -> Vec<CtorSig> {
        Vec::new()
    }
}

/// Parses source text into the AST model.
pub trait ParseOracle {
    fn parse(
        &self,
        text: &str,
        file: FileId,
        path: &Path,
    ) -> std::result::Result<CompilationUnit, String>;
}
