//! Type references and resolution slots.

use jess_core::{Fqn, Span};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

impl PrimitiveKind {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Some(match word {
            "boolean" => PrimitiveKind::Boolean,
            "byte" => PrimitiveKind::Byte,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "char" => PrimitiveKind::Char,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            _ => return None,
        })
    }
}

/// What a reference-shaped node resolved to.
///
/// `Unvisited` is the parser's initial value; after the resolver pass every
/// slot is either `Resolved` or `Unresolved`.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub enum Resolution {
    #[default]
    Unvisited,
    Resolved(Symbol),
    Unresolved(UnresolvedRef),
}

impl Resolution {
    pub fn unresolved(kind: UnresolvedKind) -> Self {
        Resolution::Unresolved(UnresolvedRef {
            kind,
            owner: None,
            static_ctx: false,
        })
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Resolution::Unresolved(_))
    }

    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Resolution::Resolved(sym) => Some(sym),
            _ => None,
        }
    }

    pub fn as_unresolved(&self) -> Option<&UnresolvedRef> {
        match self {
            Resolution::Unresolved(unresolved) => Some(unresolved),
            _ => None,
        }
    }
}

/// An unresolved reference, annotated with what the resolver could still
/// establish about it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct UnresolvedRef {
    pub kind: UnresolvedKind,
    /// Best-effort owner (receiver type or enclosing type) recorded at
    /// resolution time so the collector can aim the stub plan.
    pub owner: Option<Fqn>,
    /// Whether the reference sat in a static context (static receiver or a
    /// static member's body).
    pub static_ctx: bool,
}

impl UnresolvedRef {
    pub fn new(kind: UnresolvedKind) -> Self {
        Self {
            kind,
            owner: None,
            static_ctx: false,
        }
    }

    pub fn with_owner(mut self, owner: Fqn) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn in_static_ctx(mut self, static_ctx: bool) -> Self {
        self.static_ctx = static_ctx;
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnresolvedKind {
    Type,
    Method,
    Field,
    Ctor,
}

/// A resolved identity produced by the resolution oracle.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Symbol {
    pub fqn: Fqn,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn new(fqn: impl Into<Fqn>, kind: SymbolKind) -> Self {
        Self {
            fqn: fqn.into(),
            kind,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SymbolKind {
    Class,
    Interface,
    Annotation,
    Enum,
    Method,
    Field,
    Package,
    Local,
    /// A type-parameter reference (`T` inside a generic declaration).
    TypeParam,
}

/// A class-or-interface type usage, possibly generic.
///
/// `name` is the reference as written (simple, partially qualified, or fully
/// qualified); the resolver records the resolved FQN in `resolution`. The
/// stubber rewrites `name` to a fully-qualified spelling before emission.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub resolution: Resolution,
    pub span: Span,
}

impl NamedType {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            resolution: Resolution::Unvisited,
            span,
        }
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    /// The last `.`-separated segment of the written name.
    pub fn written_simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// The FQN this reference denotes: the resolved symbol when present,
    /// otherwise the written name taken at face value.
    pub fn denoted_fqn(&self) -> Fqn {
        match &self.resolution {
            Resolution::Resolved(sym) => sym.fqn.clone(),
            _ => Fqn::new(self.name.as_str()),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum WildcardBound {
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Primitive(PrimitiveKind, Span),
    Void(Span),
    Named(NamedType),
    Array {
        component: Box<TypeRef>,
        span: Span,
    },
    /// `?`, `? extends T`, `? super T`; valid only as a type argument.
    Wildcard {
        bound: Option<(WildcardBound, Box<TypeRef>)>,
        span: Span,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<String>, span: Span) -> Self {
        TypeRef::Named(NamedType::new(name, span))
    }

    pub fn array_of(component: TypeRef, span: Span) -> Self {
        TypeRef::Array {
            component: Box::new(component),
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeRef::Primitive(_, span) | TypeRef::Void(span) => *span,
            TypeRef::Named(named) => named.span,
            TypeRef::Array { span, .. } | TypeRef::Wildcard { span, .. } => *span,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void(_))
    }

    /// The innermost non-array type.
    pub fn element(&self) -> &TypeRef {
        match self {
            TypeRef::Array { component, .. } => component.element(),
            other => other,
        }
    }

    pub fn as_named(&self) -> Option<&NamedType> {
        match self {
            TypeRef::Named(named) => Some(named),
            _ => None,
        }
    }

    pub fn as_named_mut(&mut self) -> Option<&mut NamedType> {
        match self {
            TypeRef::Named(named) => Some(named),
            _ => None,
        }
    }

    /// Array nesting depth (`0` for non-arrays).
    pub fn array_dims(&self) -> usize {
        match self {
            TypeRef::Array { component, .. } => 1 + component.array_dims(),
            _ => 0,
        }
    }

    /// The default-value expression text for this type: `null` for
    /// references, zero with the right literal suffix for numerics, `false`
    /// for booleans, `'\0'` for chars; `None` for `void`.
    pub fn default_value_text(&self) -> Option<&'static str> {
        match self {
            TypeRef::Void(_) => None,
            TypeRef::Primitive(kind, _) => Some(match kind {
                PrimitiveKind::Boolean => "false",
                PrimitiveKind::Char => "'\\0'",
                PrimitiveKind::Long => "0L",
                PrimitiveKind::Float => "0.0f",
                PrimitiveKind::Double => "0.0d",
                PrimitiveKind::Byte | PrimitiveKind::Short | PrimitiveKind::Int => "0",
            }),
            _ => Some("null"),
        }
    }
}
