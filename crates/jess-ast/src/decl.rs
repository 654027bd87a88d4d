//! Declaration-level nodes: compilation units, types, members.

use crate::expr::Expr;
use crate::stmt::Block;
use crate::types::{NamedType, TypeRef};
use jess_core::{FileId, Fqn, NodeId, Span};
use std::path::PathBuf;

/// Java declaration modifiers, stored as a bitmask like classfile access
/// flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[repr(transparent)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers(0x0001);
    pub const PRIVATE: Modifiers = Modifiers(0x0002);
    pub const PROTECTED: Modifiers = Modifiers(0x0004);
    pub const STATIC: Modifiers = Modifiers(0x0008);
    pub const FINAL: Modifiers = Modifiers(0x0010);
    pub const ABSTRACT: Modifiers = Modifiers(0x0020);
    /// `default` on an interface method.
    pub const DEFAULT: Modifiers = Modifiers(0x0040);
    pub const NATIVE: Modifiers = Modifiers(0x0080);
    pub const SYNCHRONIZED: Modifiers = Modifiers(0x0100);
    pub const TRANSIENT: Modifiers = Modifiers(0x0200);
    pub const VOLATILE: Modifiers = Modifiers(0x0400);
    pub const STRICTFP: Modifiers = Modifiers(0x0800);

    pub const fn empty() -> Self {
        Modifiers(0)
    }

    pub const fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers(self.0 | other.0)
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Modifiers) {
        self.0 &= !other.0;
    }

    pub const fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    pub const fn is_abstract(self) -> bool {
        self.contains(Modifiers::ABSTRACT)
    }

    pub const fn is_default(self) -> bool {
        self.contains(Modifiers::DEFAULT)
    }

    /// Keyword spellings in canonical order.
    pub fn keywords(self) -> Vec<&'static str> {
        const ORDER: &[(Modifiers, &str)] = &[
            (Modifiers::PUBLIC, "public"),
            (Modifiers::PROTECTED, "protected"),
            (Modifiers::PRIVATE, "private"),
            (Modifiers::ABSTRACT, "abstract"),
            (Modifiers::DEFAULT, "default"),
            (Modifiers::STATIC, "static"),
            (Modifiers::FINAL, "final"),
            (Modifiers::SYNCHRONIZED, "synchronized"),
            (Modifiers::NATIVE, "native"),
            (Modifiers::TRANSIENT, "transient"),
            (Modifiers::VOLATILE, "volatile"),
            (Modifiers::STRICTFP, "strictfp"),
        ];
        ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, word)| *word)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub is_static: bool,
    pub is_star: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompilationUnit {
    pub file: FileId,
    pub path: PathBuf,
    pub package: Option<String>,
    pub imports: Vec<Import>,
    pub types: Vec<TypeDecl>,
}

impl CompilationUnit {
    /// FQN of a top-level type declared in this unit.
    pub fn fqn_of(&self, decl: &TypeDecl) -> Fqn {
        Fqn::from_parts(self.package.as_deref().unwrap_or(""), &decl.name)
    }

    /// The first (primary) top-level type, if any.
    pub fn primary_type(&self) -> Option<&TypeDecl> {
        self.types.first()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
    Annotation,
    Enum,
}

impl TypeKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Annotation => "@interface",
            TypeKind::Enum => "enum",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
    pub span: Span,
}

impl TypeParam {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            bounds: Vec::new(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationUse {
    pub ty: NamedType,
    pub args: Vec<AnnotationArg>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationArg {
    /// A single-element `@Foo(expr)` value.
    Value(Expr),
    /// A named `@Foo(name = expr)` pair.
    Named { name: String, value: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub id: NodeId,
    pub kind: TypeKind,
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationUse>,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeRef>,
    /// `implements` clause for classes/enums, `extends` clause for
    /// interfaces.
    pub interfaces: Vec<TypeRef>,
    pub enum_constants: Vec<EnumConstant>,
    pub members: Vec<Member>,
    /// Marks a single-abstract-method owner inferred from lambda or
    /// method-reference arguments.
    pub functional: bool,
    pub span: Span,
}

impl TypeDecl {
    pub fn new(id: NodeId, kind: TypeKind, name: impl Into<String>, span: Span) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            modifiers: Modifiers::empty(),
            annotations: Vec::new(),
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            enum_constants: Vec::new(),
            members: Vec::new(),
            functional: false,
            span,
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn methods_mut(&mut self) -> impl Iterator<Item = &mut MethodDecl> {
        self.members.iter_mut().filter_map(|member| match member {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn nested_types(&self) -> impl Iterator<Item = &TypeDecl> {
        self.members.iter().filter_map(|member| match member {
            Member::Type(nested) => Some(nested),
            _ => None,
        })
    }

    pub fn nested_types_mut(&mut self) -> impl Iterator<Item = &mut TypeDecl> {
        self.members.iter_mut().filter_map(|member| match member {
            Member::Type(nested) => Some(nested),
            _ => None,
        })
    }

    pub fn find_nested_mut(&mut self, name: &str) -> Option<&mut TypeDecl> {
        self.nested_types_mut().find(|nested| nested.name == name)
    }

    /// Abstract instance methods, the SAM-relevant subset for interfaces.
    pub fn abstract_methods(&self) -> impl Iterator<Item = &MethodDecl> {
        self.methods().filter(|method| {
            !method.modifiers.is_static() && !method.modifiers.is_default() && method.body.is_none()
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
    Initializer(InitializerDecl),
    Type(TypeDecl),
}

impl Member {
    pub fn id(&self) -> NodeId {
        match self {
            Member::Field(field) => field.id,
            Member::Method(method) => method.id,
            Member::Constructor(ctor) => ctor.id,
            Member::Initializer(init) => init.id,
            Member::Type(ty) => ty.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationUse>,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub annotations: Vec<AnnotationUse>,
    pub ty: TypeRef,
    pub name: String,
    pub span: Span,
}

impl Param {
    pub fn new(ty: TypeRef, name: impl Into<String>, span: Span) -> Self {
        Self {
            annotations: Vec::new(),
            ty,
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationUse>,
    pub type_params: Vec<TypeParam>,
    pub return_type: TypeRef,
    pub name: String,
    pub params: Vec<Param>,
    pub varargs: bool,
    pub throws: Vec<TypeRef>,
    /// `None` for abstract/native methods and for un-bodied stubs on
    /// interfaces.
    pub body: Option<Block>,
    /// Default value of an annotation-type element (`default ...`).
    pub annotation_default: Option<Expr>,
    pub span: Span,
}

impl MethodDecl {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    pub id: NodeId,
    pub modifiers: Modifiers,
    pub annotations: Vec<AnnotationUse>,
    pub type_params: Vec<TypeParam>,
    pub name: String,
    pub params: Vec<Param>,
    pub varargs: bool,
    pub throws: Vec<TypeRef>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerDecl {
    pub id: NodeId,
    pub is_static: bool,
    pub body: Block,
    pub span: Span,
}
