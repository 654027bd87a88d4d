//! The Java AST model Jess's pipeline operates on.
//!
//! The tree is produced by a parse oracle (see `jess-syntax` for the default
//! one), annotated in place by the resolver, structurally reduced by the
//! slicer, and finally extended with synthetic declarations by the stubber.
//! Reference-shaped nodes carry a [`Resolution`] slot that records what the
//! resolver decided about them.

mod decl;
mod expr;
mod printer;
mod stmt;
mod types;

pub use decl::{
    AnnotationArg, AnnotationUse, CompilationUnit, ConstructorDecl, EnumConstant, FieldDecl,
    Import, InitializerDecl, Member, MethodDecl, Modifiers, Param, TypeDecl, TypeKind, TypeParam,
};
pub use expr::{
    Expr, LambdaBody, LambdaParam, Literal, LiteralKind, MethodRefTarget, NameExpr, UnaryOp,
};
pub use printer::{print_unit, render_type_ref};
pub use stmt::{Block, LocalVarDecl, Stmt};
pub use types::{
    NamedType, PrimitiveKind, Resolution, Symbol, SymbolKind, TypeRef, UnresolvedKind,
    UnresolvedRef, WildcardBound,
};
