//! Expression nodes.

use crate::stmt::Block;
use crate::types::{NamedType, Resolution, TypeRef};
use jess_core::Span;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum LiteralKind {
    Null,
    Bool,
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
}

/// A literal, kept in its source spelling so emission is lossless
/// (suffixes, escapes, radix prefixes).
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
    pub span: Span,
}

impl Literal {
    pub fn new(kind: LiteralKind, text: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            text: text.into(),
            span,
        }
    }
}

/// A bare or dotted name in expression position (`x`, `a.b.c`).
///
/// Whether segments denote locals, fields, types, or packages is only known
/// after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct NameExpr {
    pub name: String,
    pub resolution: Resolution,
    pub span: Span,
}

impl NameExpr {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            resolution: Resolution::Unvisited,
            span,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

impl UnaryOp {
    pub fn spelling(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
            UnaryOp::PreInc | UnaryOp::PostInc => "++",
            UnaryOp::PreDec | UnaryOp::PostDec => "--",
        }
    }

    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOp::PostInc | UnaryOp::PostDec)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub ty: Option<TypeRef>,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(Box<Expr>),
    Block(Block),
}

/// The left-hand side of a `::` method reference.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodRefTarget {
    /// `expr::name`
    Expr(Box<Expr>),
    /// `Type::name`, including array-constructor references
    /// (`String[]::new`).
    Type(TypeRef),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Name(NameExpr),
    This {
        span: Span,
    },
    /// `super` or qualified `A.super`, only valid as a call receiver.
    SuperRef {
        qualifier: Option<NamedType>,
        span: Span,
    },
    FieldAccess {
        receiver: Box<Expr>,
        name: String,
        resolution: Resolution,
        span: Span,
    },
    MethodCall {
        receiver: Option<Box<Expr>>,
        type_args: Vec<TypeRef>,
        name: String,
        args: Vec<Expr>,
        resolution: Resolution,
        span: Span,
    },
    /// `new T(args)`; anonymous class bodies are outside the modelled
    /// subset.
    New {
        ty: TypeRef,
        args: Vec<Expr>,
        resolution: Resolution,
        span: Span,
    },
    /// `new T[len]...` or `new T[] { ... }`.
    NewArray {
        /// Element type (non-array).
        element: TypeRef,
        /// One entry per `[]`; `None` for unsized dimensions.
        dims: Vec<Option<Expr>>,
        initializer: Option<Vec<Expr>>,
        span: Span,
    },
    Cast {
        ty: TypeRef,
        value: Box<Expr>,
        span: Span,
    },
    InstanceOf {
        value: Box<Expr>,
        ty: TypeRef,
        span: Span,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
        span: Span,
    },
    /// `target::name`; `name` is `"new"` for constructor references.
    MethodRef {
        target: MethodRefTarget,
        name: String,
        span: Span,
    },
    Assign {
        lhs: Box<Expr>,
        /// Compound-assignment operator (`+=` etc.), `None` for plain `=`.
        op: Option<&'static str>,
        rhs: Box<Expr>,
        span: Span,
    },
    Binary {
        op: &'static str,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        value: Box<Expr>,
        span: Span,
    },
    Conditional {
        cond: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
        span: Span,
    },
    ArrayIndex {
        array: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// A parenthesised sub-expression, kept so emission round-trips.
    Paren {
        value: Box<Expr>,
        span: Span,
    },
    /// `T.class`
    ClassLiteral {
        ty: TypeRef,
        span: Span,
    },
    /// A bare `{ a, b }` initializer, valid in annotation values and array
    /// declarator initialisers.
    ArrayInit {
        values: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(lit) => lit.span,
            Expr::Name(name) => name.span,
            Expr::This { span }
            | Expr::SuperRef { span, .. }
            | Expr::FieldAccess { span, .. }
            | Expr::MethodCall { span, .. }
            | Expr::New { span, .. }
            | Expr::NewArray { span, .. }
            | Expr::Cast { span, .. }
            | Expr::InstanceOf { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::MethodRef { span, .. }
            | Expr::Assign { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::ArrayIndex { span, .. }
            | Expr::Paren { span, .. }
            | Expr::ClassLiteral { span, .. }
            | Expr::ArrayInit { span, .. } => *span,
        }
    }

    /// Whether this is the `null` literal.
    pub fn is_null_literal(&self) -> bool {
        matches!(
            self,
            Expr::Literal(Literal {
                kind: LiteralKind::Null,
                ..
            })
        )
    }
}
