//! Best-effort expression typing.
//!
//! This is deliberately shallow: it answers "what type does this expression
//! have, as far as the already-annotated slots and the oracle can tell",
//! returning `None` where the answer would require real type checking. The
//! collector maps `None` to the `unknown.Unknown` fallback.

use crate::oracle::ResolutionOracle;
use jess_ast::{
    Expr, Literal, LiteralKind, NamedType, PrimitiveKind, Resolution, SymbolKind, TypeRef,
};
use std::collections::HashMap;

/// Lexically scoped local-variable types (parameters and locals).
#[derive(Debug, Default)]
pub struct TypeEnv {
    scopes: Vec<HashMap<String, TypeRef>>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn insert(&mut self, name: impl Into<String>, ty: TypeRef) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), ty);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeRef> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }
}

/// Types expressions against a [`TypeEnv`], the enclosing type's fields and
/// the oracle.
pub struct ExprTyper<'a> {
    pub env: &'a TypeEnv,
    pub fields: &'a HashMap<String, TypeRef>,
    pub oracle: &'a dyn ResolutionOracle,
}

impl ExprTyper<'_> {
    pub fn type_of(&self, expr: &Expr) -> Option<TypeRef> {
        match expr {
            Expr::Literal(lit) => literal_type(lit),
            Expr::Name(name) => {
                if let Some(ty) = self.env.get(&name.name) {
                    return Some(ty.clone());
                }
                if let Some(ty) = self.fields.get(&name.name) {
                    return Some(ty.clone());
                }
                // A name resolved to a type denotes that type (a static
                // receiver).
                match &name.resolution {
                    Resolution::Resolved(sym) if is_type_kind(sym.kind) => Some(TypeRef::Named(
                        NamedType::new(sym.fqn.as_str(), name.span),
                    )),
                    _ => None,
                }
            }
            Expr::FieldAccess {
                receiver,
                name,
                resolution,
                ..
            } => {
                if let Resolution::Resolved(sym) = resolution {
                    if is_type_kind(sym.kind) {
                        return Some(TypeRef::Named(NamedType::new(
                            sym.fqn.as_str(),
                            expr.span(),
                        )));
                    }
                    if sym.kind == SymbolKind::Field {
                        let sig = self.oracle.lookup_field(&sym.fqn, name)?;
                        return parse_type_text(&sig.ty);
                    }
                }
                // `array.length`.
                if name == "length" {
                    if let Some(TypeRef::Array { .. }) = self.type_of(receiver) {
                        return Some(TypeRef::Primitive(PrimitiveKind::Int, expr.span()));
                    }
                }
                None
            }
            Expr::MethodCall {
                receiver,
                name,
                args,
                resolution,
                ..
            } => {
                let Resolution::Resolved(sym) = resolution else {
                    return None;
                };
                if sym.kind != SymbolKind::Method {
                    return None;
                }
                let _ = receiver;
                let sigs = self.oracle.lookup_methods(&sym.fqn, name);
                let sig = sigs
                    .iter()
                    .find(|sig| sig.params.len() == args.len())
                    .or_else(|| sigs.first())?;
                parse_type_text(&sig.return_type)
            }
            Expr::New { ty, .. } => Some(ty.clone()),
            Expr::NewArray { element, dims, .. } => {
                let mut ty = element.clone();
                for _ in dims {
                    let span = ty.span();
                    ty = TypeRef::array_of(ty, span);
                }
                Some(ty)
            }
            Expr::Cast { ty, .. } => Some(ty.clone()),
            Expr::InstanceOf { .. } => {
                Some(TypeRef::Primitive(PrimitiveKind::Boolean, expr.span()))
            }
            Expr::Paren { value, .. } => self.type_of(value),
            Expr::ArrayIndex { array, .. } => match self.type_of(array)? {
                TypeRef::Array { component, .. } => Some(*component),
                _ => None,
            },
            Expr::Assign { lhs, .. } => self.type_of(lhs),
            Expr::Unary { value, .. } => self.type_of(value),
            Expr::Binary { op, lhs, rhs, .. } => {
                if matches!(
                    *op,
                    "==" | "!=" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "instanceof"
                ) {
                    return Some(TypeRef::Primitive(PrimitiveKind::Boolean, expr.span()));
                }
                self.type_of(lhs).or_else(|| self.type_of(rhs))
            }
            Expr::Conditional {
                then_value,
                else_value,
                ..
            } => self
                .type_of(then_value)
                .or_else(|| self.type_of(else_value)),
            Expr::ClassLiteral { ty, .. } => {
                let mut class = NamedType::new("java.lang.Class", expr.span());
                class.args = vec![ty.clone()];
                Some(TypeRef::Named(class))
            }
            Expr::This { .. }
            | Expr::SuperRef { .. }
            | Expr::Lambda { .. }
            | Expr::MethodRef { .. }
            | Expr::ArrayInit { .. } => None,
        }
    }
}

pub(crate) fn is_type_kind(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::Class
            | SymbolKind::Interface
            | SymbolKind::Annotation
            | SymbolKind::Enum
            | SymbolKind::TypeParam
    )
}

/// Parses an oracle-reported type spelling; `None` on anything malformed.
pub(crate) fn parse_type_text(text: &str) -> Option<TypeRef> {
    jess_syntax::parse_type_ref(text).ok()
}

fn literal_type(lit: &Literal) -> Option<TypeRef> {
    let span = lit.span;
    Some(match lit.kind {
        LiteralKind::Null => return None,
        LiteralKind::Bool => TypeRef::Primitive(PrimitiveKind::Boolean, span),
        LiteralKind::Int => TypeRef::Primitive(PrimitiveKind::Int, span),
        LiteralKind::Long => TypeRef::Primitive(PrimitiveKind::Long, span),
        LiteralKind::Float => TypeRef::Primitive(PrimitiveKind::Float, span),
        LiteralKind::Double => TypeRef::Primitive(PrimitiveKind::Double, span),
        LiteralKind::Char => TypeRef::Primitive(PrimitiveKind::Char, span),
        LiteralKind::String => TypeRef::Named(NamedType::new("java.lang.String", span)),
    })
}

