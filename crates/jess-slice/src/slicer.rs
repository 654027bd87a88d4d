//! The slicer proper: drop unkept declarations, gut foreign bodies, strip
//! dead imports.

use crate::preslice::{KeepRules, KeepSet};
use jess_ast::{
    Block, CompilationUnit, Expr, Literal, LiteralKind, Member, Stmt, TypeDecl, TypeRef,
};
use jess_core::Fqn;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SliceConfig {
    pub keep_asterisk_imports: bool,
}

/// The sliced model: the reduced root unit plus one fragment per foreign
/// unit that still contributes declarations. The root is carried separately
/// because it is re-emitted with its real bodies, while fragments are
/// declaration shells.
#[derive(Debug)]
pub struct SlicedModel {
    pub root: CompilationUnit,
    pub fragments: BTreeMap<Fqn, CompilationUnit>,
}

impl SlicedModel {
    /// All units of the model, root first.
    pub fn units(&self) -> impl Iterator<Item = &CompilationUnit> {
        std::iter::once(&self.root).chain(self.fragments.values())
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut CompilationUnit> {
        std::iter::once(&mut self.root).chain(self.fragments.values_mut())
    }
}

/// Applies the keep set.
pub fn slice(
    root: CompilationUnit,
    foreign: BTreeMap<Fqn, CompilationUnit>,
    keep: &KeepSet,
    rules: &KeepRules,
    config: &SliceConfig,
) -> SlicedModel {
    let mut root = root;
    root.types.retain(|decl| keep.contains(decl.id));
    for decl in &mut root.types {
        reduce_type(decl, keep, rules, BodyPolicy::Keep);
    }
    strip_imports(&mut root, config);

    let mut fragments = BTreeMap::new();
    for (fqn, mut unit) in foreign {
        unit.types.retain(|decl| keep.contains(decl.id));
        if unit.types.is_empty() {
            continue;
        }
        for decl in &mut unit.types {
            reduce_type(decl, keep, rules, BodyPolicy::DefaultReturn);
        }
        strip_imports(&mut unit, config);
        debug!(unit = %fqn, "sliced foreign fragment");
        fragments.insert(fqn, unit);
    }

    SlicedModel { root, fragments }
}

#[derive(Copy, Clone, PartialEq)]
enum BodyPolicy {
    /// Root unit: kept methods keep their real bodies.
    Keep,
    /// Foreign fragments: bodies are gutted to a single default return.
    DefaultReturn,
}

fn reduce_type(decl: &mut TypeDecl, keep: &KeepSet, rules: &KeepRules, policy: BodyPolicy) {
    decl.members.retain(|member| keep.contains(member.id()));
    for member in &mut decl.members {
        match member {
            Member::Method(method) => {
                if policy == BodyPolicy::DefaultReturn {
                    if let Some(body) = &mut method.body {
                        *body = default_return_body(&method.return_type, body.span);
                    }
                }
            }
            Member::Constructor(ctor) => {
                if policy == BodyPolicy::DefaultReturn && !rules.keep_instance_init {
                    ctor.body = Block::empty(ctor.body.span);
                }
            }
            Member::Initializer(init) => {
                let keep_full = if init.is_static {
                    rules.keep_class_init
                } else {
                    rules.keep_instance_init
                };
                if policy == BodyPolicy::DefaultReturn && !keep_full {
                    init.body = Block::empty(init.body.span);
                }
            }
            Member::Type(nested) => reduce_type(nested, keep, rules, policy),
            Member::Field(field) => {
                // Foreign field initialisers can reference arbitrarily much;
                // replace them with the type's default value.
                if policy == BodyPolicy::DefaultReturn {
                    if let Some(init) = &field.init {
                        let span = init.span();
                        field.init = default_value_expr(&field.ty, span);
                    }
                }
            }
        }
    }
}

fn default_return_body(return_type: &TypeRef, span: jess_core::Span) -> Block {
    match default_value_expr(return_type, span) {
        Some(value) => Block::new(
            vec![Stmt::Return {
                value: Some(value),
                span,
            }],
            span,
        ),
        None => Block::empty(span),
    }
}

fn default_value_expr(ty: &TypeRef, span: jess_core::Span) -> Option<Expr> {
    let text = ty.default_value_text()?;
    let kind = match text {
        "null" => LiteralKind::Null,
        "false" => LiteralKind::Bool,
        "'\\0'" => LiteralKind::Char,
        "0L" => LiteralKind::Long,
        "0.0f" => LiteralKind::Float,
        "0.0d" => LiteralKind::Double,
        _ => LiteralKind::Int,
    };
    Some(Expr::Literal(Literal::new(kind, text, span)))
}

/// Drops imports nothing in the unit still mentions. Asterisk imports are
/// kept or dropped wholesale per configuration.
fn strip_imports(unit: &mut CompilationUnit, config: &SliceConfig) {
    let mut used: BTreeSet<String> = BTreeSet::new();
    for decl in &unit.types {
        collect_used_names(decl, &mut used);
    }
    unit.imports.retain(|import| {
        if import.is_star {
            return config.keep_asterisk_imports;
        }
        let simple = import
            .path
            .rsplit('.')
            .next()
            .unwrap_or(import.path.as_str());
        used.contains(simple)
    });
}

fn collect_used_names(decl: &TypeDecl, out: &mut BTreeSet<String>) {
    fn from_type(ty: &TypeRef, out: &mut BTreeSet<String>) {
        match ty {
            TypeRef::Named(named) => {
                // Both the head segment (import-resolvable) and the simple
                // name count as uses.
                if let Some(head) = named.name.split('.').next() {
                    out.insert(head.to_string());
                }
                out.insert(named.written_simple_name().to_string());
                for arg in &named.args {
                    from_type(arg, out);
                }
            }
            TypeRef::Array { component, .. } => from_type(component, out),
            TypeRef::Wildcard {
                bound: Some((_, bound)),
                ..
            } => from_type(bound, out),
            _ => {}
        }
    }

    fn from_expr(expr: &Expr, out: &mut BTreeSet<String>) {
        match expr {
            Expr::Name(name) => {
                if let Some(head) = name.name.split('.').next() {
                    out.insert(head.to_string());
                }
            }
            Expr::FieldAccess { receiver, name, .. } => {
                out.insert(name.clone());
                from_expr(receiver, out);
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
                ..
            } => {
                out.insert(name.clone());
                if let Some(receiver) = receiver {
                    from_expr(receiver, out);
                }
                for arg in type_args {
                    from_type(arg, out);
                }
                for arg in args {
                    from_expr(arg, out);
                }
            }
            Expr::New { ty, args, .. } => {
                from_type(ty, out);
                for arg in args {
                    from_expr(arg, out);
                }
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                ..
            } => {
                from_type(element, out);
                for dim in dims.iter().flatten() {
                    from_expr(dim, out);
                }
                for value in initializer.iter().flatten() {
                    from_expr(value, out);
                }
            }
            Expr::Cast { ty, value, .. } => {
                from_type(ty, out);
                from_expr(value, out);
            }
            Expr::InstanceOf { value, ty, .. } => {
                from_expr(value, out);
                from_type(ty, out);
            }
            Expr::Lambda { params, body, .. } => {
                for param in params {
                    if let Some(ty) = &param.ty {
                        from_type(ty, out);
                    }
                }
                match body {
                    jess_ast::LambdaBody::Expr(value) => from_expr(value, out),
                    jess_ast::LambdaBody::Block(block) => from_block(block, out),
                }
            }
            Expr::MethodRef { target, .. } => match target {
                jess_ast::MethodRefTarget::Expr(value) => from_expr(value, out),
                jess_ast::MethodRefTarget::Type(ty) => from_type(ty, out),
            },
            Expr::Assign { lhs, rhs, .. } => {
                from_expr(lhs, out);
                from_expr(rhs, out);
            }
            Expr::Binary { lhs, rhs, .. } => {
                from_expr(lhs, out);
                from_expr(rhs, out);
            }
            Expr::Unary { value, .. } | Expr::Paren { value, .. } => from_expr(value, out),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => {
                from_expr(cond, out);
                from_expr(then_value, out);
                from_expr(else_value, out);
            }
            Expr::ArrayIndex { array, index, .. } => {
                from_expr(array, out);
                from_expr(index, out);
            }
            Expr::ClassLiteral { ty, .. } => from_type(ty, out),
            Expr::ArrayInit { values, .. } => {
                for value in values {
                    from_expr(value, out);
                }
            }
            Expr::Literal(_) | Expr::This { .. } | Expr::SuperRef { .. } => {}
        }
    }

    fn from_block(block: &Block, out: &mut BTreeSet<String>) {
        for stmt in &block.statements {
            from_stmt(stmt, out);
        }
    }

    fn from_stmt(stmt: &Stmt, out: &mut BTreeSet<String>) {
        match stmt {
            Stmt::Block(block) => from_block(block, out),
            Stmt::Local(local) => {
                from_type(&local.ty, out);
                if let Some(init) = &local.init {
                    from_expr(init, out);
                }
            }
            Stmt::Expr(expr) => from_expr(expr, out),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    from_expr(value, out);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                from_expr(cond, out);
                from_stmt(then_branch, out);
                if let Some(else_branch) = else_branch {
                    from_stmt(else_branch, out);
                }
            }
            Stmt::While { cond, body, .. } => {
                from_expr(cond, out);
                from_stmt(body, out);
            }
            Stmt::Throw { value, .. } => from_expr(value, out),
            Stmt::Empty(_) => {}
        }
    }

    for ann in &decl.annotations {
        out.insert(ann.ty.written_simple_name().to_string());
    }
    if let Some(superclass) = &decl.superclass {
        from_type(superclass, out);
    }
    for iface in &decl.interfaces {
        from_type(iface, out);
    }
    for param in &decl.type_params {
        for bound in &param.bounds {
            from_type(bound, out);
        }
    }
    for member in &decl.members {
        match member {
            Member::Field(field) => {
                for ann in &field.annotations {
                    out.insert(ann.ty.written_simple_name().to_string());
                }
                from_type(&field.ty, out);
                if let Some(init) = &field.init {
                    from_expr(init, out);
                }
            }
            Member::Method(method) => {
                for ann in &method.annotations {
                    out.insert(ann.ty.written_simple_name().to_string());
                }
                from_type(&method.return_type, out);
                for param in &method.params {
                    from_type(&param.ty, out);
                }
                for thrown in &method.throws {
                    from_type(thrown, out);
                }
                if let Some(body) = &method.body {
                    from_block(body, out);
                }
            }
            Member::Constructor(ctor) => {
                for param in &ctor.params {
                    from_type(&param.ty, out);
                }
                for thrown in &ctor.throws {
                    from_type(thrown, out);
                }
                from_block(&ctor.body, out);
            }
            Member::Initializer(init) => from_block(&init.body, out),
            Member::Type(nested) => collect_used_names(nested, out),
        }
    }
}
