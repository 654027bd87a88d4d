//! Deterministic Java source emission.
//!
//! The printer renders a compilation unit back to Java source with a fixed
//! layout (four-space indent, one blank line between members, members in
//! stored order), so repeated runs over identical inputs emit byte-identical
//! files.

use crate::decl::{
    AnnotationArg, AnnotationUse, CompilationUnit, ConstructorDecl, FieldDecl, InitializerDecl,
    Member, MethodDecl, Param, TypeDecl, TypeKind, TypeParam,
};
use crate::expr::{Expr, LambdaBody, MethodRefTarget};
use crate::stmt::{Block, Stmt};
use crate::types::TypeRef;

/// Renders `unit` as Java source.
pub fn print_unit(unit: &CompilationUnit) -> String {
    let mut printer = Printer::new();
    printer.unit(unit);
    printer.out
}

/// Renders a type reference as source text (`java.util.List<T>[]`).
///
/// Binary nesting separators are respelled for source (`p.Outer$Inner` →
/// `p.Outer.Inner`).
pub fn render_type_ref(ty: &TypeRef) -> String {
    match ty {
        TypeRef::Primitive(kind, _) => kind.keyword().to_string(),
        TypeRef::Void(_) => "void".to_string(),
        TypeRef::Named(named) => {
            let mut text = named.name.replace('$', ".");
            if !named.args.is_empty() {
                let args: Vec<String> = named.args.iter().map(render_type_ref).collect();
                text.push('<');
                text.push_str(&args.join(", "));
                text.push('>');
            }
            text
        }
        TypeRef::Array { component, .. } => {
            format!("{}[]", render_type_ref(component))
        }
        TypeRef::Wildcard { bound, .. } => match bound {
            None => "?".to_string(),
            Some((kind, ty)) => {
                let keyword = match kind {
                    crate::types::WildcardBound::Extends => "extends",
                    crate::types::WildcardBound::Super => "super",
                };
                format!("? {keyword} {}", render_type_ref(ty))
            }
        },
    }
}

struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
        }
    }

    fn line(&mut self, text: &str) {
        self.write_indent();
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn blank(&mut self) {
        if !self.out.ends_with("\n\n") && !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn unit(&mut self, unit: &CompilationUnit) {
        if let Some(package) = &unit.package {
            self.line(&format!("package {package};"));
        }
        if !unit.imports.is_empty() {
            self.blank();
            for import in &unit.imports {
                let kw = if import.is_static {
                    "import static"
                } else {
                    "import"
                };
                let star = if import.is_star { ".*" } else { "" };
                self.line(&format!("{kw} {}{star};", import.path));
            }
        }
        for decl in &unit.types {
            self.blank();
            self.type_decl(decl);
        }
    }

    fn type_decl(&mut self, decl: &TypeDecl) {
        for ann in &decl.annotations {
            let rendered = self.render_annotation(ann);
            self.line(&rendered);
        }

        let mut header = String::new();
        for word in decl.modifiers.keywords() {
            // `default`/`abstract` markers are member-level; types never
            // print `default`.
            if word == "default" {
                continue;
            }
            header.push_str(word);
            header.push(' ');
        }
        header.push_str(decl.kind.keyword());
        header.push(' ');
        header.push_str(&decl.name);
        header.push_str(&self.render_type_params(&decl.type_params));

        if let Some(superclass) = &decl.superclass {
            header.push_str(" extends ");
            header.push_str(&self.render_type(superclass));
        }
        if !decl.interfaces.is_empty() {
            let clause = match decl.kind {
                TypeKind::Interface => " extends ",
                _ => " implements ",
            };
            header.push_str(clause);
            let rendered: Vec<String> = decl
                .interfaces
                .iter()
                .map(|iface| self.render_type(iface))
                .collect();
            header.push_str(&rendered.join(", "));
        }
        header.push_str(" {");
        self.line(&header);
        self.indent += 1;

        if decl.kind == TypeKind::Enum {
            let constants: Vec<String> = decl
                .enum_constants
                .iter()
                .map(|constant| {
                    if constant.args.is_empty() {
                        constant.name.clone()
                    } else {
                        let args: Vec<String> = constant
                            .args
                            .iter()
                            .map(|arg| self.render_expr(arg))
                            .collect();
                        format!("{}({})", constant.name, args.join(", "))
                    }
                })
                .collect();
            if constants.is_empty() {
                self.line(";");
            } else {
                self.line(&format!("{};", constants.join(", ")));
            }
        }

        let mut first = true;
        for member in &decl.members {
            if !first || decl.kind == TypeKind::Enum {
                self.blank();
            }
            first = false;
            self.member(decl.kind, member);
        }

        self.indent -= 1;
        self.line("}");
    }

    fn member(&mut self, owner_kind: TypeKind, member: &Member) {
        match member {
            Member::Field(field) => self.field(field),
            Member::Method(method) => self.method(owner_kind, method),
            Member::Constructor(ctor) => self.constructor(ctor),
            Member::Initializer(init) => self.initializer(init),
            Member::Type(nested) => self.type_decl(nested),
        }
    }

    fn field(&mut self, field: &FieldDecl) {
        for ann in &field.annotations {
            let rendered = self.render_annotation(ann);
            self.line(&rendered);
        }
        let mut line = String::new();
        for word in field.modifiers.keywords() {
            line.push_str(word);
            line.push(' ');
        }
        line.push_str(&self.render_type(&field.ty));
        line.push(' ');
        line.push_str(&field.name);
        if let Some(init) = &field.init {
            line.push_str(" = ");
            line.push_str(&self.render_expr(init));
        }
        line.push(';');
        self.line(&line);
    }

    fn method(&mut self, owner_kind: TypeKind, method: &MethodDecl) {
        for ann in &method.annotations {
            let rendered = self.render_annotation(ann);
            self.line(&rendered);
        }
        let mut header = String::new();
        for word in method.modifiers.keywords() {
            // `abstract` is implicit on interface and annotation members.
            if word == "abstract"
                && matches!(owner_kind, TypeKind::Interface | TypeKind::Annotation)
            {
                continue;
            }
            header.push_str(word);
            header.push(' ');
        }
        let generics = self.render_type_params(&method.type_params);
        if !generics.is_empty() {
            header.push_str(&generics);
            header.push(' ');
        }
        header.push_str(&self.render_type(&method.return_type));
        header.push(' ');
        header.push_str(&method.name);
        header.push('(');
        header.push_str(&self.render_params(&method.params, method.varargs));
        header.push(')');
        if !method.throws.is_empty() {
            header.push_str(" throws ");
            let rendered: Vec<String> = method
                .throws
                .iter()
                .map(|thrown| self.render_type(thrown))
                .collect();
            header.push_str(&rendered.join(", "));
        }
        if let Some(default_value) = &method.annotation_default {
            header.push_str(" default ");
            header.push_str(&self.render_expr(default_value));
        }
        match &method.body {
            Some(body) => {
                header.push_str(" {");
                self.line(&header);
                self.block_contents(body);
                self.line("}");
            }
            None => {
                header.push(';');
                self.line(&header);
            }
        }
    }

    fn constructor(&mut self, ctor: &ConstructorDecl) {
        for ann in &ctor.annotations {
            let rendered = self.render_annotation(ann);
            self.line(&rendered);
        }
        let mut header = String::new();
        for word in ctor.modifiers.keywords() {
            header.push_str(word);
            header.push(' ');
        }
        let generics = self.render_type_params(&ctor.type_params);
        if !generics.is_empty() {
            header.push_str(&generics);
            header.push(' ');
        }
        header.push_str(&ctor.name);
        header.push('(');
        header.push_str(&self.render_params(&ctor.params, ctor.varargs));
        header.push(')');
        if !ctor.throws.is_empty() {
            header.push_str(" throws ");
            let rendered: Vec<String> = ctor
                .throws
                .iter()
                .map(|thrown| self.render_type(thrown))
                .collect();
            header.push_str(&rendered.join(", "));
        }
        header.push_str(" {");
        self.line(&header);
        self.block_contents(&ctor.body);
        self.line("}");
    }

    fn initializer(&mut self, init: &InitializerDecl) {
        if init.is_static {
            self.line("static {");
        } else {
            self.line("{");
        }
        self.block_contents(&init.body);
        self.line("}");
    }

    fn block_contents(&mut self, block: &Block) {
        self.indent += 1;
        for stmt in &block.statements {
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    /// Prints an `if`/`while` branch between already-emitted braces,
    /// flattening a block branch so reprints are stable.
    fn branch(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.block_contents(block),
            other => {
                self.indent += 1;
                self.stmt(other);
                self.indent -= 1;
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => {
                self.line("{");
                self.block_contents(block);
                self.line("}");
            }
            Stmt::Local(local) => {
                let mut line = String::new();
                line.push_str(&self.render_type(&local.ty));
                line.push(' ');
                line.push_str(&local.name);
                if let Some(init) = &local.init {
                    line.push_str(" = ");
                    line.push_str(&self.render_expr(init));
                }
                line.push(';');
                self.line(&line);
            }
            Stmt::Expr(expr) => {
                let rendered = self.render_expr(expr);
                self.line(&format!("{rendered};"));
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => {
                    let rendered = self.render_expr(value);
                    self.line(&format!("return {rendered};"));
                }
                None => self.line("return;"),
            },
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let rendered = self.render_expr(cond);
                self.line(&format!("if ({rendered}) {{"));
                self.branch(then_branch);
                match else_branch {
                    Some(else_branch) => {
                        self.line("} else {");
                        self.branch(else_branch);
                        self.line("}");
                    }
                    None => self.line("}"),
                }
            }
            Stmt::While { cond, body, .. } => {
                let rendered = self.render_expr(cond);
                self.line(&format!("while ({rendered}) {{"));
                self.branch(body);
                self.line("}");
            }
            Stmt::Throw { value, .. } => {
                let rendered = self.render_expr(value);
                self.line(&format!("throw {rendered};"));
            }
            Stmt::Empty(_) => self.line(";"),
        }
    }

    fn render_params(&self, params: &[Param], varargs: bool) -> String {
        let mut rendered = Vec::with_capacity(params.len());
        for (idx, param) in params.iter().enumerate() {
            let mut text = String::new();
            for ann in &param.annotations {
                text.push_str(&self.render_annotation(ann));
                text.push(' ');
            }
            let is_last = idx + 1 == params.len();
            if varargs && is_last {
                // The vararg parameter is stored as an array; print the
                // component with `...`.
                match &param.ty {
                    TypeRef::Array { component, .. } => {
                        text.push_str(&self.render_type(component));
                        text.push_str("...");
                    }
                    other => text.push_str(&self.render_type(other)),
                }
            } else {
                text.push_str(&self.render_type(&param.ty));
            }
            text.push(' ');
            text.push_str(&param.name);
            rendered.push(text);
        }
        rendered.join(", ")
    }

    fn render_type_params(&self, params: &[TypeParam]) -> String {
        if params.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = params
            .iter()
            .map(|param| {
                if param.bounds.is_empty() {
                    param.name.clone()
                } else {
                    let bounds: Vec<String> = param
                        .bounds
                        .iter()
                        .map(|bound| self.render_type(bound))
                        .collect();
                    format!("{} extends {}", param.name, bounds.join(" & "))
                }
            })
            .collect();
        format!("<{}>", rendered.join(", "))
    }

    fn render_type(&self, ty: &TypeRef) -> String {
        render_type_ref(ty)
    }

    fn render_annotation(&self, ann: &AnnotationUse) -> String {
        let mut text = format!("@{}", ann.ty.name.replace('$', "."));
        if !ann.args.is_empty() {
            let args: Vec<String> = ann
                .args
                .iter()
                .map(|arg| match arg {
                    AnnotationArg::Value(value) => self.render_expr(value),
                    AnnotationArg::Named { name, value } => {
                        format!("{name} = {}", self.render_expr(value))
                    }
                })
                .collect();
            text.push('(');
            text.push_str(&args.join(", "));
            text.push(')');
        }
        text
    }

    fn render_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(lit) => lit.text.clone(),
            Expr::Name(name) => name.name.clone(),
            Expr::This { .. } => "this".to_string(),
            Expr::SuperRef { qualifier, .. } => match qualifier {
                Some(qualifier) => format!("{}.super", qualifier.name),
                None => "super".to_string(),
            },
            Expr::FieldAccess { receiver, name, .. } => {
                format!("{}.{name}", self.render_expr(receiver))
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
                ..
            } => {
                let mut text = String::new();
                if let Some(receiver) = receiver {
                    text.push_str(&self.render_expr(receiver));
                    text.push('.');
                }
                if !type_args.is_empty() {
                    let rendered: Vec<String> =
                        type_args.iter().map(|arg| self.render_type(arg)).collect();
                    text.push('<');
                    text.push_str(&rendered.join(", "));
                    text.push('>');
                }
                text.push_str(name);
                text.push('(');
                let rendered: Vec<String> = args.iter().map(|arg| self.render_expr(arg)).collect();
                text.push_str(&rendered.join(", "));
                text.push(')');
                text
            }
            Expr::New { ty, args, .. } => {
                let rendered: Vec<String> = args.iter().map(|arg| self.render_expr(arg)).collect();
                format!("new {}({})", self.render_type(ty), rendered.join(", "))
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                ..
            } => {
                let mut text = format!("new {}", self.render_type(element));
                for dim in dims {
                    match dim {
                        Some(size) => {
                            text.push('[');
                            text.push_str(&self.render_expr(size));
                            text.push(']');
                        }
                        None => text.push_str("[]"),
                    }
                }
                if let Some(values) = initializer {
                    let rendered: Vec<String> =
                        values.iter().map(|value| self.render_expr(value)).collect();
                    text.push_str(&format!(" {{ {} }}", rendered.join(", ")));
                }
                text
            }
            Expr::Cast { ty, value, .. } => {
                format!("({}) {}", self.render_type(ty), self.render_expr(value))
            }
            Expr::InstanceOf { value, ty, .. } => {
                format!(
                    "{} instanceof {}",
                    self.render_expr(value),
                    self.render_type(ty)
                )
            }
            Expr::Lambda { params, body, .. } => {
                let header = if params.len() == 1 && params[0].ty.is_none() {
                    params[0].name.clone()
                } else {
                    let rendered: Vec<String> = params
                        .iter()
                        .map(|param| match &param.ty {
                            Some(ty) => format!("{} {}", self.render_type(ty), param.name),
                            None => param.name.clone(),
                        })
                        .collect();
                    format!("({})", rendered.join(", "))
                };
                match body {
                    LambdaBody::Expr(value) => format!("{header} -> {}", self.render_expr(value)),
                    LambdaBody::Block(block) => {
                        // Block-bodied lambdas are rendered on one line; the
                        // emitted code is for the compiler, not for humans.
                        let rendered: Vec<String> = block
                            .statements
                            .iter()
                            .map(|stmt| self.render_stmt_inline(stmt))
                            .collect();
                        format!("{header} -> {{ {} }}", rendered.join(" "))
                    }
                }
            }
            Expr::MethodRef { target, name, .. } => match target {
                MethodRefTarget::Expr(value) => format!("{}::{name}", self.render_expr(value)),
                MethodRefTarget::Type(ty) => format!("{}::{name}", self.render_type(ty)),
            },
            Expr::Assign { lhs, op, rhs, .. } => {
                let op = op.unwrap_or("=");
                format!("{} {op} {}", self.render_expr(lhs), self.render_expr(rhs))
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                format!("{} {op} {}", self.render_expr(lhs), self.render_expr(rhs))
            }
            Expr::Unary { op, value, .. } => {
                if op.is_postfix() {
                    format!("{}{}", self.render_expr(value), op.spelling())
                } else {
                    format!("{}{}", op.spelling(), self.render_expr(value))
                }
            }
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => format!(
                "{} ? {} : {}",
                self.render_expr(cond),
                self.render_expr(then_value),
                self.render_expr(else_value)
            ),
            Expr::ArrayIndex { array, index, .. } => {
                format!("{}[{}]", self.render_expr(array), self.render_expr(index))
            }
            Expr::Paren { value, .. } => format!("({})", self.render_expr(value)),
            Expr::ClassLiteral { ty, .. } => format!("{}.class", self.render_type(ty)),
            Expr::ArrayInit { values, .. } => {
                let rendered: Vec<String> =
                    values.iter().map(|value| self.render_expr(value)).collect();
                format!("{{ {} }}", rendered.join(", "))
            }
        }
    }

    fn render_stmt_inline(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expr(expr) => format!("{};", self.render_expr(expr)),
            Stmt::Return { value: Some(v), .. } => format!("return {};", self.render_expr(v)),
            Stmt::Return { value: None, .. } => "return;".to_string(),
            Stmt::Throw { value, .. } => format!("throw {};", self.render_expr(value)),
            Stmt::Local(local) => {
                let mut text = format!("{} {}", self.render_type(&local.ty), local.name);
                if let Some(init) = &local.init {
                    text.push_str(" = ");
                    text.push_str(&self.render_expr(init));
                }
                text.push(';');
                text
            }
            Stmt::Empty(_) => ";".to_string(),
            other => {
                // Nested control flow inside a lambda block is outside the
                // one-line rendering; fall back to a braced sub-render.
                let mut printer = Printer::new();
                printer.stmt(other);
                printer.out.replace('\n', " ").trim_end().to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NamedType, PrimitiveKind};
    use jess_core::Span;

    #[test]
    fn renders_nested_and_generic_types() {
        let span = Span::default();
        let mut list = NamedType::new("java.util.List", span);
        list.args = vec![TypeRef::named("p.Outer$Inner", span)];
        assert_eq!(
            render_type_ref(&TypeRef::Named(list)),
            "java.util.List<p.Outer.Inner>"
        );
        assert_eq!(
            render_type_ref(&TypeRef::array_of(
                TypeRef::Primitive(PrimitiveKind::Byte, span),
                span
            )),
            "byte[]"
        );
    }

    #[test]
    fn default_values_cover_all_primitives() {
        let span = Span::default();
        let cases = [
            (PrimitiveKind::Boolean, "false"),
            (PrimitiveKind::Char, "'\\0'"),
            (PrimitiveKind::Long, "0L"),
            (PrimitiveKind::Float, "0.0f"),
            (PrimitiveKind::Double, "0.0d"),
            (PrimitiveKind::Int, "0"),
            (PrimitiveKind::Byte, "0"),
            (PrimitiveKind::Short, "0"),
        ];
        for (kind, expected) in cases {
            let ty = TypeRef::Primitive(kind, span);
            assert_eq!(ty.default_value_text(), Some(expected));
        }
        assert_eq!(TypeRef::Void(span).default_value_text(), None);
        assert_eq!(
            TypeRef::named("p.Foo", span).default_value_text(),
            Some("null")
        );
    }
}
