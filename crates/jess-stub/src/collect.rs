//! The collector: scan the sliced model and plan a stub for every
//! unresolved reference.
//!
//! Inference is contextual: the expected type flows down the expression
//! tree (assignment targets, declared variable types, return types, cast
//! targets, known callee parameters), and `unknown.Unknown` is the fallback
//! when nothing better is known.

use crate::plan::{
    CtorStubPlan, FieldStubPlan, ImplementsPlan, MethodStubPlan, PlanSet, StubPlan, TypeStubPlan,
};
use crate::TYPE_PARAM_NAMES;
use jess_ast::{
    AnnotationArg, Block, CompilationUnit, Expr, LambdaBody, Member, MethodRefTarget, NamedType,
    PrimitiveKind, Resolution, Stmt, SymbolKind, TypeDecl, TypeKind, TypeRef, UnresolvedKind,
};
use jess_core::{unknown_type, Fqn, Span};
use jess_resolve::{ExprTyper, ResolutionOracle, TypeEnv};
use jess_slice::SlicedModel;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Scans `model` and returns the planned stubs.
pub fn collect_plans(model: &SlicedModel, oracle: &dyn ResolutionOracle) -> PlanSet {
    let mut declared = BTreeMap::new();
    for unit in model.units() {
        let package = unit.package.clone().unwrap_or_default();
        for decl in &unit.types {
            register_declared(&mut declared, Fqn::from_parts(&package, &decl.name), decl);
        }
    }
    let mut collector = Collector {
        oracle,
        declared,
        plans: PlanSet::default(),
        package: String::new(),
    };
    for unit in model.units() {
        collector.scan_unit(unit);
    }
    collector.plans
}

fn register_declared(out: &mut BTreeMap<Fqn, TypeKind>, fqn: Fqn, decl: &TypeDecl) {
    for nested in decl.nested_types() {
        register_declared(out, fqn.nest(&nested.name), nested);
    }
    out.insert(fqn, decl.kind);
}

struct Collector<'a> {
    oracle: &'a dyn ResolutionOracle,
    /// Types present in the sliced model; member plans may target them.
    declared: BTreeMap<Fqn, TypeKind>,
    plans: PlanSet,
    /// Package of the unit currently being scanned.
    package: String,
}

struct BodyScope {
    env: TypeEnv,
    fields: HashMap<String, TypeRef>,
    enclosing: Fqn,
    return_type: Option<TypeRef>,
}

impl<'a> Collector<'a> {
    fn scan_unit(&mut self, unit: &CompilationUnit) {
        let package = unit.package.clone().unwrap_or_default();
        self.package = package.clone();
        for decl in &unit.types {
            self.scan_type(decl, Fqn::from_parts(&package, &decl.name));
        }
    }

    fn scan_type(&mut self, decl: &TypeDecl, fqn: Fqn) {
        for ann in &decl.annotations {
            self.plan_annotation_use(ann);
        }
        for param in &decl.type_params {
            for bound in &param.bounds {
                self.plan_type_ref(bound, TypeKind::Class);
            }
        }
        if let Some(superclass) = &decl.superclass {
            let hint = match decl.kind {
                TypeKind::Interface => TypeKind::Interface,
                _ => TypeKind::Class,
            };
            self.plan_type_ref(superclass, hint);
        }
        for iface in &decl.interfaces {
            self.plan_type_ref(iface, TypeKind::Interface);
        }

        let fields: HashMap<String, TypeRef> = decl
            .fields()
            .map(|field| (field.name.clone(), field.ty.clone()))
            .collect();

        for member in &decl.members {
            match member {
                Member::Field(field) => {
                    for ann in &field.annotations {
                        self.plan_annotation_use(ann);
                    }
                    self.plan_type_ref(&field.ty, TypeKind::Class);
                    if let Some(init) = &field.init {
                        let mut scope = BodyScope {
                            env: TypeEnv::new(),
                            fields: fields.clone(),
                            enclosing: fqn.clone(),
                            return_type: None,
                        };
                        scope.env.push_scope();
                        self.walk_expr(init, Some(&field.ty.clone()), false, &mut scope);
                    }
                }
                Member::Method(method) => {
                    for ann in &method.annotations {
                        self.plan_annotation_use(ann);
                    }
                    for param in &method.type_params {
                        for bound in &param.bounds {
                            self.plan_type_ref(bound, TypeKind::Class);
                        }
                    }
                    self.plan_type_ref(&method.return_type, TypeKind::Class);
                    for param in &method.params {
                        self.plan_type_ref(&param.ty, TypeKind::Class);
                    }
                    for thrown in &method.throws {
                        self.plan_type_ref(thrown, TypeKind::Class);
                    }
                    if let Some(body) = &method.body {
                        let mut scope = BodyScope {
                            env: TypeEnv::new(),
                            fields: fields.clone(),
                            enclosing: fqn.clone(),
                            return_type: Some(method.return_type.clone()),
                        };
                        scope.env.push_scope();
                        for param in &method.params {
                            scope.env.insert(param.name.clone(), param.ty.clone());
                        }
                        self.walk_block(body, &mut scope);
                    }
                }
                Member::Constructor(ctor) => {
                    for param in &ctor.params {
                        self.plan_type_ref(&param.ty, TypeKind::Class);
                    }
                    for thrown in &ctor.throws {
                        self.plan_type_ref(thrown, TypeKind::Class);
                    }
                    let mut scope = BodyScope {
                        env: TypeEnv::new(),
                        fields: fields.clone(),
                        enclosing: fqn.clone(),
                        return_type: None,
                    };
                    scope.env.push_scope();
                    for param in &ctor.params {
                        scope.env.insert(param.name.clone(), param.ty.clone());
                    }
                    self.walk_block(&ctor.body, &mut scope);
                }
                Member::Initializer(init) => {
                    let mut scope = BodyScope {
                        env: TypeEnv::new(),
                        fields: fields.clone(),
                        enclosing: fqn.clone(),
                        return_type: None,
                    };
                    scope.env.push_scope();
                    self.walk_block(&init.body, &mut scope);
                }
                Member::Type(nested) => {
                    self.scan_type(nested, fqn.nest(&nested.name));
                }
            }
        }

        for constant in &decl.enum_constants {
            let mut scope = BodyScope {
                env: TypeEnv::new(),
                fields: fields.clone(),
                enclosing: fqn.clone(),
                return_type: None,
            };
            scope.env.push_scope();
            for arg in &constant.args {
                self.walk_expr(arg, None, false, &mut scope);
            }
        }
    }

    // ---- type references --------------------------------------------------

    fn plan_annotation_use(&mut self, ann: &jess_ast::AnnotationUse) {
        self.plan_named(&ann.ty, TypeKind::Annotation);
        for arg in &ann.args {
            let value = match arg {
                AnnotationArg::Value(value) => value,
                AnnotationArg::Named { value, .. } => value,
            };
            self.walk_annotation_value(value);
        }
    }

    fn walk_annotation_value(&mut self, value: &Expr) {
        match value {
            Expr::ArrayInit { values, .. } => {
                for value in values {
                    self.walk_annotation_value(value);
                }
            }
            Expr::ClassLiteral { ty, .. } => self.plan_type_ref(ty, TypeKind::Class),
            Expr::FieldAccess { receiver, .. } => {
                // Typically an enum constant reference (`Color.RED`); plan
                // the qualifying type as an enum. Platform meta-annotation
                // arguments (`ElementType.METHOD`) are canonicalised later
                // instead.
                if let Expr::Name(name) = receiver.as_ref() {
                    if matches!(name.name.as_str(), "ElementType" | "RetentionPolicy") {
                        return;
                    }
                    if name.resolution.symbol().is_none() {
                        let written = if name.name.contains('.') || self.package.is_empty() {
                            name.name.clone()
                        } else {
                            format!("{}.{}", self.package, name.name)
                        };
                        if let Some(fqn) = self.candidate_fqn(&written) {
                            self.push_type_plan(TypeStubPlan::new(fqn, TypeKind::Enum));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn plan_type_ref(&mut self, ty: &TypeRef, hint: TypeKind) {
        match ty {
            TypeRef::Primitive(..) | TypeRef::Void(_) => {}
            TypeRef::Named(named) => self.plan_named(named, hint),
            TypeRef::Array { component, .. } => self.plan_type_ref(component, hint),
            TypeRef::Wildcard { bound, .. } => {
                if let Some((_, bound_ty)) = bound {
                    self.plan_type_ref(bound_ty, TypeKind::Class);
                }
            }
        }
    }

    fn plan_named(&mut self, named: &NamedType, hint: TypeKind) {
        for arg in &named.args {
            self.plan_type_ref(arg, TypeKind::Class);
        }
        let fqn = named.denoted_fqn();
        if !named.args.is_empty() {
            self.plans.note_generic_arity(fqn.clone(), named.args.len());
        }
        if !matches!(
            named.resolution,
            Resolution::Unresolved(ref unresolved) if unresolved.kind == UnresolvedKind::Type
        ) {
            return;
        }
        if let Some(fqn) = self.candidate_fqn(named.name.as_str()) {
            self.push_type_plan(TypeStubPlan::new(fqn, hint));
        }
    }

    /// Validates a written name as a stub-plan FQN. JDK-rooted names,
    /// primitive spellings, and malformed names are rejected outright.
    fn candidate_fqn(&self, written: &str) -> Option<Fqn> {
        if written.is_empty() || written.ends_with('.') {
            return None;
        }
        let fqn = Fqn::new(written);
        if fqn.is_jdk() {
            return None;
        }
        let simple = fqn.simple_name();
        if simple.is_empty() || PrimitiveKind::from_keyword(simple).is_some() {
            return None;
        }
        for segment in written.split(['.', '$']) {
            if segment.is_empty() || !is_valid_identifier(segment) {
                debug!(name = written, "rejecting malformed stub candidate");
                return None;
            }
        }
        Some(fqn)
    }

    fn push_type_plan(&mut self, plan: TypeStubPlan) {
        self.plans.push(StubPlan::Type(plan));
    }

    // ---- bodies -----------------------------------------------------------

    fn walk_block(&mut self, block: &Block, scope: &mut BodyScope) {
        scope.env.push_scope();
        for stmt in &block.statements {
            self.walk_stmt(stmt, scope);
        }
        scope.env.pop_scope();
    }

    fn walk_stmt(&mut self, stmt: &Stmt, scope: &mut BodyScope) {
        match stmt {
            Stmt::Block(block) => self.walk_block(block, scope),
            Stmt::Local(local) => {
                self.plan_type_ref(&local.ty, TypeKind::Class);
                if let Some(init) = &local.init {
                    let expected = local.ty.clone();
                    self.walk_expr(init, Some(&expected), false, scope);
                }
                scope.env.insert(local.name.clone(), local.ty.clone());
            }
            Stmt::Expr(expr) => {
                self.walk_expr(expr, None, false, scope);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    let expected = scope.return_type.clone();
                    self.walk_expr(value, expected.as_ref(), false, scope);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.walk_expr(cond, None, false, scope);
                self.walk_stmt(then_branch, scope);
                if let Some(else_branch) = else_branch {
                    self.walk_stmt(else_branch, scope);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.walk_expr(cond, None, false, scope);
                self.walk_stmt(body, scope);
            }
            Stmt::Throw { value, .. } => {
                self.walk_expr(value, None, false, scope);
            }
            Stmt::Empty(_) => {}
        }
    }

    /// Walks an expression, planning stubs for unresolved references, and
    /// returns the best-known type of the expression. `expected` is the
    /// context type flowing down; `as_receiver` marks an expression used as
    /// a call/field receiver, which licenses fabricating an
    /// `unknown.`-rooted type for it.
    fn walk_expr(
        &mut self,
        expr: &Expr,
        expected: Option<&TypeRef>,
        as_receiver: bool,
        scope: &mut BodyScope,
    ) -> Option<TypeRef> {
        match expr {
            Expr::Literal(_) => self.shallow_type(expr, scope),
            Expr::This { .. } => Some(TypeRef::Named(NamedType::new(
                scope.enclosing.as_str(),
                expr.span(),
            ))),
            Expr::SuperRef { .. } => None,
            Expr::Name(name) => {
                match &name.resolution {
                    Resolution::Unresolved(unresolved)
                        if unresolved.kind == UnresolvedKind::Field =>
                    {
                        // A capitalized unresolved receiver is read as a
                        // type name in the unit's package, not a variable.
                        if as_receiver
                            && name.name.chars().next().is_some_and(char::is_uppercase)
                        {
                            let written = if self.package.is_empty() {
                                name.name.clone()
                            } else {
                                format!("{}.{}", self.package, name.name)
                            };
                            if let Some(fqn) = self.candidate_fqn(&written) {
                                self.push_type_plan(TypeStubPlan::new(
                                    fqn.clone(),
                                    TypeKind::Class,
                                ));
                                return Some(TypeRef::Named(NamedType::new(
                                    fqn.as_str(),
                                    name.span,
                                )));
                            }
                        }
                        let owner = unresolved
                            .owner
                            .clone()
                            .unwrap_or_else(|| scope.enclosing.clone());
                        let ty = if as_receiver {
                            self.fabricate_unknown(&name.name, name.span)
                        } else {
                            match expected {
                                Some(expected) => expected.clone(),
                                None => {
                                    self.ensure_unknown_planned(
                                        unknown_type().as_str(),
                                        name.span,
                                    );
                                    unknown_ref(name.span)
                                }
                            }
                        };
                        self.plans.push(StubPlan::Field(FieldStubPlan {
                            owner,
                            name: name.name.clone(),
                            ty: ty.clone(),
                            is_static: unresolved.static_ctx,
                        }));
                        Some(ty)
                    }
                    _ => self.shallow_type(expr, scope),
                }
            }
            Expr::FieldAccess {
                receiver,
                name,
                resolution,
                span,
            } => {
                match resolution {
                    Resolution::Unresolved(unresolved) => {
                        let receiver_ty = self.walk_expr(receiver, None, true, scope);
                        let owner = unresolved
                            .owner
                            .clone()
                            .or_else(|| named_fqn(receiver_ty.as_ref()));
                        let ty = if as_receiver {
                            self.fabricate_unknown(name, *span)
                        } else {
                            expected.cloned().unwrap_or_else(|| unknown_ref(*span))
                        };
                        if let Some(owner) = owner {
                            if owner.is_jdk() {
                                debug!(owner = %owner, field = name, "skipping JDK-owned field plan");
                            } else {
                                self.ensure_owner_planned(&owner);
                                self.plans.push(StubPlan::Field(FieldStubPlan {
                                    owner,
                                    name: name.clone(),
                                    ty: ty.clone(),
                                    is_static: unresolved.static_ctx,
                                }));
                            }
                        }
                        Some(ty)
                    }
                    _ => {
                        self.walk_expr(receiver, None, true, scope);
                        self.shallow_type(expr, scope)
                    }
                }
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
                resolution,
                span,
            } => {
                for arg in type_args {
                    self.plan_type_ref(arg, TypeKind::Class);
                }
                let receiver_ty = receiver
                    .as_ref()
                    .and_then(|receiver| self.walk_expr(receiver, None, true, scope));

                // Walk arguments with the callee's declared parameter types
                // as context when the callee is known.
                let param_ctx = self.known_param_types(resolution, name, args.len());
                let mut arg_types = Vec::with_capacity(args.len());
                for (pos, arg) in args.iter().enumerate() {
                    let ctx = param_ctx.as_ref().and_then(|params| params.get(pos));
                    arg_types.push(self.walk_expr(arg, ctx, false, scope));
                }

                match resolution {
                    Resolution::Unresolved(unresolved)
                        if matches!(
                            unresolved.kind,
                            UnresolvedKind::Method | UnresolvedKind::Ctor
                        ) =>
                    {
                        let owner = unresolved
                            .owner
                            .clone()
                            .or_else(|| named_fqn(receiver_ty.as_ref()));
                        let Some(owner) = owner else {
                            debug!(method = name, "no owner inferable; skipping method plan");
                            return expected.cloned();
                        };
                        if owner.is_jdk() {
                            debug!(owner = %owner, method = name, "skipping JDK-owned method plan");
                            return expected.cloned();
                        }

                        // Enum helper calls flip the owner to an enum and
                        // need no synthetic method.
                        if is_enum_helper(name, args.len()) {
                            self.push_type_plan(TypeStubPlan::new(owner.clone(), TypeKind::Enum));
                            return match name.as_str() {
                                "name" => Some(string_ref(*span)),
                                _ => Some(TypeRef::Named(NamedType::new(owner.as_str(), *span))),
                            };
                        }

                        self.ensure_owner_planned(&owner);

                        let return_type = self.infer_return_type(
                            expected,
                            receiver_ty.as_ref(),
                            &owner,
                            *span,
                        );
                        if is_unknown_ty(&return_type) {
                            self.ensure_unknown_planned(unknown_type().as_str(), *span);
                        }
                        let param_types: Vec<TypeRef> = arg_types
                            .iter()
                            .zip(args)
                            .map(|(ty, arg)| self.plan_param_type(ty.as_ref(), arg))
                            .collect();
                        for ty in &param_types {
                            if is_unknown_ty(ty) {
                                self.ensure_unknown_planned(unknown_type().as_str(), *span);
                            }
                        }
                        // An `A.super.m()` call only compiles if `m` is a
                        // default method on the interface.
                        let super_qualified = matches!(
                            receiver.as_deref(),
                            Some(Expr::SuperRef { qualifier: Some(_), .. })
                        );
                        if super_qualified {
                            if let Some(fqn) = self.candidate_fqn(owner.as_str()) {
                                self.push_type_plan(TypeStubPlan::new(
                                    fqn,
                                    TypeKind::Interface,
                                ));
                            }
                        }
                        self.plans.push(StubPlan::Method(MethodStubPlan {
                            owner,
                            name: name.clone(),
                            return_type: return_type.clone(),
                            param_types,
                            throws: Vec::new(),
                            is_static: unresolved.static_ctx,
                            varargs: false,
                            default_on_interface: super_qualified,
                            functional_sam: false,
                        }));
                        Some(return_type)
                    }
                    _ => self
                        .shallow_type(expr, scope)
                        .or_else(|| expected.cloned()),
                }
            }
            Expr::New {
                ty,
                args,
                resolution,
                ..
            } => {
                self.plan_type_ref(ty, TypeKind::Class);
                let mut arg_types = Vec::with_capacity(args.len());
                for arg in args {
                    arg_types.push(self.walk_expr(arg, None, false, scope));
                }
                if let Resolution::Unresolved(unresolved) = resolution {
                    if unresolved.kind == UnresolvedKind::Ctor {
                        let owner = unresolved
                            .owner
                            .clone()
                            .or_else(|| ty.as_named().map(|named| named.denoted_fqn()));
                        if let Some(owner) = owner {
                            if !owner.is_jdk() {
                                self.ensure_owner_planned(&owner);
                                let param_types: Vec<TypeRef> = arg_types
                                    .iter()
                                    .zip(args)
                                    .map(|(ty, arg)| self.plan_param_type(ty.as_ref(), arg))
                                    .collect();
                                self.plans.push(StubPlan::Ctor(CtorStubPlan {
                                    owner: owner.clone(),
                                    param_types,
                                }));
                                // A `new X()` flowing into a different
                                // declared type forces an implements edge.
                                if let Some(expected_ty) = expected {
                                    if let TypeRef::Named(expected_named) = expected_ty {
                                        let target = expected_named.denoted_fqn();
                                        if target != owner
                                            && !target.is_jdk()
                                            && !is_unknown_ty(expected_ty)
                                            && !is_known_class(expected_named)
                                        {
                                            // The context type must be an
                                            // interface for the edge to
                                            // compile.
                                            if expected_named.resolution.symbol().is_none() {
                                                if let Some(fqn) =
                                                    self.candidate_fqn(&expected_named.name)
                                                {
                                                    self.push_type_plan(TypeStubPlan::new(
                                                        fqn,
                                                        TypeKind::Interface,
                                                    ));
                                                }
                                            }
                                            self.plans.push(StubPlan::Implements(
                                                ImplementsPlan {
                                                    owner,
                                                    interfaces: vec![expected_ty.clone()],
                                                },
                                            ));
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                Some(ty.clone())
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                span,
            } => {
                self.plan_type_ref(element, TypeKind::Class);
                for dim in dims.iter().flatten() {
                    self.walk_expr(dim, None, false, scope);
                }
                if let Some(values) = initializer {
                    for value in values {
                        self.walk_expr(value, None, false, scope);
                    }
                }
                let mut ty = element.clone();
                for _ in dims {
                    ty = TypeRef::array_of(ty, *span);
                }
                Some(ty)
            }
            Expr::Cast { ty, value, .. } => {
                self.plan_type_ref(ty, TypeKind::Class);
                let inner_expected = ty.clone();
                self.walk_expr(value, Some(&inner_expected), false, scope);
                Some(ty.clone())
            }
            Expr::InstanceOf { value, ty, span } => {
                self.walk_expr(value, None, false, scope);
                self.plan_type_ref(ty, TypeKind::Class);
                Some(TypeRef::Primitive(PrimitiveKind::Boolean, *span))
            }
            Expr::Lambda { params, body, span } => {
                self.mark_functional_target(expected, FunctionalShape::Lambda(params.len()), *span);
                for param in params {
                    if let Some(ty) = &param.ty {
                        self.plan_type_ref(ty, TypeKind::Class);
                    }
                }
                match body {
                    LambdaBody::Expr(value) => {
                        self.walk_expr(value, None, false, scope);
                    }
                    LambdaBody::Block(block) => self.walk_block(block, scope),
                }
                expected.cloned()
            }
            Expr::MethodRef { target, name, span } => {
                let shape = match target {
                    MethodRefTarget::Type(ty) => {
                        self.plan_type_ref(ty, TypeKind::Class);
                        if name == "new" && ty.array_dims() > 0 {
                            FunctionalShape::ArrayCtorRef
                        } else {
                            FunctionalShape::OtherRef
                        }
                    }
                    MethodRefTarget::Expr(value) => {
                        self.walk_expr(value, None, true, scope);
                        FunctionalShape::OtherRef
                    }
                };
                self.mark_functional_target(expected, shape, *span);
                expected.cloned()
            }
            Expr::Assign { lhs, rhs, .. } => {
                let lhs_ty = self.walk_expr(lhs, None, false, scope);
                self.walk_expr(rhs, lhs_ty.as_ref(), false, scope);
                lhs_ty
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs, None, false, scope);
                self.walk_expr(rhs, None, false, scope);
                self.shallow_type(expr, scope)
            }
            Expr::Unary { value, .. } => self.walk_expr(value, None, false, scope),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => {
                self.walk_expr(cond, None, false, scope);
                let then_ty = self.walk_expr(then_value, expected, false, scope);
                let else_ty = self.walk_expr(else_value, expected, false, scope);
                then_ty.or(else_ty)
            }
            Expr::ArrayIndex { array, index, .. } => {
                let array_ty = self.walk_expr(array, None, false, scope);
                self.walk_expr(index, None, false, scope);
                match array_ty {
                    Some(TypeRef::Array { component, .. }) => Some(*component),
                    _ => None,
                }
            }
            Expr::Paren { value, .. } => self.walk_expr(value, expected, as_receiver, scope),
            Expr::ClassLiteral { ty, .. } => {
                self.plan_type_ref(ty, TypeKind::Class);
                self.shallow_type(expr, scope)
            }
            Expr::ArrayInit { values, span } => {
                let component = expected.and_then(|ty| match ty {
                    TypeRef::Array { component, .. } => Some((**component).clone()),
                    _ => None,
                });
                for value in values {
                    self.walk_expr(value, component.as_ref(), false, scope);
                }
                let _ = span;
                expected.cloned()
            }
        }
    }

    /// Leaf typing through the resolver's best-effort typer.
    fn shallow_type(&self, expr: &Expr, scope: &mut BodyScope) -> Option<TypeRef> {
        let typer = ExprTyper {
            env: &scope.env,
            fields: &scope.fields,
            oracle: self.oracle,
        };
        typer.type_of(expr)
    }

    fn known_param_types(
        &self,
        resolution: &Resolution,
        name: &str,
        arity: usize,
    ) -> Option<Vec<TypeRef>> {
        let sym = resolution.symbol()?;
        if sym.kind != SymbolKind::Method {
            return None;
        }
        let sigs = self.oracle.lookup_methods(&sym.fqn, name);
        let sig = sigs.iter().find(|sig| sig.params.len() == arity)?;
        let mut parsed = Vec::with_capacity(sig.params.len());
        for param in &sig.params {
            parsed.push(jess_syntax::parse_type_ref(param).ok()?);
        }
        Some(parsed)
    }

    /// Return-type inference for an unresolved call: context first; then
    /// the generic-receiver bridge (a receiver typed `Box<String>` makes
    /// the method return the owner's positional type parameter); then
    /// `Unknown`.
    fn infer_return_type(
        &mut self,
        expected: Option<&TypeRef>,
        receiver_ty: Option<&TypeRef>,
        owner: &Fqn,
        span: Span,
    ) -> TypeRef {
        let receiver_args: Option<&Vec<TypeRef>> = receiver_ty.and_then(|ty| match ty {
            TypeRef::Named(named) if !named.args.is_empty() => Some(&named.args),
            _ => None,
        });
        if let Some(args) = receiver_args {
            self.plans.note_generic_arity(owner.clone(), args.len());
            if let Some(expected) = expected {
                let rendered = jess_ast::render_type_ref(expected);
                if let Some(pos) = args
                    .iter()
                    .position(|arg| jess_ast::render_type_ref(arg) == rendered)
                {
                    if let Some(name) = TYPE_PARAM_NAMES.get(pos) {
                        return TypeRef::Named(NamedType::new(*name, span));
                    }
                }
                return expected.clone();
            }
            if let Some(name) = TYPE_PARAM_NAMES.first() {
                return TypeRef::Named(NamedType::new(*name, span));
            }
        }
        if let Some(expected) = expected {
            return expected.clone();
        }
        unknown_ref(span)
    }

    /// A planned parameter type from an argument: inferred type, with
    /// `Unknown` for nulls, lambdas and anything untypeable.
    fn plan_param_type(&mut self, inferred: Option<&TypeRef>, arg: &Expr) -> TypeRef {
        if arg.is_null_literal() {
            return unknown_ref(arg.span());
        }
        match inferred {
            Some(ty) => match ty {
                TypeRef::Wildcard { .. } => unknown_ref(arg.span()),
                _ => ty.clone(),
            },
            None => unknown_ref(arg.span()),
        }
    }

    /// Marks the expected type of a lambda/method-reference as a functional
    /// interface and plans its SAM when the shape is known.
    fn mark_functional_target(
        &mut self,
        expected: Option<&TypeRef>,
        shape: FunctionalShape,
        span: Span,
    ) {
        let Some(TypeRef::Named(named)) = expected else {
            return;
        };
        let fqn = named.denoted_fqn();
        if fqn.is_jdk() {
            return;
        }
        if named.resolution.symbol().is_some() {
            // A real interface (classpath or source); nothing to
            // synthesise.
            return;
        }
        let mut plan = TypeStubPlan::new(fqn.clone(), TypeKind::Interface);
        plan.functional = true;
        self.push_type_plan(plan);
        if !named.args.is_empty() {
            self.plans.note_generic_arity(fqn.clone(), named.args.len());
        }

        let sam = match shape {
            FunctionalShape::ArrayCtorRef => {
                let return_type = if named.args.is_empty() {
                    unknown_ref(span)
                } else {
                    TypeRef::Named(NamedType::new(TYPE_PARAM_NAMES[0], span))
                };
                Some(MethodStubPlan {
                    owner: fqn,
                    name: "make".to_string(),
                    return_type,
                    param_types: vec![TypeRef::Primitive(PrimitiveKind::Int, span)],
                    throws: Vec::new(),
                    is_static: false,
                    varargs: false,
                    default_on_interface: false,
                    functional_sam: true,
                })
            }
            FunctionalShape::Lambda(arity) => {
                let generic_count = named.args.len();
                let return_type = if generic_count == 0 {
                    unknown_ref(span)
                } else {
                    // The last type argument conventionally carries the
                    // result (`Fn<T, R>`).
                    let pos = (generic_count - 1).min(TYPE_PARAM_NAMES.len() - 1);
                    TypeRef::Named(NamedType::new(TYPE_PARAM_NAMES[pos], span))
                };
                let params: Vec<TypeRef> = (0..arity)
                    .map(|pos| {
                        if pos < generic_count {
                            let pos = pos.min(TYPE_PARAM_NAMES.len() - 1);
                            TypeRef::Named(NamedType::new(TYPE_PARAM_NAMES[pos], span))
                        } else {
                            unknown_ref(span)
                        }
                    })
                    .collect();
                if arity > generic_count {
                    self.ensure_unknown_planned(unknown_type().as_str(), span);
                }
                Some(MethodStubPlan {
                    owner: fqn,
                    name: "apply".to_string(),
                    return_type,
                    param_types: params,
                    throws: Vec::new(),
                    is_static: false,
                    varargs: false,
                    default_on_interface: false,
                    functional_sam: true,
                })
            }
            FunctionalShape::OtherRef => None,
        };
        if let Some(sam) = sam {
            if is_unknown_ty(&sam.return_type) {
                self.ensure_unknown_planned(unknown_type().as_str(), span);
            }
            self.plans.push(StubPlan::Method(sam));
        }
    }

    /// Plans the owner type of a member plan unless it already exists in
    /// the sliced model.
    fn ensure_owner_planned(&mut self, owner: &Fqn) {
        if self.declared.contains_key(owner) {
            return;
        }
        if owner.is_jdk() {
            return;
        }
        if self.candidate_fqn(owner.as_str()).is_some() {
            self.push_type_plan(TypeStubPlan::new(owner.clone(), TypeKind::Class));
        }
    }

    fn ensure_unknown_planned(&mut self, written: &str, _span: Span) {
        if let Some(fqn) = self.candidate_fqn(written) {
            self.push_type_plan(TypeStubPlan::new(fqn, TypeKind::Class));
        }
    }

    /// Fabricates an `unknown.<Name>` type for an untypeable receiver.
    fn fabricate_unknown(&mut self, identifier: &str, span: Span) -> TypeRef {
        let mut simple = String::new();
        let mut chars = identifier.chars();
        if let Some(first) = chars.next() {
            simple.extend(first.to_uppercase());
        }
        simple.push_str(chars.as_str());
        let fqn = Fqn::from_parts(jess_core::UNKNOWN_PACKAGE, &simple);
        self.ensure_unknown_planned(fqn.as_str(), span);
        TypeRef::Named(NamedType::new(fqn.as_str(), span))
    }
}

enum FunctionalShape {
    Lambda(usize),
    ArrayCtorRef,
    OtherRef,
}

fn unknown_ref(span: Span) -> TypeRef {
    TypeRef::Named(NamedType::new(unknown_type().as_str(), span))
}

fn string_ref(span: Span) -> TypeRef {
    TypeRef::Named(NamedType::new("java.lang.String", span))
}

fn is_unknown_ty(ty: &TypeRef) -> bool {
    matches!(ty, TypeRef::Named(named) if named.name == unknown_type().as_str())
}

fn named_fqn(ty: Option<&TypeRef>) -> Option<Fqn> {
    match ty {
        Some(TypeRef::Named(named)) => Some(named.denoted_fqn()),
        _ => None,
    }
}

fn is_enum_helper(name: &str, arity: usize) -> bool {
    matches!(
        (name, arity),
        ("values", 0) | ("valueOf", 1) | ("name", 0)
    )
}

fn is_valid_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if unicode_ident::is_xid_start(first) || first == '_' || first == '$' => {}
        _ => return false,
    }
    chars.all(|ch| unicode_ident::is_xid_continue(ch) || ch == '$')
}

/// Whether the context type is a known concrete class (an implements edge
/// onto it would not compile).
fn is_known_class(named: &NamedType) -> bool {
    matches!(
        named.resolution.symbol(),
        Some(sym) if matches!(sym.kind, SymbolKind::Class | SymbolKind::Enum)
    )
}
