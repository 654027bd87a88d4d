//! The annotation pass: classify every reference in the root unit (and the
//! foreign units it pulls in) as resolved or unresolved.
//!
//! Two passes per type, mirroring how the bindings depend on each other:
//! first type references (signatures, supertypes, annotations), then member
//! references (calls, field accesses, constructor calls), which need the
//! receiver types established by the first pass.

use crate::cache::CachingOracle;
use crate::oracle::{CtorSig, FieldSig, MethodSig, ParseOracle, ResolutionOracle};
use crate::source_map::SourceRootIndex;
use crate::typing::{is_type_kind, ExprTyper, TypeEnv};
use crate::{ResolveError, Result, MAX_RESOLVE_DEPTH};
use jess_ast::{
    render_type_ref, AnnotationArg, AnnotationUse, Block, CompilationUnit, Expr, LambdaBody,
    Member, MethodRefTarget, NamedType, Resolution, Stmt, Symbol, SymbolKind, TypeDecl, TypeKind,
    TypeRef, UnresolvedKind, UnresolvedRef,
};
use jess_core::{FileId, Fqn};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    pub fail_on_ambiguity: bool,
    pub loose_signature_matching: bool,
}

/// The annotated model: the root unit plus every foreign unit touched
/// transitively, keyed by primary-type FQN.
#[derive(Debug)]
pub struct ResolveOutcome {
    pub root: CompilationUnit,
    pub foreign: BTreeMap<Fqn, CompilationUnit>,
}

pub struct Resolver<'a, O: ResolutionOracle> {
    oracle: &'a CachingOracle<O>,
    config: ResolverConfig,
}

impl<'a, O: ResolutionOracle> Resolver<'a, O> {
    pub fn new(oracle: &'a CachingOracle<O>, config: ResolverConfig) -> Self {
        Self { oracle, config }
    }

    pub fn resolve(
        &self,
        root: CompilationUnit,
        sources: &SourceRootIndex,
        parser: &dyn ParseOracle,
    ) -> Result<ResolveOutcome> {
        let mut decls = DeclTable::default();
        decls.register_unit(&root);

        // Transitive discovery of foreign units reachable through imports
        // and referenced names.
        let mut foreign: BTreeMap<Fqn, CompilationUnit> = BTreeMap::new();
        let mut loaded: BTreeSet<Fqn> = root
            .types
            .iter()
            .map(|decl| root.fqn_of(decl))
            .collect();
        let mut queue: VecDeque<(Fqn, usize)> = candidate_fqns(&root)
            .into_iter()
            .map(|fqn| (fqn, 1))
            .collect();
        let mut next_file = root.file.to_raw() + 1;

        while let Some((fqn, depth)) = queue.pop_front() {
            if depth > MAX_RESOLVE_DEPTH {
                return Err(ResolveError::DepthExceeded {
                    at: fqn.as_str().to_string(),
                });
            }
            if loaded.contains(&fqn) || foreign.contains_key(&fqn) {
                continue;
            }
            let Some(path) = sources.find(&fqn) else {
                continue;
            };
            let path = path.to_path_buf();
            let text = std::fs::read_to_string(&path).map_err(|err| {
                ResolveError::ForeignUnit {
                    path: path.display().to_string(),
                    message: err.to_string(),
                }
            })?;
            let unit = parser
                .parse(&text, FileId::from_raw(next_file), &path)
                .map_err(|message| ResolveError::ForeignUnit {
                    path: path.display().to_string(),
                    message,
                })?;
            next_file += 1;
            debug!(fqn = %fqn, path = %path.display(), "loaded foreign unit");

            decls.register_unit(&unit);
            for decl in &unit.types {
                loaded.insert(unit.fqn_of(decl));
            }
            for candidate in candidate_fqns(&unit) {
                queue.push_back((candidate, depth + 1));
            }
            let primary = unit
                .primary_type()
                .map(|decl| unit.fqn_of(decl))
                .unwrap_or_else(|| fqn.clone());
            foreign.insert(primary, unit);
        }

        let mut root = root;
        self.annotate_unit(&mut root, &decls)?;
        for unit in foreign.values_mut() {
            self.annotate_unit(unit, &decls)?;
        }

        Ok(ResolveOutcome { root, foreign })
    }

    fn annotate_unit(&self, unit: &mut CompilationUnit, decls: &DeclTable) -> Result<()> {
        let scope = UnitScope::build(unit);
        let mut types = std::mem::take(&mut unit.types);
        for decl in &mut types {
            let fqn = Fqn::from_parts(&scope.package, &decl.name);
            let mut stack = ScopeStack::new();
            let ctx = Ctx {
                oracle: self.oracle,
                decls,
                scope: &scope,
                config: &self.config,
            };
            self.annotate_type(decl, fqn, &mut stack, &ctx)?;
        }
        unit.types = types;
        Ok(())
    }

    fn annotate_type(
        &self,
        decl: &mut TypeDecl,
        fqn: Fqn,
        stack: &mut ScopeStack,
        ctx: &Ctx<'_>,
    ) -> Result<()> {
        let nested: HashMap<String, Fqn> = decl
            .nested_types()
            .map(|inner| (inner.name.clone(), fqn.nest(&inner.name)))
            .collect();
        stack.frames.push(Frame {
            fqn: fqn.clone(),
            nested,
            fields: HashMap::new(),
            methods: decl
                .methods()
                .map(|method| (method.name.clone(), method.arity()))
                .collect(),
            type_params: decl
                .type_params
                .iter()
                .map(|param| param.name.clone())
                .collect(),
        });

        // Pass A: type references in signatures.
        for ann in &mut decl.annotations {
            self.annotate_annotation_type(ann, stack, ctx);
        }
        for param in &mut decl.type_params {
            for bound in &mut param.bounds {
                self.annotate_type_ref(bound, stack, ctx);
            }
        }
        if let Some(superclass) = &mut decl.superclass {
            self.annotate_type_ref(superclass, stack, ctx);
        }
        for iface in &mut decl.interfaces {
            self.annotate_type_ref(iface, stack, ctx);
        }

        let mut members = std::mem::take(&mut decl.members);
        for member in &mut members {
            match member {
                Member::Field(field) => {
                    for ann in &mut field.annotations {
                        self.annotate_annotation_type(ann, stack, ctx);
                    }
                    self.annotate_type_ref(&mut field.ty, stack, ctx);
                }
                Member::Method(method) => {
                    for ann in &mut method.annotations {
                        self.annotate_annotation_type(ann, stack, ctx);
                    }
                    let frame = stack.frames.last_mut().expect("frame");
                    frame
                        .type_params
                        .extend(method.type_params.iter().map(|p| p.name.clone()));
                    for param in &mut method.type_params {
                        for bound in &mut param.bounds {
                            self.annotate_type_ref(bound, stack, ctx);
                        }
                    }
                    self.annotate_type_ref(&mut method.return_type, stack, ctx);
                    for param in &mut method.params {
                        self.annotate_type_ref(&mut param.ty, stack, ctx);
                    }
                    for thrown in &mut method.throws {
                        self.annotate_type_ref(thrown, stack, ctx);
                    }
                    let frame = stack.frames.last_mut().expect("frame");
                    let keep = frame.type_params.len() - method.type_params.len();
                    frame.type_params.truncate(keep);
                }
                Member::Constructor(ctor) => {
                    for ann in &mut ctor.annotations {
                        self.annotate_annotation_type(ann, stack, ctx);
                    }
                    for param in &mut ctor.params {
                        self.annotate_type_ref(&mut param.ty, stack, ctx);
                    }
                    for thrown in &mut ctor.throws {
                        self.annotate_type_ref(thrown, stack, ctx);
                    }
                }
                Member::Initializer(_) | Member::Type(_) => {}
            }
        }

        // Field types are now bound; expose them to body typing.
        let fields: HashMap<String, TypeRef> = members
            .iter()
            .filter_map(|member| match member {
                Member::Field(field) => Some((field.name.clone(), field.ty.clone())),
                _ => None,
            })
            .collect();
        stack.frames.last_mut().expect("frame").fields = fields;

        // Pass B: member bodies and nested types.
        for member in &mut members {
            match member {
                Member::Field(field) => {
                    if let Some(init) = &mut field.init {
                        let mut env = TypeEnv::new();
                        env.push_scope();
                        self.annotate_expr(
                            init,
                            &mut env,
                            stack,
                            ctx,
                            field.modifiers.is_static(),
                        )?;
                    }
                }
                Member::Method(method) => {
                    let frame = stack.frames.last_mut().expect("frame");
                    frame
                        .type_params
                        .extend(method.type_params.iter().map(|p| p.name.clone()));
                    if let Some(body) = &mut method.body {
                        let mut env = TypeEnv::new();
                        env.push_scope();
                        for param in &method.params {
                            env.insert(param.name.clone(), param.ty.clone());
                        }
                        self.annotate_block(
                            body,
                            &mut env,
                            stack,
                            ctx,
                            method.modifiers.is_static(),
                        )?;
                    }
                    let frame = stack.frames.last_mut().expect("frame");
                    let keep = frame.type_params.len() - method.type_params.len();
                    frame.type_params.truncate(keep);
                }
                Member::Constructor(ctor) => {
                    let mut env = TypeEnv::new();
                    env.push_scope();
                    for param in &ctor.params {
                        env.insert(param.name.clone(), param.ty.clone());
                    }
                    self.annotate_block(&mut ctor.body, &mut env, stack, ctx, false)?;
                }
                Member::Initializer(init) => {
                    let mut env = TypeEnv::new();
                    env.push_scope();
                    let is_static = init.is_static;
                    self.annotate_block(&mut init.body, &mut env, stack, ctx, is_static)?;
                }
                Member::Type(nested) => {
                    let nested_fqn = fqn.nest(&nested.name);
                    self.annotate_type(nested, nested_fqn, stack, ctx)?;
                }
            }
        }

        for constant in &mut decl.enum_constants {
            let mut env = TypeEnv::new();
            env.push_scope();
            for arg in &mut constant.args {
                self.annotate_expr(arg, &mut env, stack, ctx, true)?;
            }
        }

        decl.members = members;
        stack.frames.pop();
        Ok(())
    }

    fn annotate_annotation_type(
        &self,
        ann: &mut AnnotationUse,
        stack: &mut ScopeStack,
        ctx: &Ctx<'_>,
    ) {
        self.annotate_named(&mut ann.ty, stack, ctx);
    }

    fn annotate_type_ref(&self, ty: &mut TypeRef, stack: &mut ScopeStack, ctx: &Ctx<'_>) {
        match ty {
            TypeRef::Primitive(..) | TypeRef::Void(_) => {}
            TypeRef::Named(named) => self.annotate_named(named, stack, ctx),
            TypeRef::Array { component, .. } => self.annotate_type_ref(component, stack, ctx),
            TypeRef::Wildcard { bound, .. } => {
                if let Some((_, bound_ty)) = bound {
                    self.annotate_type_ref(bound_ty, stack, ctx);
                }
            }
        }
    }

    fn annotate_named(&self, named: &mut NamedType, stack: &mut ScopeStack, ctx: &Ctx<'_>) {
        for arg in &mut named.args {
            self.annotate_type_ref(arg, stack, ctx);
        }
        let (resolution, rewrite) = ctx.resolve_type_name(&named.name, stack);
        named.resolution = resolution;
        if let Some(rewrite) = rewrite {
            trace!(from = %named.name, to = %rewrite, "qualified type reference");
            named.name = rewrite;
        }
    }

    fn annotate_block(
        &self,
        block: &mut Block,
        env: &mut TypeEnv,
        stack: &mut ScopeStack,
        ctx: &Ctx<'_>,
        static_ctx: bool,
    ) -> Result<()> {
        env.push_scope();
        for stmt in &mut block.statements {
            self.annotate_stmt(stmt, env, stack, ctx, static_ctx)?;
        }
        env.pop_scope();
        Ok(())
    }

    fn annotate_stmt(
        &self,
        stmt: &mut Stmt,
        env: &mut TypeEnv,
        stack: &mut ScopeStack,
        ctx: &Ctx<'_>,
        static_ctx: bool,
    ) -> Result<()> {
        match stmt {
            Stmt::Block(block) => self.annotate_block(block, env, stack, ctx, static_ctx),
            Stmt::Local(local) => {
                self.annotate_type_ref(&mut local.ty, stack, ctx);
                if let Some(init) = &mut local.init {
                    self.annotate_expr(init, env, stack, ctx, static_ctx)?;
                }
                env.insert(local.name.clone(), local.ty.clone());
                Ok(())
            }
            Stmt::Expr(expr) => self.annotate_expr(expr, env, stack, ctx, static_ctx),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.annotate_expr(value, env, stack, ctx, static_ctx)?;
                }
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                self.annotate_expr(cond, env, stack, ctx, static_ctx)?;
                self.annotate_stmt(then_branch, env, stack, ctx, static_ctx)?;
                if let Some(else_branch) = else_branch {
                    self.annotate_stmt(else_branch, env, stack, ctx, static_ctx)?;
                }
                Ok(())
            }
            Stmt::While { cond, body, .. } => {
                self.annotate_expr(cond, env, stack, ctx, static_ctx)?;
                self.annotate_stmt(body, env, stack, ctx, static_ctx)
            }
            Stmt::Throw { value, .. } => self.annotate_expr(value, env, stack, ctx, static_ctx),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn annotate_expr(
        &self,
        expr: &mut Expr,
        env: &mut TypeEnv,
        stack: &mut ScopeStack,
        ctx: &Ctx<'_>,
        static_ctx: bool,
    ) -> Result<()> {
        match expr {
            Expr::Literal(_) | Expr::This { .. } => Ok(()),
            Expr::ArrayInit { values, .. } => {
                for value in values {
                    self.annotate_expr(value, env, stack, ctx, static_ctx)?;
                }
                Ok(())
            }
            Expr::SuperRef { qualifier, .. } => {
                if let Some(qualifier) = qualifier {
                    self.annotate_named(qualifier, stack, ctx);
                }
                Ok(())
            }
            Expr::Name(name) => {
                if env.get(&name.name).is_some() || stack.field_type(&name.name).is_some() {
                    name.resolution = Resolution::Resolved(Symbol::new(
                        stack.enclosing_fqn().as_str(),
                        SymbolKind::Local,
                    ));
                    return Ok(());
                }
                let (resolution, _) = ctx.resolve_type_name(&name.name, stack);
                match resolution {
                    Resolution::Resolved(sym) if is_type_kind(sym.kind) => {
                        name.resolution = Resolution::Resolved(sym);
                    }
                    _ => {
                        name.resolution = Resolution::Unresolved(
                            UnresolvedRef::new(UnresolvedKind::Field)
                                .with_owner(stack.enclosing_fqn())
                                .in_static_ctx(static_ctx),
                        );
                    }
                }
                Ok(())
            }
            Expr::FieldAccess {
                receiver,
                name,
                resolution,
                ..
            } => {
                // A dotted chain that denotes a type or package is a
                // qualifier, not a field read.
                if let Some(dotted) = flatten_dotted(receiver, name) {
                    let (candidate, _) = ctx.resolve_type_name(&dotted, stack);
                    if let Resolution::Resolved(sym) = &candidate {
                        if is_type_kind(sym.kind) {
                            *resolution = candidate;
                            return Ok(());
                        }
                    }
                }
                self.annotate_expr(receiver, env, stack, ctx, static_ctx)?;
                let receiver_ty = self.receiver_type(receiver, env, stack, ctx);
                match receiver_ty {
                    ReceiverInfo::Type { fqn, is_static } => {
                        let known = ctx.field_sig(&fqn, name);
                        match known {
                            Some(_) => {
                                *resolution = Resolution::Resolved(Symbol::new(
                                    fqn.as_str(),
                                    SymbolKind::Field,
                                ));
                            }
                            None => {
                                *resolution = Resolution::Unresolved(
                                    UnresolvedRef::new(UnresolvedKind::Field)
                                        .with_owner(fqn)
                                        .in_static_ctx(is_static),
                                );
                            }
                        }
                    }
                    ReceiverInfo::Unknown => {
                        *resolution =
                            Resolution::Unresolved(UnresolvedRef::new(UnresolvedKind::Field));
                    }
                    ReceiverInfo::Array => {
                        // Array members (`length`, `clone`) are built in;
                        // never stub candidates.
                        *resolution = Resolution::Resolved(Symbol::new(
                            stack.enclosing_fqn().as_str(),
                            SymbolKind::Field,
                        ));
                    }
                }
                Ok(())
            }
            Expr::MethodCall {
                receiver,
                type_args,
                name,
                args,
                resolution,
                ..
            } => {
                for arg in type_args.iter_mut() {
                    self.annotate_type_ref(arg, stack, ctx);
                }
                if let Some(receiver) = receiver {
                    self.annotate_expr(receiver, env, stack, ctx, static_ctx)?;
                }
                for arg in args.iter_mut() {
                    self.annotate_expr(arg, env, stack, ctx, static_ctx)?;
                }
                *resolution = self.resolve_call(
                    receiver.as_deref(),
                    name,
                    args.len(),
                    env,
                    stack,
                    ctx,
                    static_ctx,
                )?;
                Ok(())
            }
            Expr::New {
                ty,
                args,
                resolution,
                ..
            } => {
                self.annotate_type_ref(ty, stack, ctx);
                for arg in args.iter_mut() {
                    self.annotate_expr(arg, env, stack, ctx, static_ctx)?;
                }
                let owner = match ty.as_named() {
                    Some(named) => named.denoted_fqn(),
                    None => {
                        *resolution =
                            Resolution::Unresolved(UnresolvedRef::new(UnresolvedKind::Ctor));
                        return Ok(());
                    }
                };
                let type_resolved = ty
                    .as_named()
                    .map(|named| named.resolution.symbol().is_some())
                    .unwrap_or(false);
                if type_resolved {
                    let ctors = ctx.ctor_sigs(&owner);
                    let matching =
                        ctors.iter().filter(|sig| sig.params.len() == args.len()).count();
                    match matching {
                        1 => {
                            *resolution = Resolution::Resolved(Symbol::new(
                                owner.as_str(),
                                SymbolKind::Method,
                            ));
                        }
                        0 if ctors.is_empty() && args.is_empty() => {
                            // Implicit no-arg constructor.
                            *resolution = Resolution::Resolved(Symbol::new(
                                owner.as_str(),
                                SymbolKind::Method,
                            ));
                        }
                        0 => {
                            *resolution = Resolution::Unresolved(
                                UnresolvedRef::new(UnresolvedKind::Ctor).with_owner(owner),
                            );
                        }
                        _ => {
                            if ctx.config.fail_on_ambiguity
                                && !ctx.config.loose_signature_matching
                            {
                                return Err(ResolveError::Ambiguity {
                                    owner: owner.as_str().to_string(),
                                    name: "<init>".to_string(),
                                    count: matching,
                                });
                            }
                            *resolution = Resolution::Resolved(Symbol::new(
                                owner.as_str(),
                                SymbolKind::Method,
                            ));
                        }
                    }
                } else {
                    *resolution = Resolution::Unresolved(
                        UnresolvedRef::new(UnresolvedKind::Ctor).with_owner(owner),
                    );
                }
                Ok(())
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                ..
            } => {
                self.annotate_type_ref(element, stack, ctx);
                for dim in dims.iter_mut().flatten() {
                    self.annotate_expr(dim, env, stack, ctx, static_ctx)?;
                }
                if let Some(values) = initializer {
                    for value in values {
                        self.annotate_expr(value, env, stack, ctx, static_ctx)?;
                    }
                }
                Ok(())
            }
            Expr::Cast { ty, value, .. } => {
                self.annotate_type_ref(ty, stack, ctx);
                self.annotate_expr(value, env, stack, ctx, static_ctx)
            }
            Expr::InstanceOf { value, ty, .. } => {
                self.annotate_expr(value, env, stack, ctx, static_ctx)?;
                self.annotate_type_ref(ty, stack, ctx);
                Ok(())
            }
            Expr::Lambda { params, body, .. } => {
                env.push_scope();
                for param in params.iter_mut() {
                    if let Some(ty) = &mut param.ty {
                        self.annotate_type_ref(ty, stack, ctx);
                        env.insert(param.name.clone(), ty.clone());
                    }
                }
                match body {
                    LambdaBody::Expr(value) => {
                        self.annotate_expr(value, env, stack, ctx, static_ctx)?
                    }
                    LambdaBody::Block(block) => {
                        self.annotate_block(block, env, stack, ctx, static_ctx)?
                    }
                }
                env.pop_scope();
                Ok(())
            }
            Expr::MethodRef { target, .. } => {
                match target {
                    MethodRefTarget::Expr(value) => {
                        self.annotate_expr(value, env, stack, ctx, static_ctx)?
                    }
                    MethodRefTarget::Type(ty) => self.annotate_type_ref(ty, stack, ctx),
                }
                Ok(())
            }
            Expr::Assign { lhs, rhs, .. } => {
                self.annotate_expr(lhs, env, stack, ctx, static_ctx)?;
                self.annotate_expr(rhs, env, stack, ctx, static_ctx)
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.annotate_expr(lhs, env, stack, ctx, static_ctx)?;
                self.annotate_expr(rhs, env, stack, ctx, static_ctx)
            }
            Expr::Unary { value, .. } => self.annotate_expr(value, env, stack, ctx, static_ctx),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => {
                self.annotate_expr(cond, env, stack, ctx, static_ctx)?;
                self.annotate_expr(then_value, env, stack, ctx, static_ctx)?;
                self.annotate_expr(else_value, env, stack, ctx, static_ctx)
            }
            Expr::ArrayIndex { array, index, .. } => {
                self.annotate_expr(array, env, stack, ctx, static_ctx)?;
                self.annotate_expr(index, env, stack, ctx, static_ctx)
            }
            Expr::Paren { value, .. } => self.annotate_expr(value, env, stack, ctx, static_ctx),
            Expr::ClassLiteral { ty, .. } => {
                self.annotate_type_ref(ty, stack, ctx);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_call(
        &self,
        receiver: Option<&Expr>,
        name: &str,
        arity: usize,
        env: &TypeEnv,
        stack: &ScopeStack,
        ctx: &Ctx<'_>,
        static_ctx: bool,
    ) -> Result<Resolution> {
        // Explicit constructor invocations bind to the enclosing hierarchy.
        if receiver.is_none() && (name == "this" || name == "super") {
            return Ok(Resolution::Resolved(Symbol::new(
                stack.enclosing_fqn().as_str(),
                SymbolKind::Method,
            )));
        }

        let (owner, owner_static): (Option<Fqn>, bool) = match receiver {
            None => {
                // Unqualified: search the enclosing chain.
                if let Some(frame_fqn) =
                    stack.find_method(name, arity, ctx.config.loose_signature_matching)
                {
                    return Ok(Resolution::Resolved(Symbol::new(
                        frame_fqn.as_str(),
                        SymbolKind::Method,
                    )));
                }
                // Then explicit static imports.
                if let Some(owner) = ctx.scope.static_import_owner(name) {
                    let sigs = ctx.method_sigs(&owner, name);
                    if !sigs.is_empty() {
                        return Ok(Resolution::Resolved(Symbol::new(
                            owner.as_str(),
                            SymbolKind::Method,
                        )));
                    }
                    return Ok(Resolution::Unresolved(
                        UnresolvedRef::new(UnresolvedKind::Method)
                            .with_owner(owner)
                            .in_static_ctx(true),
                    ));
                }
                (Some(stack.enclosing_fqn()), static_ctx)
            }
            Some(Expr::SuperRef { qualifier, .. }) => match qualifier {
                Some(named) => (Some(named.denoted_fqn()), false),
                None => (None, false),
            },
            Some(receiver_expr) => match self.receiver_type(receiver_expr, env, stack, ctx) {
                ReceiverInfo::Type { fqn, is_static } => (Some(fqn), is_static),
                ReceiverInfo::Array => (None, false),
                ReceiverInfo::Unknown => (None, false),
            },
        };

        let Some(owner) = owner else {
            return Ok(Resolution::Unresolved(
                UnresolvedRef::new(UnresolvedKind::Method).in_static_ctx(static_ctx),
            ));
        };

        let sigs = ctx.method_sigs(&owner, name);
        let matching: Vec<&MethodSig> = if ctx.config.loose_signature_matching {
            sigs.iter().collect()
        } else {
            sigs.iter().filter(|sig| sig.params.len() == arity).collect()
        };
        match matching.len() {
            0 => Ok(Resolution::Unresolved(
                UnresolvedRef::new(UnresolvedKind::Method)
                    .with_owner(owner)
                    .in_static_ctx(owner_static),
            )),
            1 => Ok(Resolution::Resolved(Symbol::new(
                owner.as_str(),
                SymbolKind::Method,
            ))),
            count => {
                if ctx.config.fail_on_ambiguity && !ctx.config.loose_signature_matching {
                    return Err(ResolveError::Ambiguity {
                        owner: owner.as_str().to_string(),
                        name: name.to_string(),
                        count,
                    });
                }
                // Tolerated: first textual match wins.
                Ok(Resolution::Resolved(Symbol::new(
                    owner.as_str(),
                    SymbolKind::Method,
                )))
            }
        }
    }

    fn receiver_type(
        &self,
        receiver: &Expr,
        env: &TypeEnv,
        stack: &ScopeStack,
        ctx: &Ctx<'_>,
    ) -> ReceiverInfo {
        // Static receiver: the expression itself denotes a type.
        if let Expr::Name(name) = receiver {
            if let Resolution::Resolved(sym) = &name.resolution {
                if is_type_kind(sym.kind) {
                    return ReceiverInfo::Type {
                        fqn: sym.fqn.clone(),
                        is_static: true,
                    };
                }
            }
        }
        if let Expr::FieldAccess { resolution, .. } = receiver {
            if let Resolution::Resolved(sym) = resolution {
                if is_type_kind(sym.kind) {
                    return ReceiverInfo::Type {
                        fqn: sym.fqn.clone(),
                        is_static: true,
                    };
                }
            }
        }
        if let Expr::This { .. } = receiver {
            return ReceiverInfo::Type {
                fqn: stack.enclosing_fqn(),
                is_static: false,
            };
        }

        let fields = stack.all_fields();
        let typer = ExprTyper {
            env,
            fields: &fields,
            oracle: ctx.oracle,
        };
        match typer.type_of(receiver) {
            Some(TypeRef::Array { .. }) => ReceiverInfo::Array,
            Some(TypeRef::Named(named)) => {
                let fqn = match &named.resolution {
                    Resolution::Resolved(sym) => sym.fqn.clone(),
                    _ => {
                        // Re-resolve the written name in this scope; the
                        // clone may predate annotation.
                        let (res, rewrite) = ctx.resolve_type_name(&named.name, stack);
                        match res {
                            Resolution::Resolved(sym) => sym.fqn,
                            _ => Fqn::new(rewrite.unwrap_or(named.name)),
                        }
                    }
                };
                ReceiverInfo::Type {
                    fqn,
                    is_static: false,
                }
            }
            _ => ReceiverInfo::Unknown,
        }
    }
}

enum ReceiverInfo {
    Type { fqn: Fqn, is_static: bool },
    Array,
    Unknown,
}

// ---- scope machinery -----------------------------------------------------

struct Frame {
    fqn: Fqn,
    nested: HashMap<String, Fqn>,
    fields: HashMap<String, TypeRef>,
    methods: Vec<(String, usize)>,
    type_params: Vec<String>,
}

struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    fn new() -> Self {
        Self { frames: Vec::new() }
    }

    fn enclosing_fqn(&self) -> Fqn {
        self.frames
            .last()
            .map(|frame| frame.fqn.clone())
            .unwrap_or_else(|| Fqn::new(""))
    }

    fn field_type(&self, name: &str) -> Option<&TypeRef> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.fields.get(name))
    }

    fn all_fields(&self) -> HashMap<String, TypeRef> {
        let mut fields = HashMap::new();
        for frame in &self.frames {
            for (name, ty) in &frame.fields {
                fields.insert(name.clone(), ty.clone());
            }
        }
        fields
    }

    fn find_method(&self, name: &str, arity: usize, loose: bool) -> Option<Fqn> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .methods
                .iter()
                .any(|(method, method_arity)| {
                    method == name && (loose || *method_arity == arity)
                })
                .then(|| frame.fqn.clone())
        })
    }

    fn has_type_param(&self, name: &str) -> bool {
        self.frames
            .iter()
            .any(|frame| frame.type_params.iter().any(|param| param == name))
    }

    fn find_nested(&self, name: &str) -> Option<Fqn> {
        self.frames.iter().rev().find_map(|frame| {
            if frame.fqn.simple_name() == name {
                return Some(frame.fqn.clone());
            }
            frame.nested.get(name).cloned()
        })
    }
}

struct UnitScope {
    package: String,
    explicit_imports: HashMap<String, Fqn>,
    star_packages: Vec<String>,
    static_imports: Vec<(Fqn, String)>,
    top_level: HashMap<String, Fqn>,
}

impl UnitScope {
    fn build(unit: &CompilationUnit) -> Self {
        let package = unit.package.clone().unwrap_or_default();
        let mut explicit_imports = HashMap::new();
        let mut star_packages = Vec::new();
        let mut static_imports = Vec::new();
        for import in &unit.imports {
            if import.is_static {
                if !import.is_star {
                    if let Some((owner, member)) = import.path.rsplit_once('.') {
                        static_imports.push((Fqn::new(owner), member.to_string()));
                    }
                }
                continue;
            }
            if import.is_star {
                star_packages.push(import.path.clone());
            } else {
                let fqn = Fqn::new(import.path.as_str());
                explicit_imports.insert(fqn.simple_name().to_string(), fqn);
            }
        }
        let top_level = unit
            .types
            .iter()
            .map(|decl| (decl.name.clone(), unit.fqn_of(decl)))
            .collect();
        Self {
            package,
            explicit_imports,
            star_packages,
            static_imports,
            top_level,
        }
    }

    fn static_import_owner(&self, member: &str) -> Option<Fqn> {
        self.static_imports
            .iter()
            .find(|(_, imported)| imported == member)
            .map(|(owner, _)| owner.clone())
    }
}

struct Ctx<'a> {
    oracle: &'a dyn ResolutionOracle,
    decls: &'a DeclTable,
    scope: &'a UnitScope,
    config: &'a ResolverConfig,
}

impl Ctx<'_> {
    fn lookup_known_type(&self, fqn: &Fqn) -> Option<SymbolKind> {
        if let Some(kind) = self.decls.kind(fqn) {
            return Some(kind);
        }
        self.oracle.lookup_type(fqn).map(|entry| entry.kind)
    }

    /// Resolves a written type name in this unit's scope. Returns the
    /// resolution and, when an import pinned down a package for an otherwise
    /// unresolved simple name, the fully-qualified rewrite of the name.
    fn resolve_type_name(&self, name: &str, stack: &ScopeStack) -> (Resolution, Option<String>) {
        if name.contains('.') {
            let fqn = Fqn::new(name);
            if let Some(kind) = self.lookup_known_type(&fqn) {
                return (Resolution::Resolved(Symbol::new(fqn.as_str(), kind)), None);
            }
            // `Outer.Inner` written with dots.
            if let Some((first, rest)) = name.split_once('.') {
                // A nested spelling only makes sense when the head segment
                // looks like a type name.
                let head_is_type = first.chars().next().is_some_and(char::is_uppercase);
                match self.resolve_type_name(first, stack) {
                    (Resolution::Resolved(sym), _)
                        if is_type_kind(sym.kind) && sym.kind != SymbolKind::TypeParam =>
                    {
                        let nested = Fqn::new(format!(
                            "{}${}",
                            sym.fqn.as_str(),
                            rest.replace('.', "$")
                        ));
                        if let Some(kind) = self.lookup_known_type(&nested) {
                            return (
                                Resolution::Resolved(Symbol::new(nested.as_str(), kind)),
                                None,
                            );
                        }
                        return (
                            Resolution::unresolved(UnresolvedKind::Type),
                            Some(nested.as_str().to_string()),
                        );
                    }
                    (Resolution::Unresolved(_), Some(rewritten)) if head_is_type => {
                        // `Thing.Builder` with an unknown `Thing`: aim the
                        // stub at a nested type in the rewritten package.
                        let nested =
                            format!("{rewritten}${}", rest.replace('.', "$"));
                        return (Resolution::unresolved(UnresolvedKind::Type), Some(nested));
                    }
                    _ => {}
                }
            }
            return (Resolution::unresolved(UnresolvedKind::Type), None);
        }

        if stack.has_type_param(name) {
            return (
                Resolution::Resolved(Symbol::new(name, SymbolKind::TypeParam)),
                None,
            );
        }
        if let Some(fqn) = stack.find_nested(name) {
            let kind = self.decls.kind(&fqn).unwrap_or(SymbolKind::Class);
            return (Resolution::Resolved(Symbol::new(fqn.as_str(), kind)), None);
        }
        if let Some(fqn) = self.scope.top_level.get(name) {
            let kind = self.decls.kind(fqn).unwrap_or(SymbolKind::Class);
            return (Resolution::Resolved(Symbol::new(fqn.as_str(), kind)), None);
        }
        if let Some(fqn) = self.scope.explicit_imports.get(name) {
            if let Some(kind) = self.lookup_known_type(fqn) {
                return (Resolution::Resolved(Symbol::new(fqn.as_str(), kind)), None);
            }
            // The import fixes the package even though the type is unknown.
            return (
                Resolution::unresolved(UnresolvedKind::Type),
                Some(fqn.as_str().to_string()),
            );
        }
        let same_package = Fqn::from_parts(&self.scope.package, name);
        if let Some(kind) = self.lookup_known_type(&same_package) {
            return (
                Resolution::Resolved(Symbol::new(same_package.as_str(), kind)),
                None,
            );
        }
        for star in &self.scope.star_packages {
            let candidate = Fqn::from_parts(star, name);
            if let Some(kind) = self.lookup_known_type(&candidate) {
                return (
                    Resolution::Resolved(Symbol::new(candidate.as_str(), kind)),
                    None,
                );
            }
        }
        let in_lang = Fqn::from_parts("java.lang", name);
        if let Some(kind) = self.lookup_known_type(&in_lang) {
            return (
                Resolution::Resolved(Symbol::new(in_lang.as_str(), kind)),
                None,
            );
        }
        // An unqualified name nothing claims is assumed to live in the
        // unit's own package; the rewrite aims the stub plan there.
        let rewrite = if self.scope.package.is_empty() {
            None
        } else {
            Some(same_package.as_str().to_string())
        };
        (Resolution::unresolved(UnresolvedKind::Type), rewrite)
    }

    fn method_sigs(&self, owner: &Fqn, name: &str) -> Vec<MethodSig> {
        let mut sigs = self.decls.method_sigs(owner, name);
        sigs.extend(self.oracle.lookup_methods(owner, name));
        sigs
    }

    fn field_sig(&self, owner: &Fqn, name: &str) -> Option<FieldSig> {
        self.decls
            .field_sig(owner, name)
            .or_else(|| self.oracle.lookup_field(owner, name))
    }

    fn ctor_sigs(&self, owner: &Fqn) -> Vec<CtorSig> {
        let mut sigs = self.decls.ctor_sigs(owner);
        sigs.extend(self.oracle.lookup_ctors(owner));
        sigs
    }
}

// ---- declared-type table -------------------------------------------------

/// Signatures of every type declared in the loaded source units.
#[derive(Default)]
pub(crate) struct DeclTable {
    kinds: HashMap<Fqn, SymbolKind>,
    supers: HashMap<Fqn, Vec<String>>,
    methods: HashMap<Fqn, Vec<MethodSig>>,
    fields: HashMap<Fqn, HashMap<String, FieldSig>>,
    ctors: HashMap<Fqn, Vec<CtorSig>>,
}

impl DeclTable {
    pub(crate) fn register_unit(&mut self, unit: &CompilationUnit) {
        let package = unit.package.clone().unwrap_or_default();
        for decl in &unit.types {
            let fqn = Fqn::from_parts(&package, &decl.name);
            self.register_type(fqn, decl);
        }
    }

    fn register_type(&mut self, fqn: Fqn, decl: &TypeDecl) {
        let kind = match decl.kind {
            TypeKind::Class => SymbolKind::Class,
            TypeKind::Interface => SymbolKind::Interface,
            TypeKind::Annotation => SymbolKind::Annotation,
            TypeKind::Enum => SymbolKind::Enum,
        };
        self.kinds.insert(fqn.clone(), kind);

        let mut supers = Vec::new();
        if let Some(TypeRef::Named(named)) = &decl.superclass {
            supers.push(named.name.clone());
        }
        for iface in &decl.interfaces {
            if let TypeRef::Named(named) = iface {
                supers.push(named.name.clone());
            }
        }
        self.supers.insert(fqn.clone(), supers);

        let methods: Vec<MethodSig> = decl
            .methods()
            .map(|method| MethodSig {
                name: method.name.clone(),
                params: method
                    .params
                    .iter()
                    .map(|param| render_type_ref(&param.ty))
                    .collect(),
                return_type: render_type_ref(&method.return_type),
                is_static: method.modifiers.is_static(),
            })
            .collect();
        self.methods.insert(fqn.clone(), methods);

        let fields: HashMap<String, FieldSig> = decl
            .fields()
            .map(|field| {
                (
                    field.name.clone(),
                    FieldSig {
                        ty: render_type_ref(&field.ty),
                        is_static: field.modifiers.is_static(),
                    },
                )
            })
            .collect();
        self.fields.insert(fqn.clone(), fields);

        let ctors: Vec<CtorSig> = decl
            .members
            .iter()
            .filter_map(|member| match member {
                Member::Constructor(ctor) => Some(CtorSig {
                    params: ctor
                        .params
                        .iter()
                        .map(|param| render_type_ref(&param.ty))
                        .collect(),
                }),
                _ => None,
            })
            .collect();
        self.ctors.insert(fqn.clone(), ctors);

        for nested in decl.nested_types() {
            self.register_type(fqn.nest(&nested.name), nested);
        }
    }

    pub(crate) fn kind(&self, fqn: &Fqn) -> Option<SymbolKind> {
        self.kinds.get(fqn).copied()
    }

    /// Methods named `name` on `owner`, walking declared supertypes
    /// best-effort (same package or exact written name), depth-limited.
    fn method_sigs(&self, owner: &Fqn, name: &str) -> Vec<MethodSig> {
        let mut sigs = Vec::new();
        let mut current = vec![owner.clone()];
        let mut seen = BTreeSet::new();
        for _ in 0..MAX_RESOLVE_DEPTH {
            let mut next = Vec::new();
            for fqn in current.drain(..) {
                if !seen.insert(fqn.clone()) {
                    continue;
                }
                if let Some(methods) = self.methods.get(&fqn) {
                    sigs.extend(methods.iter().filter(|sig| sig.name == name).cloned());
                }
                if let Some(supers) = self.supers.get(&fqn) {
                    for written in supers {
                        let candidate = if written.contains('.') {
                            Fqn::new(written.as_str())
                        } else {
                            Fqn::from_parts(fqn.package(), written)
                        };
                        if self.kinds.contains_key(&candidate) {
                            next.push(candidate);
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            current = next;
        }
        sigs
    }

    fn field_sig(&self, owner: &Fqn, name: &str) -> Option<FieldSig> {
        self.fields.get(owner)?.get(name).cloned()
    }

    fn ctor_sigs(&self, owner: &Fqn) -> Vec<CtorSig> {
        self.ctors.get(owner).cloned().unwrap_or_default()
    }
}

// ---- discovery helpers ---------------------------------------------------

/// FQNs a unit might pull in from the source roots: explicit imports,
/// static-import owners, and referenced simple names prefixed with the
/// unit's own package or its star-import packages.
fn candidate_fqns(unit: &CompilationUnit) -> Vec<Fqn> {
    let mut out = Vec::new();
    let package = unit.package.clone().unwrap_or_default();
    for import in &unit.imports {
        if import.is_star {
            continue;
        }
        if import.is_static {
            if let Some((owner, _)) = import.path.rsplit_once('.') {
                out.push(Fqn::new(owner));
            }
        } else {
            out.push(Fqn::new(import.path.as_str()));
        }
    }
    let mut names = BTreeSet::new();
    for decl in &unit.types {
        collect_type_names(decl, &mut names);
    }
    let star_packages: Vec<&str> = unit
        .imports
        .iter()
        .filter(|import| import.is_star && !import.is_static)
        .map(|import| import.path.as_str())
        .collect();
    for name in names {
        if name.contains('.') {
            out.push(Fqn::new(name.as_str()));
        } else {
            out.push(Fqn::from_parts(&package, &name));
            for star in &star_packages {
                out.push(Fqn::from_parts(star, &name));
            }
        }
    }
    out
}

fn collect_type_names(decl: &TypeDecl, out: &mut BTreeSet<String>) {
    fn from_type(ty: &TypeRef, out: &mut BTreeSet<String>) {
        match ty {
            TypeRef::Named(named) => {
                out.insert(named.name.clone());
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
            Expr::ClassLiteral { ty, .. } => from_type(ty, out),
            Expr::MethodRef { target, .. } => match target {
                MethodRefTarget::Expr(value) => from_expr(value, out),
                MethodRefTarget::Type(ty) => from_type(ty, out),
            },
            Expr::Name(name) => {
                // An upper-case bare name may be a type qualifier.
                if name.name.chars().next().is_some_and(char::is_uppercase) {
                    out.insert(name.name.clone());
                }
            }
            Expr::FieldAccess { receiver, .. } => from_expr(receiver, out),
            Expr::MethodCall { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    from_expr(receiver, out);
                }
                for arg in args {
                    from_expr(arg, out);
                }
            }
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
            Expr::Lambda { body, .. } => match body {
                LambdaBody::Expr(value) => from_expr(value, out),
                LambdaBody::Block(block) => from_block(block, out),
            },
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
        out.insert(ann.ty.name.clone());
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
                from_type(&field.ty, out);
                if let Some(init) = &field.init {
                    from_expr(init, out);
                }
            }
            Member::Method(method) => {
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
                from_block(&ctor.body, out);
            }
            Member::Initializer(init) => from_block(&init.body, out),
            Member::Type(nested) => collect_type_names(nested, out),
        }
    }
}

/// Flattens `receiver.name` into a dotted string when the receiver is a
/// pure `Name`/`FieldAccess` chain.
fn flatten_dotted(receiver: &Expr, name: &str) -> Option<String> {
    fn flatten(expr: &Expr) -> Option<String> {
        match expr {
            Expr::Name(name) => Some(name.name.clone()),
            Expr::FieldAccess { receiver, name, .. } => {
                let mut prefix = flatten(receiver)?;
                prefix.push('.');
                prefix.push_str(name);
                Some(prefix)
            }
            _ => None,
        }
    }
    let mut dotted = flatten(receiver)?;
    dotted.push('.');
    dotted.push_str(name);
    Some(dotted)
}
