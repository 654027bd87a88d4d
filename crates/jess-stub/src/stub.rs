//! Plan materialisation.
//!
//! Ordering matters: types first (concrete FQNs before `unknown.`-rooted
//! ones, which are skipped entirely when a concrete type with the same
//! simple name exists), then fields, constructors, methods, and finally
//! implements edges. Every step is best-effort: a plan that cannot land is
//! logged and dropped.

use crate::plan::{MethodStubPlan, PlanSet, TypeStubPlan};
use crate::TYPE_PARAM_NAMES;
use jess_ast::{
    Block, CompilationUnit, ConstructorDecl, Expr, FieldDecl, Literal, LiteralKind, Member,
    MethodDecl, Modifiers, Param, Resolution, Stmt, Symbol, SymbolKind, TypeDecl, TypeKind,
    TypeParam, TypeRef,
};
use jess_core::{unknown_type, Fqn, NodeId, Span, UNKNOWN_PACKAGE};
use jess_slice::SlicedModel;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct StubberOptions {
    /// The `Base`+`s` container detection for repeatable annotations.
    pub repeatable_container_heuristic: bool,
    /// Builder-pattern completion (nested `Builder` types, fluent setter
    /// returns).
    pub builder_completion: bool,
}

impl Default for StubberOptions {
    fn default() -> Self {
        Self {
            repeatable_container_heuristic: true,
            builder_completion: true,
        }
    }
}

/// The combined model after stubbing: the sliced units plus the synthetic
/// units, ready for reconciliation and emission.
#[derive(Debug)]
pub struct StubbedModel {
    pub root: CompilationUnit,
    pub fragments: BTreeMap<Fqn, CompilationUnit>,
    /// Synthetic units, keyed by top-level FQN.
    pub stubs: BTreeMap<Fqn, CompilationUnit>,
    /// Every type FQN the stubber created.
    pub created: BTreeSet<Fqn>,
}

impl StubbedModel {
    pub fn units(&self) -> impl Iterator<Item = &CompilationUnit> {
        std::iter::once(&self.root)
            .chain(self.fragments.values())
            .chain(self.stubs.values())
    }

    pub fn units_mut(&mut self) -> impl Iterator<Item = &mut CompilationUnit> {
        std::iter::once(&mut self.root)
            .chain(self.fragments.values_mut())
            .chain(self.stubs.values_mut())
    }

    /// All declared types as (FQN, declaration) pairs. Nesting deeper than
    /// [`crate::MAX_TYPE_WALK_DEPTH`] is cut off rather than recursed into.
    pub fn all_types(&self) -> Vec<(Fqn, &TypeDecl)> {
        fn visit<'a>(
            fqn: Fqn,
            decl: &'a TypeDecl,
            depth: usize,
            out: &mut Vec<(Fqn, &'a TypeDecl)>,
        ) {
            if depth < crate::MAX_TYPE_WALK_DEPTH {
                for nested in decl.nested_types() {
                    visit(fqn.nest(&nested.name), nested, depth + 1, out);
                }
            }
            out.push((fqn, decl));
        }
        let mut out = Vec::new();
        for unit in self.units() {
            let package = unit.package.clone().unwrap_or_default();
            for decl in &unit.types {
                visit(Fqn::from_parts(&package, &decl.name), decl, 0, &mut out);
            }
        }
        out
    }

    pub fn type_mut(&mut self, fqn: &Fqn) -> Option<&mut TypeDecl> {
        let chain = fqn.nesting_chain();
        let top = chain.first()?.clone();
        let unit = self.unit_for_mut(&top)?;
        let mut decl = unit
            .types
            .iter_mut()
            .find(|decl| decl.name == top.simple_name())?;
        for level in &chain[1..] {
            decl = decl.find_nested_mut(level.simple_name())?;
        }
        Some(decl)
    }

    pub fn contains_type(&self, fqn: &Fqn) -> bool {
        self.all_types().iter().any(|(f, _)| f == fqn)
    }

    fn unit_for_mut(&mut self, top: &Fqn) -> Option<&mut CompilationUnit> {
        if let Some(unit) = self.stubs.get_mut(top) {
            return Some(unit);
        }
        let root_pkg = self.root.package.clone().unwrap_or_default();
        if self
            .root
            .types
            .iter()
            .any(|decl| Fqn::from_parts(&root_pkg, &decl.name) == *top)
        {
            return Some(&mut self.root);
        }
        self.fragments.values_mut().find(|unit| {
            let pkg = unit.package.clone().unwrap_or_default();
            unit.types
                .iter()
                .any(|decl| Fqn::from_parts(&pkg, &decl.name) == *top)
        })
    }
}

/// Applies `plans` to the sliced model.
pub fn apply_plans(plans: &PlanSet, sliced: SlicedModel) -> StubbedModel {
    let mut stubber = Stubber {
        model: StubbedModel {
            root: sliced.root,
            fragments: sliced.fragments,
            stubs: BTreeMap::new(),
            created: BTreeSet::new(),
        },
        next_node: 1 << 24,
    };
    stubber.create_types(plans);
    stubber.add_fields(plans);
    stubber.add_ctors(plans);
    stubber.add_methods(plans);
    stubber.add_implements(plans);
    stubber.qualify_unknown_imports();
    stubber.model
}

struct Stubber {
    model: StubbedModel,
    next_node: u32,
}

impl Stubber {
    fn node_id(&mut self) -> NodeId {
        let id = NodeId::from_raw(self.next_node);
        self.next_node += 1;
        id
    }

    // ---- types ------------------------------------------------------------

    fn create_types(&mut self, plans: &PlanSet) {
        // Merge per-FQN: one kind wins per the upgrade ordering.
        let mut merged: BTreeMap<Fqn, TypeStubPlan> = BTreeMap::new();
        for plan in plans.types() {
            match merged.get_mut(&plan.fqn) {
                Some(existing) => {
                    existing.kind = merge_kind(existing.kind, plan.kind);
                    existing.functional |= plan.functional;
                    existing.non_static_inner |= plan.non_static_inner;
                }
                None => {
                    merged.insert(plan.fqn.clone(), plan.clone());
                }
            }
        }

        let declared_simple: BTreeSet<String> = self
            .model
            .all_types()
            .iter()
            .filter(|(fqn, _)| !fqn.is_unknown_package())
            .map(|(fqn, _)| fqn.simple_name().to_string())
            .collect();
        let concrete_planned: BTreeSet<String> = merged
            .keys()
            .filter(|fqn| !fqn.is_unknown_package())
            .map(|fqn| fqn.simple_name().to_string())
            .collect();

        let (concrete, unknown): (Vec<_>, Vec<_>) = merged
            .values()
            .cloned()
            .partition(|plan| !plan.fqn.is_unknown_package());

        for plan in concrete {
            self.create_type(plan, plans);
        }
        for plan in unknown {
            let simple = plan.fqn.simple_name();
            if simple != jess_core::UNKNOWN_TYPE_SIMPLE
                && (concrete_planned.contains(simple) || declared_simple.contains(simple))
            {
                debug!(fqn = %plan.fqn, "skipping unknown-package plan shadowed by concrete type");
                continue;
            }
            self.create_type(plan, plans);
        }
    }

    fn create_type(&mut self, plan: TypeStubPlan, plans: &PlanSet) {
        if self.model.contains_type(&plan.fqn) {
            // Already declared in the slice or created earlier; upgrade the
            // kind if this plan knows better, but only on created stubs —
            // sliced declarations keep their real kind.
            let created = self.model.created.contains(&plan.fqn);
            if let Some(decl) = self.model.type_mut(&plan.fqn) {
                if created {
                    let upgraded = merge_kind(decl.kind, plan.kind);
                    if upgraded != decl.kind {
                        set_kind(decl, upgraded);
                    }
                }
                if plan.functional {
                    decl.functional = true;
                }
            }
            return;
        }

        let chain = plan.fqn.nesting_chain();
        let top = chain[0].clone();
        let package = top.package().to_string();

        if !self.model.stubs.contains_key(&top) && self.model.type_mut(&top).is_none() {
            let id = self.node_id();
            let mut decl = TypeDecl::new(
                id,
                if chain.len() == 1 { plan.kind } else { TypeKind::Class },
                top.simple_name(),
                Span::default(),
            );
            decl.modifiers.insert(Modifiers::PUBLIC);
            self.model.created.insert(top.clone());
            self.model.stubs.insert(
                top.clone(),
                CompilationUnit {
                    file: jess_core::FileId::from_raw(u32::MAX),
                    path: std::path::PathBuf::from(format!("{}.java", top.simple_name())),
                    package: if package.is_empty() {
                        None
                    } else {
                        Some(package)
                    },
                    imports: Vec::new(),
                    types: vec![decl],
                },
            );
        }

        // Walk/create the nesting chain.
        for (depth, level) in chain.iter().enumerate().skip(1) {
            let parent = &chain[depth - 1];
            let simple = level.simple_name().to_string();
            let Some(parent_decl) = self.model.type_mut(parent) else {
                warn!(fqn = %plan.fqn, "cannot reach enclosing type; dropping plan");
                return;
            };
            if parent_decl.find_nested_mut(&simple).is_none() {
                let id = NodeId::from_raw(self.next_node);
                self.next_node += 1;
                let kind = if depth + 1 == chain.len() {
                    plan.kind
                } else {
                    TypeKind::Class
                };
                let mut nested = TypeDecl::new(id, kind, simple.clone(), Span::default());
                nested.modifiers.insert(Modifiers::PUBLIC);
                if !plan.non_static_inner {
                    nested.modifiers.insert(Modifiers::STATIC);
                }
                parent_decl.members.push(Member::Type(nested));
                self.model.created.insert(level.clone());
            }
        }

        // Finalise the target node: kind, generics, functional marker,
        // exception-name supertype heuristic.
        let arity = plans.generic_arity.get(&plan.fqn).copied().unwrap_or(0);
        let created = self.model.created.contains(&plan.fqn);
        if let Some(decl) = self.model.type_mut(&plan.fqn) {
            if created {
                set_kind(decl, merge_kind(decl.kind, plan.kind));
                decl.functional |= plan.functional;
                for pos in decl.type_params.len()..arity {
                    let name = TYPE_PARAM_NAMES
                        .get(pos)
                        .copied()
                        .unwrap_or(TYPE_PARAM_NAMES[TYPE_PARAM_NAMES.len() - 1]);
                    decl.type_params
                        .push(TypeParam::new(name, Span::default()));
                }
                if decl.kind == TypeKind::Class && decl.superclass.is_none() {
                    if let Some(supertype) = exception_supertype(&decl.name) {
                        decl.superclass =
                            Some(TypeRef::named(supertype, Span::default()));
                    }
                }
            }
        }
    }

    // ---- members ----------------------------------------------------------

    fn add_fields(&mut self, plans: &PlanSet) {
        for plan in plans.fields() {
            if plan.owner.is_jdk() {
                debug!(owner = %plan.owner, field = %plan.name, "skipping field on JDK owner");
                continue;
            }
            let id = self.node_id();
            let Some(owner) = self.model.type_mut(&plan.owner) else {
                warn!(owner = %plan.owner, field = %plan.name, "field owner not materialised; skipped");
                continue;
            };
            if owner.fields().any(|field| field.name == plan.name) {
                continue;
            }
            if owner.kind == TypeKind::Annotation {
                continue;
            }
            let mut modifiers = Modifiers::PUBLIC;
            if plan.is_static || owner.kind == TypeKind::Interface {
                modifiers.insert(Modifiers::STATIC);
            }
            let init = if owner.kind == TypeKind::Interface {
                // Interface fields are final; give them a value.
                plan.ty
                    .default_value_text()
                    .map(|text| Expr::Literal(Literal::new(literal_kind(text), text, Span::default())))
            } else {
                None
            };
            owner.members.push(Member::Field(FieldDecl {
                id,
                modifiers,
                annotations: Vec::new(),
                ty: plan.ty.clone(),
                name: plan.name.clone(),
                init,
                span: Span::default(),
            }));
        }
    }

    fn add_ctors(&mut self, plans: &PlanSet) {
        for plan in plans.ctors() {
            if plan.owner.is_jdk() {
                continue;
            }
            let id = self.node_id();
            let Some(owner) = self.model.type_mut(&plan.owner) else {
                warn!(owner = %plan.owner, "constructor owner not materialised; skipped");
                continue;
            };
            if !matches!(owner.kind, TypeKind::Class) {
                debug!(owner = %plan.owner, "constructors only land on classes; skipped");
                continue;
            }
            let exists = owner.members.iter().any(|member| {
                matches!(member, Member::Constructor(ctor) if ctor.params.len() == plan.param_types.len())
            });
            if exists {
                continue;
            }
            let name = owner.name.clone();
            let params = make_params(&plan.param_types);
            owner.members.push(Member::Constructor(ConstructorDecl {
                id,
                modifiers: Modifiers::PUBLIC,
                annotations: Vec::new(),
                type_params: Vec::new(),
                name,
                params,
                varargs: false,
                throws: Vec::new(),
                body: Block::empty(Span::default()),
                span: Span::default(),
            }));
        }
    }

    fn add_methods(&mut self, plans: &PlanSet) {
        for plan in plans.methods() {
            // `getClass()` collides with the final platform method.
            if plan.name == "getClass" && plan.param_types.is_empty() {
                debug!(owner = %plan.owner, "skipping getClass() stub");
                continue;
            }
            let mut targets: Vec<Fqn> = Vec::new();
            if plan.owner.is_unknown_package() {
                // Mirror: the unknown-rooted owner plus any concrete type
                // with the same simple name.
                if self.model.contains_type(&plan.owner) {
                    targets.push(plan.owner.clone());
                }
                let simple = plan.owner.simple_name().to_string();
                let concrete: Vec<Fqn> = self
                    .model
                    .all_types()
                    .iter()
                    .map(|(fqn, _)| fqn.clone())
                    .filter(|fqn| !fqn.is_unknown_package() && fqn.simple_name() == simple)
                    .collect();
                targets.extend(concrete);
            } else if plan.owner.is_jdk() {
                debug!(owner = %plan.owner, method = %plan.name, "skipping method on JDK owner");
                continue;
            } else {
                targets.push(plan.owner.clone());
            }
            if targets.is_empty() {
                warn!(owner = %plan.owner, method = %plan.name, "method owner not materialised; skipped");
            }
            for target in targets {
                self.add_method_to(&target, plan);
            }
        }
    }

    fn add_method_to(&mut self, target: &Fqn, plan: &MethodStubPlan) {
        let id = self.node_id();
        let Some(owner) = self.model.type_mut(target) else {
            warn!(owner = %target, method = %plan.name, "method owner not materialised; skipped");
            return;
        };

        let owner_params: Vec<String> =
            owner.type_params.iter().map(|p| p.name.clone()).collect();
        let return_type = rebind_placeholders(plan.return_type.clone(), &owner_params);
        let param_types: Vec<TypeRef> = plan
            .param_types
            .iter()
            .map(|ty| rebind_placeholders(ty.clone(), &owner_params))
            .collect();

        if plan.functional_sam {
            owner.functional = true;
            let existing_info = owner
                .abstract_methods()
                .find(|method| method.name == plan.name)
                .map(|existing| (existing.name.clone(), existing.params.len(), existing
                    .params
                    .iter()
                    .all(|param| matches!(param.ty, TypeRef::Primitive(..)))));
            if let Some((name, arity, existing_primitive)) = existing_info {
                // A wrapper-typed SAM replaces a primitive-typed one; any
                // other repeat is dropped.
                let new_primitive = param_types
                    .iter()
                    .all(|ty| matches!(ty, TypeRef::Primitive(..)));
                if !(existing_primitive && !new_primitive) {
                    return;
                }
                owner.members.retain(|member| {
                    !matches!(member, Member::Method(m) if m.name == name && m.params.len() == arity && m.body.is_none())
                });
            }
        } else if owner
            .methods()
            .any(|method| method.name == plan.name && method.params.len() == plan.param_types.len())
        {
            return;
        }

        let is_interface_like =
            matches!(owner.kind, TypeKind::Interface | TypeKind::Annotation);
        let mut modifiers = Modifiers::PUBLIC;
        let mut body = None;
        if plan.is_static {
            modifiers.insert(Modifiers::STATIC);
            body = default_return_block(&return_type);
        } else if is_interface_like {
            if plan.default_on_interface {
                modifiers.insert(Modifiers::DEFAULT);
                body = default_return_block(&return_type);
            } else {
                modifiers.insert(Modifiers::ABSTRACT);
            }
        } else {
            body = default_return_block(&return_type);
        }

        let mut params = make_params(&param_types);
        let varargs = plan.varargs && !params.is_empty();
        if varargs {
            if let Some(last) = params.last_mut() {
                if last.ty.array_dims() == 0 {
                    let span = last.ty.span();
                    last.ty = TypeRef::array_of(last.ty.clone(), span);
                }
            }
        }

        owner.members.push(Member::Method(MethodDecl {
            id,
            modifiers,
            annotations: Vec::new(),
            type_params: Vec::new(),
            return_type,
            name: plan.name.clone(),
            params,
            varargs,
            throws: plan.throws.clone(),
            body,
            annotation_default: None,
            span: Span::default(),
        }));
    }

    fn add_implements(&mut self, plans: &PlanSet) {
        for plan in plans.implements() {
            let Some(owner) = self.model.type_mut(&plan.owner) else {
                warn!(owner = %plan.owner, "implements owner not materialised; skipped");
                continue;
            };
            for iface in &plan.interfaces {
                let rendered = jess_ast::render_type_ref(iface);
                let present = owner
                    .interfaces
                    .iter()
                    .any(|existing| jess_ast::render_type_ref(existing) == rendered);
                if !present {
                    owner.interfaces.push(iface.clone());
                }
            }
        }
    }

    /// Rewrites `unknown.Unknown` references to the simple spelling and
    /// adds the explicit import each unit needs for it.
    fn qualify_unknown_imports(&mut self) {
        let unknown = unknown_type();
        for unit in self.model.units_mut() {
            let mut uses_unknown = false;
            for decl in &mut unit.types {
                rewrite_unknown_refs(decl, &unknown, &mut uses_unknown);
            }
            let already = unit
                .imports
                .iter()
                .any(|import| import.path == unknown.as_str());
            let is_unknown_pkg_unit =
                unit.package.as_deref() == Some(UNKNOWN_PACKAGE);
            if uses_unknown && !already && !is_unknown_pkg_unit {
                unit.imports.push(jess_ast::Import {
                    path: unknown.as_str().to_string(),
                    is_static: false,
                    is_star: false,
                    span: Span::default(),
                });
            }
        }
    }
}

fn merge_kind(current: TypeKind, incoming: TypeKind) -> TypeKind {
    fn rank(kind: TypeKind) -> u8 {
        match kind {
            TypeKind::Annotation => 3,
            TypeKind::Enum => 2,
            TypeKind::Interface => 1,
            TypeKind::Class => 0,
        }
    }
    if rank(incoming) > rank(current) {
        incoming
    } else {
        current
    }
}

fn set_kind(decl: &mut TypeDecl, kind: TypeKind) {
    decl.kind = kind;
    if !matches!(kind, TypeKind::Class) {
        decl.superclass = None;
        decl.members.retain(|member| !matches!(member, Member::Constructor(_)));
    }
}

fn exception_supertype(simple_name: &str) -> Option<&'static str> {
    if simple_name.ends_with("Error") {
        Some("java.lang.Error")
    } else if simple_name.ends_with("Exception") {
        Some("java.lang.RuntimeException")
    } else {
        None
    }
}

fn make_params(types: &[TypeRef]) -> Vec<Param> {
    types
        .iter()
        .enumerate()
        .map(|(pos, ty)| Param::new(ty.clone(), format!("arg{pos}"), Span::default()))
        .collect()
}

fn default_return_block(return_type: &TypeRef) -> Option<Block> {
    let span = Span::default();
    match return_type.default_value_text() {
        Some(text) => Some(Block::new(
            vec![Stmt::Return {
                value: Some(Expr::Literal(Literal::new(literal_kind(text), text, span))),
                span,
            }],
            span,
        )),
        None => Some(Block::empty(span)),
    }
}

fn literal_kind(text: &str) -> LiteralKind {
    match text {
        "null" => LiteralKind::Null,
        "false" | "true" => LiteralKind::Bool,
        "'\\0'" => LiteralKind::Char,
        "0L" => LiteralKind::Long,
        "0.0f" => LiteralKind::Float,
        "0.0d" => LiteralKind::Double,
        _ => LiteralKind::Int,
    }
}

/// Rebinds bare single-uppercase-letter placeholder names to the owner's
/// formal type parameters: exact name match first, positional fallback.
fn rebind_placeholders(ty: TypeRef, owner_params: &[String]) -> TypeRef {
    match ty {
        TypeRef::Named(mut named) => {
            named.args = named
                .args
                .into_iter()
                .map(|arg| rebind_placeholders(arg, owner_params))
                .collect();
            let is_placeholder = named.name.len() == 1
                && named
                    .name
                    .chars()
                    .next()
                    .is_some_and(|ch| ch.is_ascii_uppercase());
            if is_placeholder && !named.name.contains('.') {
                if owner_params.iter().any(|param| param == &named.name) {
                    named.resolution = Resolution::Resolved(Symbol::new(
                        named.name.as_str(),
                        SymbolKind::TypeParam,
                    ));
                } else if let Some(pos) = TYPE_PARAM_NAMES
                    .iter()
                    .position(|name| *name == named.name)
                {
                    if let Some(param) = owner_params.get(pos) {
                        named.name = param.clone();
                        named.resolution = Resolution::Resolved(Symbol::new(
                            named.name.as_str(),
                            SymbolKind::TypeParam,
                        ));
                    } else {
                        // No formal to bind to; fall back to the universal
                        // placeholder.
                        named.name = unknown_type().as_str().to_string();
                        named.resolution = Resolution::Unvisited;
                    }
                }
            }
            TypeRef::Named(named)
        }
        TypeRef::Array { component, span } => TypeRef::Array {
            component: Box::new(rebind_placeholders(*component, owner_params)),
            span,
        },
        other => other,
    }
}

fn rewrite_unknown_refs(decl: &mut TypeDecl, unknown: &Fqn, uses: &mut bool) {
    fn rewrite_ty(ty: &mut TypeRef, unknown: &Fqn, uses: &mut bool) {
        match ty {
            TypeRef::Named(named) => {
                if named.name == unknown.as_str() {
                    named.name = unknown.simple_name().to_string();
                    named.resolution = Resolution::Resolved(Symbol::new(
                        unknown.as_str(),
                        SymbolKind::Class,
                    ));
                    *uses = true;
                }
                for arg in &mut named.args {
                    rewrite_ty(arg, unknown, uses);
                }
            }
            TypeRef::Array { component, .. } => rewrite_ty(component, unknown, uses),
            TypeRef::Wildcard {
                bound: Some((_, bound)),
                ..
            } => rewrite_ty(bound, unknown, uses),
            _ => {}
        }
    }

    if let Some(superclass) = &mut decl.superclass {
        rewrite_ty(superclass, unknown, uses);
    }
    for iface in &mut decl.interfaces {
        rewrite_ty(iface, unknown, uses);
    }
    for member in &mut decl.members {
        match member {
            Member::Field(field) => rewrite_ty(&mut field.ty, unknown, uses),
            Member::Method(method) => {
                rewrite_ty(&mut method.return_type, unknown, uses);
                for param in &mut method.params {
                    rewrite_ty(&mut param.ty, unknown, uses);
                }
            }
            Member::Constructor(ctor) => {
                for param in &mut ctor.params {
                    rewrite_ty(&mut param.ty, unknown, uses);
                }
            }
            Member::Type(nested) => rewrite_unknown_refs(nested, unknown, uses),
            Member::Initializer(_) => {}
        }
    }
}
