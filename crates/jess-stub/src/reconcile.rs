//! Global post-passes over the combined (sliced + stubbed) model.
//!
//! The passes run in a fixed order; each repairs one class of defect the
//! per-reference stubbing cannot see globally.

use crate::stub::{StubbedModel, StubberOptions};
use crate::TYPE_PARAM_NAMES;
use jess_ast::{
    AnnotationArg, AnnotationUse, Block, CompilationUnit, Expr, LambdaBody, Member,
    MethodRefTarget, Modifiers, NamedType, Resolution, Stmt, Symbol, SymbolKind, TypeDecl,
    TypeKind, TypeParam, TypeRef,
};
use jess_core::{Fqn, Span, UNKNOWN_PACKAGE};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

const META_ANNOTATIONS: &[&str] = &[
    "Target",
    "Retention",
    "Repeatable",
    "Documented",
    "Inherited",
];

/// Runs the reconciliation passes in their required order.
pub fn reconcile(model: &mut StubbedModel, options: &StubberOptions) {
    preserve_generic_arguments(model);
    rebind_unknown_references(model);
    rebind_unknown_supertypes(model);
    auto_implement(model);
    enforce_functional_interfaces(model);
    if options.builder_completion {
        complete_builders(model);
    }
    qualify_ambiguous_simple_names(model);
    remove_dead_unknown_imports(model);
    canonicalise_meta_annotations(model, options);
}

// ---- pass 1: generic arities ---------------------------------------------

fn preserve_generic_arguments(model: &mut StubbedModel) {
    let mut max_args: BTreeMap<Fqn, usize> = BTreeMap::new();
    for unit in model.units() {
        for_each_named(unit, &mut |named| {
            if named.args.is_empty() {
                return;
            }
            let fqn = named.denoted_fqn();
            let entry = max_args.entry(fqn).or_insert(0);
            if named.args.len() > *entry {
                *entry = named.args.len();
            }
        });
    }
    let created: Vec<Fqn> = model.created.iter().cloned().collect();
    for fqn in created {
        let Some(&needed) = max_args.get(&fqn) else {
            continue;
        };
        if let Some(decl) = model.type_mut(&fqn) {
            while decl.type_params.len() < needed {
                let pos = decl.type_params.len().min(TYPE_PARAM_NAMES.len() - 1);
                decl.type_params
                    .push(TypeParam::new(TYPE_PARAM_NAMES[pos], Span::default()));
            }
        }
    }
}

// ---- pass 2: unknown.X → unique concrete X -------------------------------

fn concrete_by_simple(model: &StubbedModel) -> BTreeMap<String, Vec<Fqn>> {
    let mut map: BTreeMap<String, Vec<Fqn>> = BTreeMap::new();
    for (fqn, _) in model.all_types() {
        if fqn.is_unknown_package() {
            continue;
        }
        map.entry(fqn.simple_name().to_string())
            .or_default()
            .push(fqn);
    }
    map
}

fn rebind_unknown_references(model: &mut StubbedModel) {
    let concrete = concrete_by_simple(model);
    for unit in model.units_mut() {
        for_each_named_mut(unit, &mut |named| {
            let fqn = named.denoted_fqn();
            if !fqn.is_unknown_package() || fqn.simple_name() == jess_core::UNKNOWN_TYPE_SIMPLE {
                return;
            }
            if let Some(candidates) = concrete.get(fqn.simple_name()) {
                if let [only] = candidates.as_slice() {
                    debug!(from = %fqn, to = %only, "rebound placeholder reference");
                    named.name = only.as_str().to_string();
                    named.resolution =
                        Resolution::Resolved(Symbol::new(only.as_str(), SymbolKind::Class));
                }
            }
        });
    }
}

// ---- pass 3: unknown supertypes ------------------------------------------

fn rebind_unknown_supertypes(model: &mut StubbedModel) {
    let concrete = concrete_by_simple(model);
    let created: Vec<Fqn> = model.created.iter().cloned().collect();
    for fqn in created {
        let package = fqn.package().to_string();
        let Some(decl) = model.type_mut(&fqn) else {
            continue;
        };
        let Some(TypeRef::Named(superclass)) = decl.superclass.as_mut() else {
            continue;
        };
        let denoted = superclass.denoted_fqn();
        if !denoted.is_unknown_package() {
            continue;
        }
        let Some(candidates) = concrete.get(denoted.simple_name()) else {
            continue;
        };
        let chosen = candidates
            .iter()
            .find(|candidate| candidate.package() == package)
            .or_else(|| candidates.first());
        if let Some(chosen) = chosen {
            superclass.name = chosen.as_str().to_string();
            superclass.resolution =
                Resolution::Resolved(Symbol::new(chosen.as_str(), SymbolKind::Class));
        }
    }
}

// ---- pass 4: auto-implement inherited abstract methods -------------------

fn auto_implement(model: &mut StubbedModel) {
    // Snapshot every interface declaration first.
    let interfaces: HashMap<Fqn, TypeDecl> = model
        .all_types()
        .into_iter()
        .filter(|(_, decl)| decl.kind == TypeKind::Interface)
        .map(|(fqn, decl)| (fqn, decl.clone()))
        .collect();

    let classes: Vec<Fqn> = model
        .all_types()
        .into_iter()
        .filter(|(_, decl)| matches!(decl.kind, TypeKind::Class | TypeKind::Enum))
        .filter(|(_, decl)| !decl.interfaces.is_empty())
        .map(|(fqn, _)| fqn)
        .collect();

    let mut next_node = 1u32 << 26;
    for class_fqn in classes {
        let Some(class_decl) = model.type_mut(&class_fqn) else {
            continue;
        };
        let iface_refs: Vec<TypeRef> = class_decl.interfaces.clone();
        for iface_ref in iface_refs {
            let TypeRef::Named(named) = &iface_ref else {
                continue;
            };
            let Some(iface) = interfaces.get(&named.denoted_fqn()) else {
                continue;
            };
            // Formal → actual substitution for this implements edge.
            let substitution: HashMap<String, TypeRef> = iface
                .type_params
                .iter()
                .zip(&named.args)
                .map(|(param, actual)| (param.name.clone(), actual.clone()))
                .collect();
            for method in iface.abstract_methods() {
                let exists = class_decl
                    .methods()
                    .any(|m| m.name == method.name && m.params.len() == method.params.len());
                if exists {
                    // Ties between same-signature inherited methods: the
                    // first interface wins.
                    continue;
                }
                let mut clone = method.clone();
                clone.id = jess_core::NodeId::from_raw(next_node);
                next_node += 1;
                clone.modifiers = Modifiers::PUBLIC;
                clone.return_type = substitute(clone.return_type, &substitution);
                for param in &mut clone.params {
                    param.ty = substitute(param.ty.clone(), &substitution);
                }
                clone.body = Some(default_body(&clone.return_type));
                class_decl.members.push(Member::Method(clone));
            }
        }
    }
}

fn substitute(ty: TypeRef, substitution: &HashMap<String, TypeRef>) -> TypeRef {
    match ty {
        TypeRef::Named(mut named) => {
            if named.args.is_empty() {
                if let Some(actual) = substitution.get(&named.name) {
                    return actual.clone();
                }
            }
            named.args = named
                .args
                .into_iter()
                .map(|arg| substitute(arg, substitution))
                .collect();
            TypeRef::Named(named)
        }
        TypeRef::Array { component, span } => TypeRef::Array {
            component: Box::new(substitute(*component, substitution)),
            span,
        },
        other => other,
    }
}

fn default_body(return_type: &TypeRef) -> Block {
    let span = Span::default();
    match return_type.default_value_text() {
        Some(text) => Block::new(
            vec![Stmt::Return {
                value: Some(Expr::Literal(jess_ast::Literal::new(
                    match text {
                        "null" => jess_ast::LiteralKind::Null,
                        "false" => jess_ast::LiteralKind::Bool,
                        "'\\0'" => jess_ast::LiteralKind::Char,
                        "0L" => jess_ast::LiteralKind::Long,
                        "0.0f" => jess_ast::LiteralKind::Float,
                        "0.0d" => jess_ast::LiteralKind::Double,
                        _ => jess_ast::LiteralKind::Int,
                    },
                    text,
                    span,
                ))),
                span,
            }],
            span,
        ),
        None => Block::empty(span),
    }
}

// ---- pass 5: SAM uniqueness ----------------------------------------------

fn enforce_functional_interfaces(model: &mut StubbedModel) {
    let functional: Vec<Fqn> = model
        .all_types()
        .into_iter()
        .filter(|(_, decl)| decl.functional && decl.kind == TypeKind::Interface)
        .map(|(fqn, _)| fqn)
        .collect();
    for fqn in functional {
        let Some(decl) = model.type_mut(&fqn) else {
            continue;
        };
        let mut seen_sam = false;
        decl.members.retain(|member| match member {
            Member::Method(method) => {
                let is_abstract = !method.modifiers.is_static()
                    && !method.modifiers.is_default()
                    && method.body.is_none();
                if !is_abstract {
                    return true;
                }
                if seen_sam {
                    debug!(owner = %fqn, method = %method.name, "dropping extra abstract method on functional interface");
                    false
                } else {
                    seen_sam = true;
                    true
                }
            }
            _ => true,
        });
    }
}

// ---- pass 6: builder completion ------------------------------------------

fn complete_builders(model: &mut StubbedModel) {
    // A `builder()` method whose return mentions Builder forces a Builder
    // type with a `get()` returning the owner. The target is whatever type
    // the return reference actually denotes — the unqualified
    // `Builder b = Thing.builder();` idiom lands on a flat `p.Builder`, the
    // qualified one on `p.Thing$Builder` — and only when the reference
    // denotes nothing declared is the nested form manufactured.
    let declared: BTreeSet<Fqn> = model.all_types().into_iter().map(|(fqn, _)| fqn).collect();
    let mut forced: Vec<(Fqn, Fqn, bool)> = Vec::new();
    for (fqn, decl) in model.all_types() {
        for method in decl.methods() {
            if method.name != "builder" {
                continue;
            }
            let rendered = jess_ast::render_type_ref(&method.return_type);
            if !rendered.contains("Builder") {
                continue;
            }
            let denoted = method
                .return_type
                .as_named()
                .map(|named| named.denoted_fqn());
            let (builder_fqn, rebind_return) = match denoted {
                Some(denoted) if declared.contains(&denoted) => (denoted, false),
                _ => (fqn.nest("Builder"), true),
            };
            forced.push((fqn.clone(), builder_fqn, rebind_return));
        }
    }

    let mut next_node = 1u32 << 27;
    for (owner_fqn, builder_fqn, rebind_return) in forced {
        let owner_simple_ref = TypeRef::named(owner_fqn.as_str(), Span::default());
        if model.type_mut(&builder_fqn).is_none() {
            let Some(owner) = model.type_mut(&owner_fqn) else {
                continue;
            };
            if owner.find_nested_mut("Builder").is_none() {
                let mut builder = TypeDecl::new(
                    jess_core::NodeId::from_raw(next_node),
                    TypeKind::Class,
                    "Builder",
                    Span::default(),
                );
                next_node += 1;
                builder.modifiers.insert(Modifiers::PUBLIC);
                builder.modifiers.insert(Modifiers::STATIC);
                owner.members.push(Member::Type(builder));
                model.created.insert(builder_fqn.clone());
            }
        }
        if rebind_return {
            // The reference denoted nothing declared; point `builder()` at
            // the type just forced so it does not dangle.
            if let Some(owner) = model.type_mut(&owner_fqn) {
                for method in owner.methods_mut() {
                    if method.name == "builder"
                        && jess_ast::render_type_ref(&method.return_type).contains("Builder")
                    {
                        method.return_type =
                            TypeRef::named(builder_fqn.as_str(), Span::default());
                    }
                }
            }
        }
        let Some(builder) = model.type_mut(&builder_fqn) else {
            continue;
        };
        if !builder.methods().any(|m| m.name == "get") {
            builder.members.push(Member::Method(jess_ast::MethodDecl {
                id: jess_core::NodeId::from_raw(next_node),
                modifiers: Modifiers::PUBLIC,
                annotations: Vec::new(),
                type_params: Vec::new(),
                return_type: owner_simple_ref.clone(),
                name: "get".to_string(),
                params: Vec::new(),
                varargs: false,
                throws: Vec::new(),
                body: Some(default_body(&owner_simple_ref)),
                annotation_default: None,
                span: Span::default(),
            }));
            next_node += 1;
        }
    }

    // Fluent-setter returns on Builder types.
    let builders: Vec<Fqn> = model
        .all_types()
        .into_iter()
        .filter(|(fqn, _)| fqn.simple_name() == "Builder")
        .filter(|(fqn, _)| model.created.contains(fqn))
        .map(|(fqn, _)| fqn)
        .collect();
    for fqn in builders {
        let self_ref = TypeRef::named(fqn.as_str(), Span::default());
        let Some(decl) = model.type_mut(&fqn) else {
            continue;
        };
        for method in decl.methods_mut() {
            let name = method.name.as_str();
            if name.starts_with("set") || name.starts_with("with") {
                method.return_type = self_ref.clone();
                method.body = Some(default_body(&method.return_type));
            } else if let Some(origin) = name.strip_prefix("checkOrigin") {
                let param_ty = match origin {
                    "File" => Some(TypeRef::named("java.io.File", Span::default())),
                    "ByteArray" => Some(TypeRef::array_of(
                        TypeRef::Primitive(jess_ast::PrimitiveKind::Byte, Span::default()),
                        Span::default(),
                    )),
                    "Path" => Some(TypeRef::named("java.nio.file.Path", Span::default())),
                    _ => None,
                };
                match param_ty {
                    Some(param_ty) => {
                        if let Some(param) = method.params.first_mut() {
                            param.ty = param_ty;
                        }
                        method.return_type = self_ref.clone();
                    }
                    None => {
                        method.return_type =
                            TypeRef::named("java.lang.Object", Span::default());
                    }
                }
                method.body = Some(default_body(&method.return_type));
            }
        }
    }
}

// ---- pass 7: ambiguous simple names --------------------------------------

fn qualify_ambiguous_simple_names(model: &mut StubbedModel) {
    let mut packages_by_simple: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut fqn_by_simple: BTreeMap<String, BTreeMap<String, Fqn>> = BTreeMap::new();
    for (fqn, _) in model.all_types() {
        packages_by_simple
            .entry(fqn.simple_name().to_string())
            .or_default()
            .insert(fqn.package().to_string());
        fqn_by_simple
            .entry(fqn.simple_name().to_string())
            .or_default()
            .insert(fqn.package().to_string(), fqn.clone());
    }

    for unit in model.units_mut() {
        for_each_named_mut(unit, &mut |named| {
            if named.name.contains('.') {
                return;
            }
            let Some(packages) = packages_by_simple.get(&named.name) else {
                return;
            };
            if packages.len() < 2 {
                return;
            }
            match &named.resolution {
                Resolution::Resolved(sym)
                    if sym.kind != SymbolKind::TypeParam && !sym.fqn.is_jdk() =>
                {
                    // Semantics already pinned down; just spell it out.
                    named.name = sym.fqn.as_str().to_string();
                }
                Resolution::Resolved(_) => {}
                _ => {
                    // The documented tie-break: the `unknown` package wins
                    // when it is among the candidates.
                    let chosen_pkg = if packages.contains(UNKNOWN_PACKAGE) {
                        UNKNOWN_PACKAGE.to_string()
                    } else {
                        packages.iter().next().cloned().unwrap_or_default()
                    };
                    if let Some(fqn) =
                        fqn_by_simple[&named.name].get(&chosen_pkg)
                    {
                        named.name = fqn.as_str().to_string();
                    }
                }
            }
        });
    }
}

// ---- pass 8: dead unknown imports ----------------------------------------

fn remove_dead_unknown_imports(model: &mut StubbedModel) {
    for unit in model.units_mut() {
        let mut uses_unknown = false;
        for_each_named(unit, &mut |named| {
            if named.denoted_fqn().is_unknown_package() {
                uses_unknown = true;
            }
        });
        if !uses_unknown {
            unit.imports.retain(|import| {
                !(import.path.starts_with("unknown.") || import.path == UNKNOWN_PACKAGE)
            });
        }
    }
}

// ---- pass 9: meta-annotations --------------------------------------------

fn canonicalise_meta_annotations(model: &mut StubbedModel, options: &StubberOptions) {
    // Rebind @Target and friends to their platform FQNs, including their
    // enum-constant argument qualifiers.
    for unit in model.units_mut() {
        for decl in &mut unit.types {
            canonicalise_decl_annotations(decl);
        }
    }

    if !options.repeatable_container_heuristic {
        return;
    }

    // Collect created annotation types and where they are used repeatedly.
    let created_annotations: Vec<Fqn> = model
        .all_types()
        .into_iter()
        .filter(|(fqn, decl)| {
            decl.kind == TypeKind::Annotation && model.created.contains(fqn)
        })
        .map(|(fqn, _)| fqn)
        .collect();
    let declared: BTreeSet<Fqn> = model.all_types().into_iter().map(|(fqn, _)| fqn).collect();

    let mut repeated: BTreeSet<Fqn> = BTreeSet::new();
    for unit in model.units() {
        for decl in &unit.types {
            collect_repeated_annotations(decl, &mut repeated);
        }
    }

    let mut next_node = 1u32 << 28;
    for base in created_annotations {
        let container_fqn = Fqn::from_parts(base.package(), &format!("{}s", base.simple_name()));
        let container_exists = declared.contains(&container_fqn);
        let needs_container = repeated
            .iter()
            .any(|fqn| fqn.simple_name() == base.simple_name() || *fqn == base);
        if !container_exists && !needs_container {
            continue;
        }
        if !container_exists {
            // Synthesise the sibling container with `value(): Base[]`.
            let mut container = TypeDecl::new(
                jess_core::NodeId::from_raw(next_node),
                TypeKind::Annotation,
                container_fqn.simple_name(),
                Span::default(),
            );
            next_node += 1;
            container.modifiers.insert(Modifiers::PUBLIC);
            let base_array = TypeRef::array_of(
                TypeRef::named(base.as_str(), Span::default()),
                Span::default(),
            );
            container.members.push(Member::Method(jess_ast::MethodDecl {
                id: jess_core::NodeId::from_raw(next_node),
                modifiers: Modifiers::PUBLIC,
                annotations: Vec::new(),
                type_params: Vec::new(),
                return_type: base_array,
                name: "value".to_string(),
                params: Vec::new(),
                varargs: false,
                throws: Vec::new(),
                body: None,
                annotation_default: None,
                span: Span::default(),
            }));
            next_node += 1;
            model.stubs.insert(
                container_fqn.clone(),
                CompilationUnit {
                    file: jess_core::FileId::from_raw(u32::MAX),
                    path: std::path::PathBuf::from(format!(
                        "{}.java",
                        container_fqn.simple_name()
                    )),
                    package: if container_fqn.package().is_empty() {
                        None
                    } else {
                        Some(container_fqn.package().to_string())
                    },
                    imports: Vec::new(),
                    types: vec![container],
                },
            );
            model.created.insert(container_fqn.clone());
        }

        if let Some(base_decl) = model.type_mut(&base) {
            let already = base_decl.annotations.iter().any(|ann| {
                ann.ty.written_simple_name() == "Repeatable"
                    || ann.ty.name.ends_with("annotation.Repeatable")
            });
            if !already {
                base_decl.annotations.push(AnnotationUse {
                    ty: NamedType::new("java.lang.annotation.Repeatable", Span::default()),
                    args: vec![AnnotationArg::Value(Expr::ClassLiteral {
                        ty: TypeRef::named(container_fqn.as_str(), Span::default()),
                        span: Span::default(),
                    })],
                    span: Span::default(),
                });
            }
        }
    }
}

fn canonicalise_decl_annotations(decl: &mut TypeDecl) {
    for ann in &mut decl.annotations {
        canonicalise_annotation(ann);
    }
    for member in &mut decl.members {
        match member {
            Member::Field(field) => {
                for ann in &mut field.annotations {
                    canonicalise_annotation(ann);
                }
            }
            Member::Method(method) => {
                for ann in &mut method.annotations {
                    canonicalise_annotation(ann);
                }
            }
            Member::Constructor(ctor) => {
                for ann in &mut ctor.annotations {
                    canonicalise_annotation(ann);
                }
            }
            Member::Type(nested) => canonicalise_decl_annotations(nested),
            Member::Initializer(_) => {}
        }
    }
}

fn canonicalise_annotation(ann: &mut AnnotationUse) {
    let simple = ann.ty.written_simple_name().to_string();
    if META_ANNOTATIONS.contains(&simple.as_str()) {
        let canonical = format!("java.lang.annotation.{simple}");
        ann.ty.name = canonical.clone();
        ann.ty.resolution =
            Resolution::Resolved(Symbol::new(canonical.as_str(), SymbolKind::Annotation));
    }
    for arg in &mut ann.args {
        let value = match arg {
            AnnotationArg::Value(value) => value,
            AnnotationArg::Named { value, .. } => value,
        };
        canonicalise_annotation_value(value);
    }
}

fn canonicalise_annotation_value(value: &mut Expr) {
    match value {
        Expr::ArrayInit { values, .. } => {
            for value in values {
                canonicalise_annotation_value(value);
            }
        }
        Expr::FieldAccess { receiver, .. } => {
            if let Expr::Name(name) = receiver.as_mut() {
                if name.name == "ElementType" || name.name == "RetentionPolicy" {
                    name.name = format!("java.lang.annotation.{}", name.name);
                }
            }
        }
        _ => {}
    }
}

fn collect_repeated_annotations(decl: &TypeDecl, out: &mut BTreeSet<Fqn>) {
    fn note(annotations: &[AnnotationUse], out: &mut BTreeSet<Fqn>) {
        let mut counts: BTreeMap<Fqn, usize> = BTreeMap::new();
        for ann in annotations {
            *counts.entry(ann.ty.denoted_fqn()).or_insert(0) += 1;
        }
        for (fqn, count) in counts {
            if count > 1 {
                out.insert(fqn);
            }
        }
    }

    note(&decl.annotations, out);
    for member in &decl.members {
        match member {
            Member::Field(field) => note(&field.annotations, out),
            Member::Method(method) => note(&method.annotations, out),
            Member::Constructor(ctor) => note(&ctor.annotations, out),
            Member::Type(nested) => collect_repeated_annotations(nested, out),
            Member::Initializer(_) => {}
        }
    }
}

// ---- shared walkers -------------------------------------------------------

/// Visits every named type reference in a unit, signatures and bodies both.
pub(crate) fn for_each_named(unit: &CompilationUnit, f: &mut impl FnMut(&NamedType)) {
    fn ty(node: &TypeRef, f: &mut impl FnMut(&NamedType)) {
        match node {
            TypeRef::Named(named) => {
                f(named);
                for arg in &named.args {
                    ty(arg, f);
                }
            }
            TypeRef::Array { component, .. } => ty(component, f),
            TypeRef::Wildcard {
                bound: Some((_, bound)),
                ..
            } => ty(bound, f),
            _ => {}
        }
    }

    fn expr(node: &Expr, f: &mut impl FnMut(&NamedType)) {
        match node {
            Expr::New { ty: t, args, .. } => {
                ty(t, f);
                for arg in args {
                    expr(arg, f);
                }
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                ..
            } => {
                ty(element, f);
                for dim in dims.iter().flatten() {
                    expr(dim, f);
                }
                for value in initializer.iter().flatten() {
                    expr(value, f);
                }
            }
            Expr::Cast { ty: t, value, .. } => {
                ty(t, f);
                expr(value, f);
            }
            Expr::InstanceOf { value, ty: t, .. } => {
                expr(value, f);
                ty(t, f);
            }
            Expr::ClassLiteral { ty: t, .. } => ty(t, f),
            Expr::MethodRef { target, .. } => match target {
                MethodRefTarget::Expr(value) => expr(value, f),
                MethodRefTarget::Type(t) => ty(t, f),
            },
            Expr::Lambda { params, body, .. } => {
                for param in params {
                    if let Some(t) = &param.ty {
                        ty(t, f);
                    }
                }
                match body {
                    LambdaBody::Expr(value) => expr(value, f),
                    LambdaBody::Block(b) => block(b, f),
                }
            }
            Expr::MethodCall {
                receiver,
                type_args,
                args,
                ..
            } => {
                if let Some(receiver) = receiver {
                    expr(receiver, f);
                }
                for t in type_args {
                    ty(t, f);
                }
                for arg in args {
                    expr(arg, f);
                }
            }
            Expr::FieldAccess { receiver, .. } => expr(receiver, f),
            Expr::Assign { lhs, rhs, .. } | Expr::Binary { lhs, rhs, .. } => {
                expr(lhs, f);
                expr(rhs, f);
            }
            Expr::Unary { value, .. } | Expr::Paren { value, .. } => expr(value, f),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => {
                expr(cond, f);
                expr(then_value, f);
                expr(else_value, f);
            }
            Expr::ArrayIndex { array, index, .. } => {
                expr(array, f);
                expr(index, f);
            }
            Expr::ArrayInit { values, .. } => {
                for value in values {
                    expr(value, f);
                }
            }
            Expr::Literal(_) | Expr::Name(_) | Expr::This { .. } | Expr::SuperRef { .. } => {}
        }
    }

    fn block(node: &Block, f: &mut impl FnMut(&NamedType)) {
        for stmt in &node.statements {
            stmt_walk(stmt, f);
        }
    }

    fn stmt_walk(stmt: &Stmt, f: &mut impl FnMut(&NamedType)) {
        match stmt {
            Stmt::Block(b) => block(b, f),
            Stmt::Local(local) => {
                ty(&local.ty, f);
                if let Some(init) = &local.init {
                    expr(init, f);
                }
            }
            Stmt::Expr(e) => expr(e, f),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    expr(value, f);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                expr(cond, f);
                stmt_walk(then_branch, f);
                if let Some(else_branch) = else_branch {
                    stmt_walk(else_branch, f);
                }
            }
            Stmt::While { cond, body, .. } => {
                expr(cond, f);
                stmt_walk(body, f);
            }
            Stmt::Throw { value, .. } => expr(value, f),
            Stmt::Empty(_) => {}
        }
    }

    fn decl(node: &TypeDecl, f: &mut impl FnMut(&NamedType)) {
        for ann in &node.annotations {
            f(&ann.ty);
        }
        for param in &node.type_params {
            for bound in &param.bounds {
                ty(bound, f);
            }
        }
        if let Some(superclass) = &node.superclass {
            ty(superclass, f);
        }
        for iface in &node.interfaces {
            ty(iface, f);
        }
        for member in &node.members {
            match member {
                Member::Field(field) => {
                    for ann in &field.annotations {
                        f(&ann.ty);
                    }
                    ty(&field.ty, f);
                    if let Some(init) = &field.init {
                        expr(init, f);
                    }
                }
                Member::Method(method) => {
                    for ann in &method.annotations {
                        f(&ann.ty);
                    }
                    for param in &method.type_params {
                        for bound in &param.bounds {
                            ty(bound, f);
                        }
                    }
                    ty(&method.return_type, f);
                    for param in &method.params {
                        ty(&param.ty, f);
                    }
                    for thrown in &method.throws {
                        ty(thrown, f);
                    }
                    if let Some(body) = &method.body {
                        block(body, f);
                    }
                }
                Member::Constructor(ctor) => {
                    for param in &ctor.params {
                        ty(&param.ty, f);
                    }
                    for thrown in &ctor.throws {
                        ty(thrown, f);
                    }
                    block(&ctor.body, f);
                }
                Member::Initializer(init) => block(&init.body, f),
                Member::Type(nested) => decl(nested, f),
            }
        }
    }

    for node in &unit.types {
        decl(node, f);
    }
}

/// Mutable counterpart of [`for_each_named`].
pub(crate) fn for_each_named_mut(
    unit: &mut CompilationUnit,
    f: &mut impl FnMut(&mut NamedType),
) {
    fn ty(node: &mut TypeRef, f: &mut impl FnMut(&mut NamedType)) {
        match node {
            TypeRef::Named(named) => {
                f(named);
                for arg in &mut named.args {
                    ty(arg, f);
                }
            }
            TypeRef::Array { component, .. } => ty(component, f),
            TypeRef::Wildcard {
                bound: Some((_, bound)),
                ..
            } => ty(bound, f),
            _ => {}
        }
    }

    fn expr(node: &mut Expr, f: &mut impl FnMut(&mut NamedType)) {
        match node {
            Expr::New { ty: t, args, .. } => {
                ty(t, f);
                for arg in args {
                    expr(arg, f);
                }
            }
            Expr::NewArray {
                element,
                dims,
                initializer,
                ..
            } => {
                ty(element, f);
                for dim in dims.iter_mut().flatten() {
                    expr(dim, f);
                }
                for value in initializer.iter_mut().flatten() {
                    expr(value, f);
                }
            }
            Expr::Cast { ty: t, value, .. } => {
                ty(t, f);
                expr(value, f);
            }
            Expr::InstanceOf { value, ty: t, .. } => {
                expr(value, f);
                ty(t, f);
            }
            Expr::ClassLiteral { ty: t, .. } => ty(t, f),
            Expr::MethodRef { target, .. } => match target {
                MethodRefTarget::Expr(value) => expr(value, f),
                MethodRefTarget::Type(t) => ty(t, f),
            },
            Expr::Lambda { params, body, .. } => {
                for param in params {
                    if let Some(t) = &mut param.ty {
                        ty(t, f);
                    }
                }
                match body {
                    LambdaBody::Expr(value) => expr(value, f),
                    LambdaBody::Block(b) => block(b, f),
                }
            }
            Expr::MethodCall {
                receiver,
                type_args,
                args,
                ..
            } => {
                if let Some(receiver) = receiver {
                    expr(receiver, f);
                }
                for t in type_args {
                    ty(t, f);
                }
                for arg in args {
                    expr(arg, f);
                }
            }
            Expr::FieldAccess { receiver, .. } => expr(receiver, f),
            Expr::Assign { lhs, rhs, .. } | Expr::Binary { lhs, rhs, .. } => {
                expr(lhs, f);
                expr(rhs, f);
            }
            Expr::Unary { value, .. } | Expr::Paren { value, .. } => expr(value, f),
            Expr::Conditional {
                cond,
                then_value,
                else_value,
                ..
            } => {
                expr(cond, f);
                expr(then_value, f);
                expr(else_value, f);
            }
            Expr::ArrayIndex { array, index, .. } => {
                expr(array, f);
                expr(index, f);
            }
            Expr::ArrayInit { values, .. } => {
                for value in values {
                    expr(value, f);
                }
            }
            Expr::Literal(_) | Expr::Name(_) | Expr::This { .. } | Expr::SuperRef { .. } => {}
        }
    }

    fn block(node: &mut Block, f: &mut impl FnMut(&mut NamedType)) {
        for stmt in &mut node.statements {
            stmt_walk(stmt, f);
        }
    }

    fn stmt_walk(stmt: &mut Stmt, f: &mut impl FnMut(&mut NamedType)) {
        match stmt {
            Stmt::Block(b) => block(b, f),
            Stmt::Local(local) => {
                ty(&mut local.ty, f);
                if let Some(init) = &mut local.init {
                    expr(init, f);
                }
            }
            Stmt::Expr(e) => expr(e, f),
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    expr(value, f);
                }
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                expr(cond, f);
                stmt_walk(then_branch, f);
                if let Some(else_branch) = else_branch {
                    stmt_walk(else_branch, f);
                }
            }
            Stmt::While { cond, body, .. } => {
                expr(cond, f);
                stmt_walk(body, f);
            }
            Stmt::Throw { value, .. } => expr(value, f),
            Stmt::Empty(_) => {}
        }
    }

    fn decl(node: &mut TypeDecl, f: &mut impl FnMut(&mut NamedType)) {
        for ann in &mut node.annotations {
            f(&mut ann.ty);
        }
        for param in &mut node.type_params {
            for bound in &mut param.bounds {
                ty(bound, f);
            }
        }
        if let Some(superclass) = &mut node.superclass {
            ty(superclass, f);
        }
        for iface in &mut node.interfaces {
            ty(iface, f);
        }
        for member in &mut node.members {
            match member {
                Member::Field(field) => {
                    for ann in &mut field.annotations {
                        f(&mut ann.ty);
                    }
                    ty(&mut field.ty, f);
                    if let Some(init) = &mut field.init {
                        expr(init, f);
                    }
                }
                Member::Method(method) => {
                    for ann in &mut method.annotations {
                        f(&mut ann.ty);
                    }
                    for param in &mut method.type_params {
                        for bound in &mut param.bounds {
                            ty(bound, f);
                        }
                    }
                    ty(&mut method.return_type, f);
                    for param in &mut method.params {
                        ty(&mut param.ty, f);
                    }
                    for thrown in &mut method.throws {
                        ty(thrown, f);
                    }
                    if let Some(body) = &mut method.body {
                        block(body, f);
                    }
                }
                Member::Constructor(ctor) => {
                    for param in &mut ctor.params {
                        ty(&mut param.ty, f);
                    }
                    for thrown in &mut ctor.throws {
                        ty(thrown, f);
                    }
                    block(&mut ctor.body, f);
                }
                Member::Initializer(init) => block(&mut init.body, f),
                Member::Type(nested) => decl(nested, f),
            }
        }
    }

    for node in &mut unit.types {
        decl(node, f);
    }
}
