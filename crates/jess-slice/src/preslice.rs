//! Keep-set computation.

use jess_ast::{
    Block, CompilationUnit, Expr, LambdaBody, Member, MethodDecl, MethodRefTarget, Resolution,
    Stmt, SymbolKind, TypeDecl, TypeRef,
};
use jess_core::{Fqn, NodeId};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// A `(name, parameter-type-list)` pattern naming a method to keep.
///
/// `param_types` are source-level spellings as produced by descriptor
/// translation (`int`, `java.lang.String[]`). `None` means any signature
/// with the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPattern {
    pub name: String,
    pub param_types: Option<Vec<String>>,
}

impl MethodPattern {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_types: None,
        }
    }

    pub fn with_params(name: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            name: name.into(),
            param_types: Some(params),
        }
    }

    fn matches(&self, method: &MethodDecl, loose: bool) -> bool {
        if method.name != self.name {
            return false;
        }
        let Some(params) = &self.param_types else {
            return true;
        };
        if params.len() != method.params.len() {
            return false;
        }
        if loose {
            // Loose matching compares only name and arity.
            return true;
        }
        params
            .iter()
            .zip(&method.params)
            .all(|(pattern, param)| type_names_unify(pattern, &param.ty))
    }
}

/// The keep rules: patterns plus the initializer sentinels.
#[derive(Debug, Clone, Default)]
pub struct KeepRules {
    /// Empty means "keep every method of the target type".
    pub patterns: Vec<MethodPattern>,
    pub keep_class_init: bool,
    pub keep_instance_init: bool,
}

/// The set of declaration identities that survive slicing, closed under
/// transitive use from the initial members.
#[derive(Debug, Default)]
pub struct KeepSet {
    kept: HashSet<NodeId>,
}

impl KeepSet {
    pub fn contains(&self, id: NodeId) -> bool {
        self.kept.contains(&id)
    }

    pub fn insert(&mut self, id: NodeId) -> bool {
        self.kept.insert(id)
    }

    pub fn len(&self) -> usize {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
}

/// Compares a pattern type spelling against a declared parameter type,
/// tolerating package-qualification differences (`String` unifies with
/// `java.lang.String`).
fn type_names_unify(pattern: &str, ty: &TypeRef) -> bool {
    fn normalize(name: &str) -> (String, usize) {
        let mut base = name.trim();
        let mut dims = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dims += 1;
        }
        // Generics never appear in descriptor-derived patterns.
        let base = base.split('<').next().unwrap_or(base);
        let simple = base.rsplit('.').next().unwrap_or(base);
        (simple.to_string(), dims)
    }

    let (pattern_simple, pattern_dims) = normalize(pattern);
    let rendered = jess_ast::render_type_ref(ty);
    let (decl_simple, decl_dims) = normalize(&rendered);
    pattern_simple == decl_simple && pattern_dims == decl_dims
}

/// What one kept element refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum RefKey {
    Type(Fqn),
    Method { owner: Fqn, name: String, arity: usize },
    Field { owner: Fqn, name: String },
    Ctor { owner: Fqn, arity: usize },
}

/// Computes the keep set over the root unit and the foreign units.
///
/// The primary type of the root is always kept; the patterns select its
/// methods (all of them when the pattern list is empty); everything they
/// use transitively — across units, through the resolver's annotations —
/// is kept too, up to a fixpoint.
pub fn compute_keep_set(
    root: &CompilationUnit,
    foreign: &BTreeMap<Fqn, CompilationUnit>,
    rules: &KeepRules,
    loose: bool,
) -> KeepSet {
    let mut index = DeclIndex::default();
    index.add_unit(root);
    for unit in foreign.values() {
        index.add_unit(unit);
    }

    let mut keep = KeepSet::default();
    let mut queue: VecDeque<NodeId> = VecDeque::new();

    let Some(primary) = root.primary_type() else {
        return keep;
    };
    let primary_fqn = root.fqn_of(primary);
    keep.insert(primary.id);

    // Seed: matching methods (or everything in class mode) plus the
    // requested initializers.
    for member in &primary.members {
        let seed = match member {
            Member::Method(method) => {
                rules.patterns.is_empty()
                    || rules
                        .patterns
                        .iter()
                        .any(|pattern| pattern.matches(method, loose))
            }
            Member::Constructor(_) => rules.patterns.is_empty(),
            Member::Initializer(init) => {
                if init.is_static {
                    rules.keep_class_init || rules.patterns.is_empty()
                } else {
                    rules.keep_instance_init || rules.patterns.is_empty()
                }
            }
            Member::Field(_) | Member::Type(_) => rules.patterns.is_empty(),
        };
        if seed && keep.insert(member.id()) {
            queue.push_back(member.id());
        }
    }

    if queue.is_empty() && !rules.patterns.is_empty() {
        debug!(target = %primary_fqn, "no method matched the keep patterns");
    }

    // Fixpoint over transitive use.
    while let Some(id) = queue.pop_front() {
        let Some(site) = index.by_id.get(&id) else {
            continue;
        };
        let refs = match site.clone() {
            DeclSite::Type(fqn) => {
                let decl = index.types[&fqn];
                type_shell_refs(decl)
            }
            DeclSite::Member { owner, index: pos } => {
                let decl = index.types[&owner];
                member_refs(&decl.members[pos], &owner)
            }
        };
        for key in refs {
            for target in index.resolve(&key) {
                if keep.insert(target) {
                    queue.push_back(target);
                }
            }
        }
        // Enclosing types of anything kept are kept.
        if let DeclSite::Member { owner, .. } = &index.by_id[&id] {
            for enclosing in owner.nesting_chain() {
                if let Some(decl) = index.types.get(&enclosing) {
                    if keep.insert(decl.id) {
                        queue.push_back(decl.id);
                    }
                }
            }
        }
    }

    debug!(kept = keep.len(), "keep-set fixpoint reached");
    keep
}

#[derive(Clone)]
enum DeclSite {
    Type(Fqn),
    Member { owner: Fqn, index: usize },
}

#[derive(Default)]
struct DeclIndex<'a> {
    types: HashMap<Fqn, &'a TypeDecl>,
    by_id: HashMap<NodeId, DeclSite>,
}

impl<'a> DeclIndex<'a> {
    fn add_unit(&mut self, unit: &'a CompilationUnit) {
        let package = unit.package.clone().unwrap_or_default();
        for decl in &unit.types {
            self.add_type(Fqn::from_parts(&package, &decl.name), decl);
        }
    }

    fn add_type(&mut self, fqn: Fqn, decl: &'a TypeDecl) {
        self.by_id.insert(decl.id, DeclSite::Type(fqn.clone()));
        for (pos, member) in decl.members.iter().enumerate() {
            self.by_id.insert(
                member.id(),
                DeclSite::Member {
                    owner: fqn.clone(),
                    index: pos,
                },
            );
            if let Member::Type(nested) = member {
                self.add_type(fqn.nest(&nested.name), nested);
            }
        }
        self.types.insert(fqn, decl);
    }

    /// Declaration ids a reference key lands on, if the target is declared
    /// in the loaded sources.
    fn resolve(&self, key: &RefKey) -> Vec<NodeId> {
        match key {
            RefKey::Type(fqn) => self
                .types
                .get(fqn)
                .map(|decl| vec![decl.id])
                .unwrap_or_default(),
            RefKey::Method { owner, name, arity } => {
                let Some(decl) = self.types.get(owner) else {
                    return Vec::new();
                };
                let exact: Vec<NodeId> = decl
                    .methods()
                    .filter(|m| &m.name == name && m.arity() == *arity)
                    .map(|m| m.id)
                    .collect();
                if !exact.is_empty() {
                    return exact;
                }
                // Arity mismatches still keep same-named methods so varargs
                // and defaulted overloads survive.
                decl.methods()
                    .filter(|m| &m.name == name)
                    .map(|m| m.id)
                    .collect()
            }
            RefKey::Field { owner, name } => {
                let Some(decl) = self.types.get(owner) else {
                    return Vec::new();
                };
                decl.fields()
                    .filter(|f| &f.name == name)
                    .map(|f| f.id)
                    .collect()
            }
            RefKey::Ctor { owner, arity } => {
                let Some(decl) = self.types.get(owner) else {
                    return Vec::new();
                };
                let exact: Vec<NodeId> = decl
                    .members
                    .iter()
                    .filter_map(|member| match member {
                        Member::Constructor(ctor) if ctor.params.len() == *arity => Some(ctor.id),
                        _ => None,
                    })
                    .collect();
                if !exact.is_empty() {
                    return exact;
                }
                decl.members
                    .iter()
                    .filter_map(|member| match member {
                        Member::Constructor(ctor) => Some(ctor.id),
                        _ => None,
                    })
                    .collect()
            }
        }
    }
}

/// References made by a type's shell: supertypes, type-parameter bounds,
/// annotations.
fn type_shell_refs(decl: &TypeDecl) -> Vec<RefKey> {
    let mut refs = Vec::new();
    if let Some(superclass) = &decl.superclass {
        collect_type(superclass, &mut refs);
    }
    for iface in &decl.interfaces {
        collect_type(iface, &mut refs);
    }
    for param in &decl.type_params {
        for bound in &param.bounds {
            collect_type(bound, &mut refs);
        }
    }
    for ann in &decl.annotations {
        if let Resolution::Resolved(sym) = &ann.ty.resolution {
            refs.push(RefKey::Type(sym.fqn.clone()));
        }
    }
    refs
}

fn member_refs(member: &Member, owner: &Fqn) -> Vec<RefKey> {
    let mut refs = Vec::new();
    match member {
        Member::Field(field) => {
            for ann in &field.annotations {
                if let Resolution::Resolved(sym) = &ann.ty.resolution {
                    refs.push(RefKey::Type(sym.fqn.clone()));
                }
            }
            collect_type(&field.ty, &mut refs);
            if let Some(init) = &field.init {
                collect_expr(init, owner, &mut refs);
            }
        }
        Member::Method(method) => {
            for ann in &method.annotations {
                if let Resolution::Resolved(sym) = &ann.ty.resolution {
                    refs.push(RefKey::Type(sym.fqn.clone()));
                }
            }
            collect_type(&method.return_type, &mut refs);
            for param in &method.params {
                collect_type(&param.ty, &mut refs);
            }
            for thrown in &method.throws {
                collect_type(thrown, &mut refs);
            }
            for tp in &method.type_params {
                for bound in &tp.bounds {
                    collect_type(bound, &mut refs);
                }
            }
            if let Some(body) = &method.body {
                collect_block(body, owner, &mut refs);
            }
        }
        Member::Constructor(ctor) => {
            for param in &ctor.params {
                collect_type(&param.ty, &mut refs);
            }
            for thrown in &ctor.throws {
                collect_type(thrown, &mut refs);
            }
            collect_block(&ctor.body, owner, &mut refs);
        }
        Member::Initializer(init) => collect_block(&init.body, owner, &mut refs),
        Member::Type(_) => {
            // Nested type shells enqueue through their own id.
        }
    }
    refs
}

fn collect_type(ty: &TypeRef, out: &mut Vec<RefKey>) {
    match ty {
        TypeRef::Named(named) => {
            if let Resolution::Resolved(sym) = &named.resolution {
                if matches!(
                    sym.kind,
                    SymbolKind::Class
                        | SymbolKind::Interface
                        | SymbolKind::Annotation
                        | SymbolKind::Enum
                ) {
                    out.push(RefKey::Type(sym.fqn.clone()));
                }
            }
            for arg in &named.args {
                collect_type(arg, out);
            }
        }
        TypeRef::Array { component, .. } => collect_type(component, out),
        TypeRef::Wildcard {
            bound: Some((_, bound)),
            ..
        } => collect_type(bound, out),
        _ => {}
    }
}

fn collect_block(block: &Block, owner: &Fqn, out: &mut Vec<RefKey>) {
    for stmt in &block.statements {
        collect_stmt(stmt, owner, out);
    }
}

fn collect_stmt(stmt: &Stmt, owner: &Fqn, out: &mut Vec<RefKey>) {
    match stmt {
        Stmt::Block(block) => collect_block(block, owner, out),
        Stmt::Local(local) => {
            collect_type(&local.ty, out);
            if let Some(init) = &local.init {
                collect_expr(init, owner, out);
            }
        }
        Stmt::Expr(expr) => collect_expr(expr, owner, out),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                collect_expr(value, owner, out);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            collect_expr(cond, owner, out);
            collect_stmt(then_branch, owner, out);
            if let Some(else_branch) = else_branch {
                collect_stmt(else_branch, owner, out);
            }
        }
        Stmt::While { cond, body, .. } => {
            collect_expr(cond, owner, out);
            collect_stmt(body, owner, out);
        }
        Stmt::Throw { value, .. } => collect_expr(value, owner, out),
        Stmt::Empty(_) => {}
    }
}

fn collect_expr(expr: &Expr, owner: &Fqn, out: &mut Vec<RefKey>) {
    match expr {
        Expr::Literal(_) | Expr::This { .. } | Expr::SuperRef { .. } => {}
        Expr::Name(name) => {
            match &name.resolution {
                Resolution::Resolved(sym) if sym.kind == SymbolKind::Local => {
                    // Locals and same-scope fields: keep a same-named field
                    // on the enclosing chain if one exists.
                    out.push(RefKey::Field {
                        owner: owner.clone(),
                        name: name.name.clone(),
                    });
                    for enclosing in owner.nesting_chain() {
                        out.push(RefKey::Field {
                            owner: enclosing,
                            name: name.name.clone(),
                        });
                    }
                }
                Resolution::Resolved(sym) => {
                    out.push(RefKey::Type(sym.fqn.clone()));
                }
                _ => {}
            }
        }
        Expr::FieldAccess {
            receiver,
            name,
            resolution,
            ..
        } => {
            match resolution {
                Resolution::Resolved(sym) if sym.kind == SymbolKind::Field => {
                    out.push(RefKey::Field {
                        owner: sym.fqn.clone(),
                        name: name.clone(),
                    });
                    collect_expr(receiver, owner, out);
                }
                Resolution::Resolved(sym) => {
                    // Type qualifier.
                    out.push(RefKey::Type(sym.fqn.clone()));
                }
                _ => collect_expr(receiver, owner, out),
            }
        }
        Expr::MethodCall {
            receiver,
            type_args,
            name,
            args,
            resolution,
            ..
        } => {
            if let Resolution::Resolved(sym) = resolution {
                if sym.kind == SymbolKind::Method && name != "this" && name != "super" {
                    out.push(RefKey::Method {
                        owner: sym.fqn.clone(),
                        name: name.clone(),
                        arity: args.len(),
                    });
                }
            }
            if let Some(receiver) = receiver {
                collect_expr(receiver, owner, out);
            }
            for arg in type_args {
                collect_type(arg, out);
            }
            for arg in args {
                collect_expr(arg, owner, out);
            }
        }
        Expr::New {
            ty,
            args,
            resolution,
            ..
        } => {
            collect_type(ty, out);
            if let Resolution::Resolved(sym) = resolution {
                out.push(RefKey::Ctor {
                    owner: sym.fqn.clone(),
                    arity: args.len(),
                });
            }
            for arg in args {
                collect_expr(arg, owner, out);
            }
        }
        Expr::NewArray {
            element,
            dims,
            initializer,
            ..
        } => {
            collect_type(element, out);
            for dim in dims.iter().flatten() {
                collect_expr(dim, owner, out);
            }
            for value in initializer.iter().flatten() {
                collect_expr(value, owner, out);
            }
        }
        Expr::Cast { ty, value, .. } => {
            collect_type(ty, out);
            collect_expr(value, owner, out);
        }
        Expr::InstanceOf { value, ty, .. } => {
            collect_expr(value, owner, out);
            collect_type(ty, out);
        }
        Expr::Lambda { params, body, .. } => {
            for param in params {
                if let Some(ty) = &param.ty {
                    collect_type(ty, out);
                }
            }
            match body {
                LambdaBody::Expr(value) => collect_expr(value, owner, out),
                LambdaBody::Block(block) => collect_block(block, owner, out),
            }
        }
        Expr::MethodRef { target, .. } => match target {
            MethodRefTarget::Expr(value) => collect_expr(value, owner, out),
            MethodRefTarget::Type(ty) => collect_type(ty, out),
        },
        Expr::Assign { lhs, rhs, .. } => {
            collect_expr(lhs, owner, out);
            collect_expr(rhs, owner, out);
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_expr(lhs, owner, out);
            collect_expr(rhs, owner, out);
        }
        Expr::Unary { value, .. } | Expr::Paren { value, .. } => collect_expr(value, owner, out),
        Expr::Conditional {
            cond,
            then_value,
            else_value,
            ..
        } => {
            collect_expr(cond, owner, out);
            collect_expr(then_value, owner, out);
            collect_expr(else_value, owner, out);
        }
        Expr::ArrayIndex { array, index, .. } => {
            collect_expr(array, owner, out);
            collect_expr(index, owner, out);
        }
        Expr::ClassLiteral { ty, .. } => collect_type(ty, out),
        Expr::ArrayInit { values, .. } => {
            for value in values {
                collect_expr(value, owner, out);
            }
        }
    }
}
