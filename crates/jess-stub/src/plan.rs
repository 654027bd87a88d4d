//! The stub-plan model: five tagged variants in an append-only set.

use jess_ast::{TypeKind, TypeRef};
use jess_core::Fqn;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct TypeStubPlan {
    pub fqn: Fqn,
    pub kind: TypeKind,
    /// A nested type that needs an enclosing instance (`Outer.new Inner()`
    /// style usage); stubbed non-static.
    pub non_static_inner: bool,
    /// The owner was the target of a lambda or method reference; it becomes
    /// a functional interface.
    pub functional: bool,
}

impl TypeStubPlan {
    pub fn new(fqn: Fqn, kind: TypeKind) -> Self {
        Self {
            fqn,
            kind,
            non_static_inner: false,
            functional: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldStubPlan {
    pub owner: Fqn,
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
}

/// A planned synthetic method.
///
/// A plan whose `owner` lies in the placeholder `unknown` package is a
/// mirror plan: the stubber emits it on that owner and on every concrete
/// type sharing the simple name, so calls qualified either way compile.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodStubPlan {
    pub owner: Fqn,
    pub name: String,
    pub return_type: TypeRef,
    pub param_types: Vec<TypeRef>,
    pub throws: Vec<TypeRef>,
    pub is_static: bool,
    pub varargs: bool,
    /// Emit with a `default` body when the owner turns out to be an
    /// interface.
    pub default_on_interface: bool,
    /// This is a SAM induced by a lambda/method-reference; the owner is
    /// marked functional.
    pub functional_sam: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtorStubPlan {
    pub owner: Fqn,
    pub param_types: Vec<TypeRef>,
}

/// Interface edges to force onto a type (`ownerFqn implements interfaces`).
#[derive(Debug, Clone, PartialEq)]
pub struct ImplementsPlan {
    pub owner: Fqn,
    pub interfaces: Vec<TypeRef>,
}

/// One planned stub. The five variants form a closed tagged union;
/// downstream stages dispatch on the tag.
#[derive(Debug, Clone, PartialEq)]
pub enum StubPlan {
    Type(TypeStubPlan),
    Field(FieldStubPlan),
    Method(MethodStubPlan),
    Ctor(CtorStubPlan),
    Implements(ImplementsPlan),
}

/// The collector's output: plans in collection order (append-only) plus the
/// observed generic arities.
#[derive(Debug, Default)]
pub struct PlanSet {
    plans: Vec<StubPlan>,
    /// Per FQN, the maximum number of actual type arguments seen in any
    /// usage; becomes the declared type-parameter count.
    pub generic_arity: BTreeMap<Fqn, usize>,
}

impl PlanSet {
    pub fn push(&mut self, plan: StubPlan) {
        self.plans.push(plan);
    }

    pub fn note_generic_arity(&mut self, fqn: Fqn, args: usize) {
        let entry = self.generic_arity.entry(fqn).or_insert(0);
        if args > *entry {
            *entry = args;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StubPlan> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeStubPlan> {
        self.plans.iter().filter_map(|plan| match plan {
            StubPlan::Type(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldStubPlan> {
        self.plans.iter().filter_map(|plan| match plan {
            StubPlan::Field(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodStubPlan> {
        self.plans.iter().filter_map(|plan| match plan {
            StubPlan::Method(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn ctors(&self) -> impl Iterator<Item = &CtorStubPlan> {
        self.plans.iter().filter_map(|plan| match plan {
            StubPlan::Ctor(plan) => Some(plan),
            _ => None,
        })
    }

    pub fn implements(&self) -> impl Iterator<Item = &ImplementsPlan> {
        self.plans.iter().filter_map(|plan| match plan {
            StubPlan::Implements(plan) => Some(plan),
            _ => None,
        })
    }
}
