use jess_ast::{render_type_ref, CompilationUnit, TypeDecl, TypeKind, TypeRef};
use jess_core::{FileId, Fqn};
use jess_resolve::{CachingOracle, JdkOracle, ParseOracle, Resolver, ResolverConfig, SourceRootIndex};
use jess_slice::{compute_keep_set, slice, KeepRules, SliceConfig};
use jess_stub::{apply_plans, collect_plans, reconcile, StubbedModel, StubberOptions};
use std::path::Path;

struct SyntaxParser;

impl ParseOracle for SyntaxParser {
    fn parse(
        &self,
        text: &str,
        file: FileId,
        path: &Path,
    ) -> Result<CompilationUnit, String> {
        jess_syntax::parse_compilation_unit(text, file, path).map_err(|err| err.to_string())
    }
}

/// Parse → resolve → whole-class slice → collect → stub → reconcile.
fn run(source: &str) -> StubbedModel {
    run_with_options(source, &StubberOptions::default())
}

fn run_with_options(source: &str, options: &StubberOptions) -> StubbedModel {
    let unit =
        jess_syntax::parse_compilation_unit(source, FileId::from_raw(0), Path::new("Test.java"))
            .expect("parse");
    let cache = CachingOracle::new(JdkOracle);
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    let outcome = resolver
        .resolve(unit, &SourceRootIndex::default(), &SyntaxParser)
        .expect("resolve");
    let rules = KeepRules::default();
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig::default(),
    );
    let plans = collect_plans(&sliced, &cache);
    let mut model = apply_plans(&plans, sliced);
    reconcile(&mut model, options);
    model
}

fn find_type<'m>(model: &'m StubbedModel, fqn: &str) -> Option<(Fqn, &'m TypeDecl)> {
    let fqn = Fqn::new(fqn);
    model.all_types().into_iter().find(|(f, _)| *f == fqn)
}

#[test]
fn unresolved_field_type_becomes_a_class_stub() {
    let model = run(
        r#"
package p;

class C {
    Widget w;
}
"#,
    );
    let (_, widget) = find_type(&model, "p.Widget").expect("stub created");
    assert_eq!(widget.kind, TypeKind::Class);
    assert!(widget.modifiers.contains(jess_ast::Modifiers::PUBLIC));
}

#[test]
fn generic_bridge_scenario() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        Box<String> b = new S();
        b.get();
    }
}
"#,
    );

    let (_, box_decl) = find_type(&model, "p.Box").expect("Box created");
    assert_eq!(box_decl.kind, TypeKind::Interface);
    assert_eq!(box_decl.type_params.len(), 1);
    assert_eq!(box_decl.type_params[0].name, "T");
    let get = box_decl.methods().find(|m| m.name == "get").expect("get");
    assert_eq!(render_type_ref(&get.return_type), "T");
    assert!(get.body.is_none());

    let (_, s_decl) = find_type(&model, "p.S").expect("S created");
    assert_eq!(s_decl.kind, TypeKind::Class);
    let implemented: Vec<String> = s_decl.interfaces.iter().map(render_type_ref).collect();
    assert!(implemented.iter().any(|iface| iface.contains("Box")));
    // Auto-implemented with the actual type argument substituted in.
    let s_get = s_decl.methods().find(|m| m.name == "get").expect("S.get");
    assert_eq!(render_type_ref(&s_get.return_type), "String");
    assert!(s_get.body.is_some());
}

#[test]
fn array_constructor_reference_scenario() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        ArrMaker<String> maker = String[]::new;
    }
}
"#,
    );
    let (_, arr_maker) = find_type(&model, "p.ArrMaker").expect("ArrMaker created");
    assert_eq!(arr_maker.kind, TypeKind::Interface);
    assert!(arr_maker.functional);
    assert_eq!(arr_maker.type_params.len(), 1);

    let sams: Vec<_> = arr_maker.abstract_methods().collect();
    assert_eq!(sams.len(), 1);
    let sam = sams[0];
    assert_eq!(sam.name, "make");
    assert_eq!(sam.params.len(), 1);
    assert_eq!(render_type_ref(&sam.params[0].ty), "int");
    assert_eq!(render_type_ref(&sam.return_type), "T");
}

#[test]
fn repeatable_annotation_scenario() {
    let model = run(
        r#"
package p;

@Tag("x")
@Tag("y")
class C {
}
"#,
    );
    let (_, tag) = find_type(&model, "p.Tag").expect("Tag created");
    assert_eq!(tag.kind, TypeKind::Annotation);
    let repeatable = tag
        .annotations
        .iter()
        .find(|ann| ann.ty.name.ends_with("Repeatable"))
        .expect("@Repeatable wired");
    assert_eq!(repeatable.ty.name, "java.lang.annotation.Repeatable");

    let (_, tags) = find_type(&model, "p.Tags").expect("Tags container created");
    assert_eq!(tags.kind, TypeKind::Annotation);
    let value = tags.methods().find(|m| m.name == "value").expect("value()");
    assert_eq!(render_type_ref(&value.return_type), "p.Tag[]");
}

#[test]
fn repeatable_heuristic_can_be_disabled() {
    let model = run_with_options(
        r#"
package p;

@Tag("x")
@Tag("y")
class C {
}
"#,
        &StubberOptions {
            repeatable_container_heuristic: false,
            builder_completion: true,
        },
    );
    assert!(find_type(&model, "p.Tags").is_none());
}

#[test]
fn interface_super_scenario() {
    let model = run(
        r#"
package p;

interface B extends A {
    default String call() {
        return A.super.m();
    }
}
"#,
    );
    let (_, a_decl) = find_type(&model, "p.A").expect("A created");
    assert_eq!(a_decl.kind, TypeKind::Interface);
    let m = a_decl.methods().find(|m| m.name == "m").expect("A.m");
    assert!(m.modifiers.is_default());
    assert!(m.body.is_some(), "default methods need bodies");
}

#[test]
fn unknown_fallback_scenario() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        obj.bar(42);
    }
}
"#,
    );
    // The receiver's type was fabricated in the unknown namespace.
    let (_, obj) = find_type(&model, "unknown.Obj").expect("unknown.Obj created");
    assert_eq!(obj.kind, TypeKind::Class);
    let bar = obj.methods().find(|m| m.name == "bar").expect("bar");
    assert_eq!(bar.params.len(), 1);
    assert_eq!(render_type_ref(&bar.params[0].ty), "int");
    // The fallback return type.
    assert_eq!(render_type_ref(&bar.return_type), "Unknown");

    // The receiver itself became a field on the enclosing class.
    let (_, c_decl) = find_type(&model, "p.C").expect("C");
    let field = c_decl.fields().find(|f| f.name == "obj").expect("obj field");
    assert!(render_type_ref(&field.ty).contains("Obj"));

    // The universal placeholder exists.
    assert!(find_type(&model, "unknown.Unknown").is_some());
}

#[test]
fn enum_helper_calls_flip_kind_to_enum() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        Color[] all = Color.values();
        Color red = Color.valueOf("RED");
    }
}
"#,
    );
    let (_, color) = find_type(&model, "p.Color").expect("Color created");
    assert_eq!(color.kind, TypeKind::Enum);
    // Enum helpers are implicit; no methods were synthesised for them.
    assert!(color.methods().all(|m| m.name != "values" && m.name != "valueOf"));
}

#[test]
fn exception_name_heuristic_sets_supertypes() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        throw new ParseFailureException("boom");
    }

    void n() {
        throw new HardwareError();
    }
}
"#,
    );
    let (_, exc) = find_type(&model, "p.ParseFailureException").expect("exception stub");
    assert_eq!(
        exc.superclass.as_ref().map(render_type_ref),
        Some("java.lang.RuntimeException".to_string())
    );
    let (_, err) = find_type(&model, "p.HardwareError").expect("error stub");
    assert_eq!(
        err.superclass.as_ref().map(render_type_ref),
        Some("java.lang.Error".to_string())
    );
}

#[test]
fn builder_pattern_completion() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        Thing.Builder b = Thing.builder();
        b.withName("x");
    }
}
"#,
    );
    let (_, thing) = find_type(&model, "p.Thing").expect("Thing created");
    assert!(thing.methods().any(|m| m.name == "builder"));
    let (_, builder) = find_type(&model, "p.Thing$Builder").expect("nested Builder");
    assert!(builder.modifiers.is_static());
    let get = builder.methods().find(|m| m.name == "get").expect("get()");
    assert!(render_type_ref(&get.return_type).contains("Thing"));
    let with_name = builder
        .methods()
        .find(|m| m.name == "withName")
        .expect("withName");
    assert!(render_type_ref(&with_name.return_type).contains("Builder"));
}

#[test]
fn builder_completion_targets_the_type_the_call_site_uses() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        Builder b = Thing.builder();
        b.withName("x");
    }
}
"#,
    );
    // The unqualified idiom resolves the local's type flat; the completion
    // lands there, not on a manufactured nested type.
    let (_, builder) = find_type(&model, "p.Builder").expect("flat Builder");
    let get = builder.methods().find(|m| m.name == "get").expect("get()");
    assert!(render_type_ref(&get.return_type).contains("Thing"));
    let with_name = builder
        .methods()
        .find(|m| m.name == "withName")
        .expect("withName");
    assert!(render_type_ref(&with_name.return_type).contains("Builder"));
    assert!(find_type(&model, "p.Thing$Builder").is_none());

    // `builder()` still returns the type the call site uses.
    let (_, thing) = find_type(&model, "p.Thing").expect("Thing");
    let builder_method = thing.methods().find(|m| m.name == "builder").expect("builder()");
    assert_eq!(render_type_ref(&builder_method.return_type), "p.Builder");
}

#[test]
fn invariants_hold_on_a_mixed_fixture() {
    let model = run(
        r#"
package p;

import com.lib.Widget;

class C {
    Widget w;
    Pair<String, Integer> pair;

    void m() {
        obj.bar(42);
        Runner r = () -> tick();
        w.spin(1);
    }

    void tick() {}
}
"#,
    );

    let all = model.all_types();

    // No emitted type is rooted in a JDK package or named like a primitive.
    for (fqn, _) in &all {
        assert!(!fqn.is_jdk(), "JDK-rooted type emitted: {fqn}");
        assert!(
            jess_ast::PrimitiveKind::from_keyword(fqn.simple_name()).is_none(),
            "primitive-named type emitted: {fqn}"
        );
    }

    // unknown.X and concrete pkg.X are disjoint by simple name.
    let unknown_simple: Vec<&str> = all
        .iter()
        .filter(|(fqn, _)| fqn.is_unknown_package())
        .map(|(fqn, _)| fqn.simple_name())
        .filter(|simple| *simple != "Unknown")
        .collect();
    for simple in &unknown_simple {
        assert!(
            !all.iter().any(|(fqn, _)| !fqn.is_unknown_package()
                && fqn.simple_name() == *simple),
            "unknown.{simple} coexists with a concrete {simple}"
        );
    }

    // Declared type-parameter count covers every observed argument count.
    let (_, pair) = all
        .iter()
        .find(|(fqn, _)| fqn.as_str() == "p.Pair")
        .expect("Pair created");
    assert!(pair.type_params.len() >= 2);

    // Functional interfaces have exactly one abstract method.
    for (fqn, decl) in &all {
        if decl.functional && decl.kind == TypeKind::Interface {
            assert_eq!(
                decl.abstract_methods().count(),
                1,
                "functional interface {fqn} must have exactly one SAM"
            );
        }
    }

    // No type is its own transitive supertype.
    for (fqn, decl) in &all {
        let mut current: Vec<String> = decl
            .superclass
            .iter()
            .chain(decl.interfaces.iter())
            .map(|ty| match ty {
                TypeRef::Named(named) => named.denoted_fqn().as_str().to_string(),
                other => render_type_ref(other),
            })
            .collect();
        for _ in 0..16 {
            if current.iter().any(|s| s == fqn.as_str()) {
                panic!("{fqn} is its own transitive supertype");
            }
            let mut next = Vec::new();
            for super_name in &current {
                if let Some((_, super_decl)) = all
                    .iter()
                    .find(|(f, _)| f.as_str() == super_name.as_str())
                {
                    next.extend(
                        super_decl
                            .superclass
                            .iter()
                            .chain(super_decl.interfaces.iter())
                            .map(render_type_ref),
                    );
                }
            }
            if next.is_empty() {
                break;
            }
            current = next;
        }
    }
}

#[test]
fn members_land_on_sliced_types_too() {
    let model = run(
        r#"
package p;

class C {
    void m() {
        missingSibling(7);
    }
}
"#,
    );
    let (_, c_decl) = find_type(&model, "p.C").expect("C");
    let stubbed = c_decl
        .methods()
        .find(|m| m.name == "missingSibling")
        .expect("missing sibling stubbed onto the sliced class");
    assert_eq!(stubbed.params.len(), 1);
    assert!(stubbed.body.is_some());
}

#[test]
fn mirror_methods_cover_unknown_and_concrete_owners() {
    let model = run(
        r#"
package p;

class C {
    Helper helper;

    void m() {
        helper.go();
        other.go();
    }
}
"#,
    );
    // `helper` has a planned concrete type; `other` fabricates unknown.Other.
    let (_, helper) = find_type(&model, "p.Helper").expect("Helper");
    assert!(helper.methods().any(|m| m.name == "go"));
    let (_, other) = find_type(&model, "unknown.Other").expect("unknown.Other");
    assert!(other.methods().any(|m| m.name == "go"));
}

#[test]
fn unknown_references_rebind_to_a_unique_concrete_type() {
    let model = run(
        r#"
package p;

import com.lib.Item;

class C {
    Item kept;

    void m() {
        item.go();
    }
}
"#,
    );
    // The placeholder type was shadowed by the concrete `com.lib.Item` and
    // never created.
    assert!(find_type(&model, "unknown.Item").is_none());

    // The fabricated receiver field rebound to the unique concrete type.
    let (_, c_decl) = find_type(&model, "p.C").expect("C");
    let field = c_decl.fields().find(|f| f.name == "item").expect("item field");
    assert_eq!(render_type_ref(&field.ty), "com.lib.Item");

    // The mirrored call landed on the concrete owner.
    let (_, item) = find_type(&model, "com.lib.Item").expect("Item");
    assert!(item.methods().any(|m| m.name == "go"));
}

#[test]
fn get_class_is_never_stubbed() {
    let model = run(
        r#"
package p;

class C {
    Widget w;

    void m() {
        w.getClass();
    }
}
"#,
    );
    let (_, widget) = find_type(&model, "p.Widget").expect("Widget");
    assert!(widget.methods().all(|m| m.name != "getClass"));
}
