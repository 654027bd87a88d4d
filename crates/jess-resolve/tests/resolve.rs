use jess_ast::{CompilationUnit, Expr, Stmt, SymbolKind, UnresolvedKind};
use jess_core::{FileId, Fqn};
use jess_resolve::{
    CachingOracle, CtorSig, FieldSig, JdkOracle, MethodSig, ParseOracle, ResolutionOracle,
    Resolver, ResolverConfig, SourceRootIndex, TypeEntry,
};
use std::collections::HashMap;
use std::path::Path;

#[derive(Default)]
struct TestOracle {
    types: HashMap<String, SymbolKind>,
    methods: HashMap<(String, String), Vec<MethodSig>>,
    fields: HashMap<(String, String), FieldSig>,
    ctors: HashMap<String, Vec<CtorSig>>,
}

impl TestOracle {
    fn add_type(&mut self, fqn: &str, kind: SymbolKind) -> &mut Self {
        self.types.insert(fqn.to_string(), kind);
        self
    }

    fn add_method(&mut self, owner: &str, name: &str, params: &[&str], ret: &str) -> &mut Self {
        self.methods
            .entry((owner.to_string(), name.to_string()))
            .or_default()
            .push(MethodSig {
                name: name.to_string(),
                params: params.iter().map(|p| p.to_string()).collect(),
                return_type: ret.to_string(),
                is_static: false,
            });
        self
    }
}

impl ResolutionOracle for TestOracle {
    fn lookup_type(&self, fqn: &Fqn) -> Option<TypeEntry> {
        self.types.get(fqn.as_str()).map(|kind| TypeEntry {
            fqn: fqn.clone(),
            kind: *kind,
        })
    }

    fn lookup_methods(&self, owner: &Fqn, name: &str) -> Vec<MethodSig> {
        self.methods
            .get(&(owner.as_str().to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn lookup_field(&self, owner: &Fqn, name: &str) -> Option<FieldSig> {
        self.fields
            .get(&(owner.as_str().to_string(), name.to_string()))
            .cloned()
    }

    fn lookup_ctors(&self, owner: &Fqn) -> Vec<CtorSig> {
        self.ctors.get(owner.as_str()).cloned().unwrap_or_default()
    }
}

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

fn parse(source: &str) -> CompilationUnit {
    jess_syntax::parse_compilation_unit(source, FileId::from_raw(0), Path::new("Test.java"))
        .expect("parse")
}

fn resolve_with(
    oracle: TestOracle,
    source: &str,
) -> jess_resolve::Result<jess_resolve::ResolveOutcome> {
    let cache = CachingOracle::new(oracle);
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    resolver.resolve(parse(source), &SourceRootIndex::default(), &SyntaxParser)
}

fn method_body(unit: &CompilationUnit, name: &str) -> Vec<Stmt> {
    unit.types[0]
        .methods()
        .find(|m| m.name == name)
        .and_then(|m| m.body.clone())
        .map(|b| b.statements)
        .expect("method body")
}

#[test]
fn unresolved_field_type_is_tagged() {
    let outcome = resolve_with(
        TestOracle::default(),
        r#"
package p;

class C {
    Widget w;
}
"#,
    )
    .unwrap();
    let field = outcome.root.types[0].fields().next().expect("field");
    let named = field.ty.as_named().expect("named");
    assert!(named.resolution.is_unresolved());
}

#[test]
fn import_pins_package_for_unknown_type() {
    let outcome = resolve_with(
        TestOracle::default(),
        r#"
package p;

import com.lib.Widget;

class C {
    Widget w;
}
"#,
    )
    .unwrap();
    let field = outcome.root.types[0].fields().next().expect("field");
    let named = field.ty.as_named().expect("named");
    assert!(named.resolution.is_unresolved());
    // The written name was qualified so downstream stages plan the stub in
    // the imported package.
    assert_eq!(named.name, "com.lib.Widget");
}

#[test]
fn known_classpath_type_resolves() {
    let mut oracle = TestOracle::default();
    oracle.add_type("com.lib.Widget", SymbolKind::Class);
    let outcome = resolve_with(
        oracle,
        r#"
package p;

import com.lib.Widget;

class C {
    Widget w;
}
"#,
    )
    .unwrap();
    let field = outcome.root.types[0].fields().next().expect("field");
    let named = field.ty.as_named().expect("named");
    let sym = named.resolution.symbol().expect("resolved");
    assert_eq!(sym.fqn.as_str(), "com.lib.Widget");
    assert_eq!(sym.kind, SymbolKind::Class);
}

#[test]
fn jdk_oracle_resolves_string_but_not_custom_names() {
    let cache = CachingOracle::new(JdkOracle);
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    let outcome = resolver
        .resolve(
            parse(
                r#"
package p;

class C {
    String s;
    Widget w;
}
"#,
            ),
            &SourceRootIndex::default(),
            &SyntaxParser,
        )
        .unwrap();
    let fields: Vec<_> = outcome.root.types[0].fields().collect();
    let string_ty = fields[0].ty.as_named().unwrap();
    assert_eq!(
        string_ty.resolution.symbol().unwrap().fqn.as_str(),
        "java.lang.String"
    );
    assert!(fields[1].ty.as_named().unwrap().resolution.is_unresolved());
}

#[test]
fn call_on_unresolved_receiver_type_records_owner() {
    let outcome = resolve_with(
        TestOracle::default(),
        r#"
package p;

class C {
    void m(Widget w) {
        w.spin(1);
    }
}
"#,
    )
    .unwrap();
    let body = method_body(&outcome.root, "m");
    match &body[0] {
        Stmt::Expr(Expr::MethodCall { resolution, .. }) => {
            let unresolved = resolution.as_unresolved().expect("unresolved");
            assert_eq!(unresolved.kind, UnresolvedKind::Method);
            assert_eq!(
                unresolved.owner.as_ref().map(|f| f.as_str()),
                Some("p.Widget")
            );
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn call_resolved_through_oracle_signature() {
    let mut oracle = TestOracle::default();
    oracle
        .add_type("p.Widget", SymbolKind::Class)
        .add_method("p.Widget", "spin", &["int"], "void");
    let outcome = resolve_with(
        oracle,
        r#"
package p;

class C {
    void m(Widget w) {
        w.spin(1);
    }
}
"#,
    )
    .unwrap();
    let body = method_body(&outcome.root, "m");
    match &body[0] {
        Stmt::Expr(Expr::MethodCall { resolution, .. }) => {
            let sym = resolution.symbol().expect("resolved");
            assert_eq!(sym.fqn.as_str(), "p.Widget");
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn unqualified_call_to_sibling_method_resolves() {
    let outcome = resolve_with(
        TestOracle::default(),
        r#"
package p;

class C {
    void m() {
        helper(1);
    }

    void helper(int x) {}
}
"#,
    )
    .unwrap();
    let body = method_body(&outcome.root, "m");
    match &body[0] {
        Stmt::Expr(Expr::MethodCall { resolution, .. }) => {
            assert_eq!(resolution.symbol().expect("resolved").fqn.as_str(), "p.C");
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn ambiguous_overloads_fail_when_requested() {
    let mut oracle = TestOracle::default();
    oracle
        .add_type("p.Widget", SymbolKind::Class)
        .add_method("p.Widget", "spin", &["int"], "void")
        .add_method("p.Widget", "spin", &["long"], "void");
    let cache = CachingOracle::new(oracle);
    let resolver = Resolver::new(
        &cache,
        ResolverConfig {
            fail_on_ambiguity: true,
            loose_signature_matching: false,
        },
    );
    let err = resolver.resolve(
        parse(
            r#"
package p;

class C {
    void m(Widget w) {
        w.spin(1);
    }
}
"#,
        ),
        &SourceRootIndex::default(),
        &SyntaxParser,
    );
    assert!(matches!(
        err,
        Err(jess_resolve::ResolveError::Ambiguity { .. })
    ));
}

#[test]
fn foreign_units_are_discovered_transitively() {
    let dir = tempfile::tempdir().unwrap();
    let pkg = dir.path().join("p");
    std::fs::create_dir_all(&pkg).unwrap();
    std::fs::write(
        pkg.join("Helper.java"),
        "package p;\n\nclass Helper {\n    Deep d;\n}\n",
    )
    .unwrap();
    std::fs::write(pkg.join("Deep.java"), "package p;\n\nclass Deep {\n}\n").unwrap();

    let cache = CachingOracle::new(TestOracle::default());
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    let sources = SourceRootIndex::scan(&[dir.path().to_path_buf()]);
    let outcome = resolver
        .resolve(
            parse(
                r#"
package p;

class C {
    Helper h;
}
"#,
            ),
            &sources,
            &SyntaxParser,
        )
        .unwrap();

    assert_eq!(outcome.foreign.len(), 2);
    assert!(outcome.foreign.contains_key(&Fqn::new("p.Helper")));
    assert!(outcome.foreign.contains_key(&Fqn::new("p.Deep")));

    // The reference to the source-declared type is resolved, not a stub
    // candidate.
    let field = outcome.root.types[0].fields().next().expect("field");
    let sym = field.ty.as_named().unwrap().resolution.symbol().expect("resolved");
    assert_eq!(sym.fqn.as_str(), "p.Helper");
}

#[test]
fn local_variable_shadows_field_for_receiver_typing() {
    let mut oracle = TestOracle::default();
    oracle
        .add_type("p.A", SymbolKind::Class)
        .add_type("p.B", SymbolKind::Class)
        .add_method("p.B", "go", &[], "void");
    let outcome = resolve_with(
        oracle,
        r#"
package p;

class C {
    A x;

    void m() {
        B x = null;
        x.go();
    }
}
"#,
    )
    .unwrap();
    let body = method_body(&outcome.root, "m");
    match &body[1] {
        Stmt::Expr(Expr::MethodCall { resolution, .. }) => {
            assert_eq!(resolution.symbol().expect("resolved").fqn.as_str(), "p.B");
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn qualifier_chains_are_not_field_reads() {
    let mut oracle = TestOracle::default();
    oracle.add_type("com.lib.Widget", SymbolKind::Class);
    let outcome = resolve_with(
        oracle,
        r#"
package p;

class C {
    void m() {
        com.lib.Widget.create();
    }
}
"#,
    )
    .unwrap();
    let body = method_body(&outcome.root, "m");
    match &body[0] {
        Stmt::Expr(Expr::MethodCall {
            receiver: Some(receiver),
            resolution,
            ..
        }) => {
            // The dotted receiver resolved to the type itself.
            match receiver.as_ref() {
                Expr::FieldAccess { resolution, .. } => {
                    let sym = resolution.symbol().expect("type qualifier");
                    assert_eq!(sym.fqn.as_str(), "com.lib.Widget");
                }
                other => panic!("expected qualifier, got {other:?}"),
            }
            // `create` itself is unknown to the oracle.
            let unresolved = resolution.as_unresolved().expect("unresolved");
            assert_eq!(
                unresolved.owner.as_ref().map(|f| f.as_str()),
                Some("com.lib.Widget")
            );
            assert!(unresolved.static_ctx);
        }
        other => panic!("expected call, got {other:?}"),
    }
}
