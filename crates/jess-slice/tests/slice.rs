use jess_ast::{CompilationUnit, Member, Stmt};
use jess_core::FileId;
use jess_resolve::{CachingOracle, JdkOracle, ParseOracle, Resolver, ResolverConfig, SourceRootIndex};
use jess_slice::{compute_keep_set, slice, KeepRules, MethodPattern, SliceConfig};
use pretty_assertions::assert_eq;
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

fn resolve(source: &str) -> jess_resolve::ResolveOutcome {
    let unit =
        jess_syntax::parse_compilation_unit(source, FileId::from_raw(0), Path::new("Test.java"))
            .expect("parse");
    let cache = CachingOracle::new(JdkOracle);
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    resolver
        .resolve(unit, &SourceRootIndex::default(), &SyntaxParser)
        .expect("resolve")
}

fn resolve_with_sources(source: &str, files: &[(&str, &str)]) -> jess_resolve::ResolveOutcome {
    let dir = tempfile::tempdir().unwrap();
    for (rel, text) in files {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }
    let unit =
        jess_syntax::parse_compilation_unit(source, FileId::from_raw(0), Path::new("Test.java"))
            .expect("parse");
    let cache = CachingOracle::new(JdkOracle);
    let resolver = Resolver::new(&cache, ResolverConfig::default());
    let sources = SourceRootIndex::scan(&[dir.path().to_path_buf()]);
    resolver
        .resolve(unit, &sources, &SyntaxParser)
        .expect("resolve")
}

#[test]
fn keeps_only_matching_method_and_its_dependencies() {
    let outcome = resolve(
        r#"
package p;

class C {
    int used = 1;
    int untouched = 2;

    int foo(int a, String[] rest) {
        return helper() + used;
    }

    int helper() {
        return 0;
    }

    void unrelated() {
        untouched = 3;
    }
}
"#,
    );
    let rules = KeepRules {
        patterns: vec![MethodPattern::with_params(
            "foo",
            vec!["int".to_string(), "java.lang.String[]".to_string()],
        )],
        ..Default::default()
    };
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig::default(),
    );

    let names: Vec<&str> = sliced.root.types[0]
        .members
        .iter()
        .map(|member| match member {
            Member::Field(f) => f.name.as_str(),
            Member::Method(m) => m.name.as_str(),
            other => panic!("unexpected member {other:?}"),
        })
        .collect();
    assert_eq!(names, vec!["used", "foo", "helper"]);

    // The kept target retains its real body.
    let foo = sliced.root.types[0].methods().find(|m| m.name == "foo").unwrap();
    let body = foo.body.as_ref().unwrap();
    assert!(matches!(body.statements[0], Stmt::Return { .. }));
}

#[test]
fn empty_pattern_list_keeps_every_member() {
    let outcome = resolve(
        r#"
package p;

class C {
    int a;

    void m() {}

    void n() {}
}
"#,
    );
    let rules = KeepRules::default();
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig::default(),
    );
    assert_eq!(sliced.root.types[0].members.len(), 3);
}

#[test]
fn loose_matching_falls_back_to_name_and_arity() {
    let outcome = resolve(
        r#"
package p;

class C {
    void foo(Widget w) {}

    void foo() {}
}
"#,
    );
    let rules = KeepRules {
        patterns: vec![MethodPattern::with_params(
            "foo",
            vec!["com.other.Widget".to_string()],
        )],
        ..Default::default()
    };
    // Strict: the declared `p.Widget` parameter unifies by simple name.
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    assert!(keep.contains(outcome.root.types[0].methods().next().unwrap().id));

    let keep_loose = compute_keep_set(&outcome.root, &outcome.foreign, &rules, true);
    assert!(keep_loose.contains(outcome.root.types[0].methods().next().unwrap().id));
}

#[test]
fn foreign_bodies_are_gutted_to_default_returns() {
    let outcome = resolve_with_sources(
        r#"
package p;

class C {
    int m() {
        Helper h = new Helper();
        return h.count();
    }
}
"#,
        &[(
            "p/Helper.java",
            r#"
package p;

class Helper {
    Helper() {
        System.out.println("side effect");
    }

    int count() {
        return compute();
    }

    int compute() {
        return 42;
    }

    boolean flag() {
        return true;
    }
}
"#,
        )],
    );
    let rules = KeepRules {
        patterns: vec![MethodPattern::named("m")],
        ..Default::default()
    };
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig::default(),
    );

    let helper = sliced
        .fragments
        .get(&jess_core::Fqn::new("p.Helper"))
        .expect("helper fragment");
    let count = helper.types[0].methods().find(|m| m.name == "count").unwrap();
    let body = count.body.as_ref().unwrap();
    assert_eq!(body.statements.len(), 1);
    match &body.statements[0] {
        Stmt::Return { value: Some(value), .. } => {
            assert_eq!(format!("{}", print_expr(value)), "0");
        }
        other => panic!("expected default return, got {other:?}"),
    }

    // The constructor body was emptied, and the unreferenced method is gone.
    let ctor = helper.types[0]
        .members
        .iter()
        .find_map(|member| match member {
            Member::Constructor(ctor) => Some(ctor),
            _ => None,
        })
        .expect("constructor kept");
    assert!(ctor.body.statements.is_empty());
    assert!(helper.types[0].methods().all(|m| m.name != "flag"));
}

#[test]
fn unused_imports_are_stripped() {
    let outcome = resolve(
        r#"
package p;

import java.util.List;
import java.util.Map;
import java.util.*;

class C {
    List<String> names() {
        return null;
    }

    Map<String, String> unusedAfterSlicing() {
        return null;
    }
}
"#,
    );
    let rules = KeepRules {
        patterns: vec![MethodPattern::named("names")],
        ..Default::default()
    };
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig::default(),
    );
    let imports: Vec<&str> = sliced
        .root
        .imports
        .iter()
        .map(|import| import.path.as_str())
        .collect();
    assert_eq!(imports, vec!["java.util.List"]);
}

#[test]
fn asterisk_imports_respect_configuration() {
    let outcome = resolve(
        r#"
package p;

import java.util.*;

class C {
    void m() {}
}
"#,
    );
    let rules = KeepRules::default();
    let keep = compute_keep_set(&outcome.root, &outcome.foreign, &rules, false);
    let sliced = slice(
        outcome.root,
        outcome.foreign,
        &keep,
        &rules,
        &SliceConfig {
            keep_asterisk_imports: true,
        },
    );
    assert_eq!(sliced.root.imports.len(), 1);
}

fn print_expr(expr: &jess_ast::Expr) -> String {
    match expr {
        jess_ast::Expr::Literal(lit) => lit.text.clone(),
        other => format!("{other:?}"),
    }
}
