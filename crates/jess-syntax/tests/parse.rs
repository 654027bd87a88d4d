use jess_ast::{print_unit, Expr, LambdaBody, MethodRefTarget, Stmt, TypeKind, TypeRef};
use jess_core::FileId;
use jess_syntax::parse_compilation_unit;
use pretty_assertions::assert_eq;
use std::path::Path;

fn parse(source: &str) -> jess_ast::CompilationUnit {
    parse_compilation_unit(source, FileId::from_raw(0), Path::new("Test.java"))
        .expect("parse failed")
}

#[test]
fn unit_structure() {
    let source = r#"
package com.example;

import java.util.List;
import java.util.*;
import static java.lang.Math.PI;

@Deprecated
public class Foo<T extends Number> extends Base implements Iface, Other<T> {
    static final int LIMIT = 10;
    private List<String> names;

    static {
        System.out.println(LIMIT);
    }

    public Foo(int a) {
        this.names = null;
    }

    <R> R pick(R first, R... rest) {
        return first;
    }

    class Inner {}

    enum Color { RED, GREEN(2), BLUE }

    @interface Marker {
        int value() default 1;
    }
}
"#;
    let unit = parse(source);
    assert_eq!(unit.package.as_deref(), Some("com.example"));
    assert_eq!(unit.imports.len(), 3);
    assert!(unit.imports[1].is_star);
    assert!(unit.imports[2].is_static);

    let foo = &unit.types[0];
    assert_eq!(foo.kind, TypeKind::Class);
    assert_eq!(foo.name, "Foo");
    assert_eq!(foo.type_params.len(), 1);
    assert_eq!(foo.type_params[0].name, "T");
    assert!(foo.superclass.is_some());
    assert_eq!(foo.interfaces.len(), 2);
    assert_eq!(foo.annotations.len(), 1);
    assert_eq!(foo.annotations[0].ty.name, "Deprecated");

    let fields: Vec<_> = foo.fields().collect();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "LIMIT");

    let pick = foo.methods().find(|m| m.name == "pick").expect("pick");
    assert!(pick.varargs);
    assert_eq!(pick.type_params.len(), 1);
    assert_eq!(pick.params.len(), 2);
    // The vararg parameter is stored with its array type.
    assert_eq!(pick.params[1].ty.array_dims(), 1);

    let nested: Vec<_> = foo.nested_types().collect();
    assert_eq!(nested.len(), 3);
    assert_eq!(nested[1].kind, TypeKind::Enum);
    assert_eq!(nested[1].enum_constants.len(), 3);
    assert_eq!(nested[1].enum_constants[1].args.len(), 1);
    assert_eq!(nested[2].kind, TypeKind::Annotation);
    let value = nested[2].methods().next().expect("value member");
    assert!(value.annotation_default.is_some());
}

#[test]
fn expression_forms() {
    let source = r#"
class C {
    void m(Object obj) {
        int x = 1 + 2 * 3;
        long mask = x << 2 >> 1 >>> 3;
        boolean flag = x > 1 && x <= 9 || obj instanceof String;
        String s = (String) obj;
        Object[] arr = new Object[x];
        int[][] grid = new int[2][];
        int[] seeded = new int[] { 1, 2, 3 };
        Object picked = flag ? obj : null;
        arr[0] = s;
        x += 2;
        x++;
        --x;
    }
}
"#;
    let unit = parse(source);
    let method = unit.types[0].methods().next().expect("method");
    let body = method.body.as_ref().expect("body");
    assert_eq!(body.statements.len(), 12);
    match &body.statements[3] {
        Stmt::Local(local) => {
            assert!(matches!(local.init, Some(Expr::Cast { .. })));
        }
        other => panic!("expected cast local, got {other:?}"),
    }
    match &body.statements[5] {
        Stmt::Local(local) => match &local.init {
            Some(Expr::NewArray { dims, .. }) => assert_eq!(dims.len(), 2),
            other => panic!("expected array creation, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }
}

#[test]
fn lambdas_and_method_refs() {
    let source = r#"
class C {
    void m() {
        Runnable r = () -> run();
        Fn f = x -> x + 1;
        Fn2 g = (int a, int b) -> { return a + b; };
        ArrMaker<String> maker = String[]::new;
        Converter c = String::valueOf;
        Printer p = System.out::println;
    }
}
"#;
    let unit = parse(source);
    let method = unit.types[0].methods().next().expect("method");
    let body = method.body.as_ref().expect("body");

    match &body.statements[2] {
        Stmt::Local(local) => match &local.init {
            Some(Expr::Lambda { params, body, .. }) => {
                assert_eq!(params.len(), 2);
                assert!(params[0].ty.is_some());
                assert!(matches!(body, LambdaBody::Block(_)));
            }
            other => panic!("expected lambda, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }

    match &body.statements[3] {
        Stmt::Local(local) => match &local.init {
            Some(Expr::MethodRef { target, name, .. }) => {
                assert_eq!(name, "new");
                match target {
                    MethodRefTarget::Type(ty) => assert_eq!(ty.array_dims(), 1),
                    other => panic!("expected type target, got {other:?}"),
                }
            }
            other => panic!("expected method ref, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }

    match &body.statements[4] {
        Stmt::Local(local) => match &local.init {
            Some(Expr::MethodRef { target, name, .. }) => {
                assert_eq!(name, "valueOf");
                assert!(matches!(target, MethodRefTarget::Expr(_)));
            }
            other => panic!("expected method ref, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }
}

#[test]
fn interface_super_call() {
    let source = r#"
interface B extends A {
    default String call() {
        return A.super.m();
    }
}
"#;
    let unit = parse(source);
    let iface = &unit.types[0];
    assert_eq!(iface.kind, TypeKind::Interface);
    assert_eq!(iface.interfaces.len(), 1);
    let call = iface.methods().next().expect("call");
    assert!(call.modifiers.is_default());
    let body = call.body.as_ref().expect("body");
    match &body.statements[0] {
        Stmt::Return { value: Some(value), .. } => match value {
            Expr::MethodCall { receiver, name, .. } => {
                assert_eq!(name, "m");
                match receiver.as_deref() {
                    Some(Expr::SuperRef {
                        qualifier: Some(qualifier),
                        ..
                    }) => assert_eq!(qualifier.name, "A"),
                    other => panic!("expected qualified super, got {other:?}"),
                }
            }
            other => panic!("expected call, got {other:?}"),
        },
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn repeated_annotations_with_args() {
    let source = r#"
@Tag("x")
@Tag("y")
class C {
    @Target({ ElementType.METHOD, ElementType.FIELD })
    void m() {}
}
"#;
    let unit = parse(source);
    let c = &unit.types[0];
    assert_eq!(c.annotations.len(), 2);
    let m = c.methods().next().expect("m");
    assert_eq!(m.annotations.len(), 1);
    match &m.annotations[0].args[0] {
        jess_ast::AnnotationArg::Value(Expr::ArrayInit { values, .. }) => {
            assert_eq!(values.len(), 2)
        }
        other => panic!("expected array value, got {other:?}"),
    }
}

#[test]
fn class_literals_and_generic_calls() {
    let source = r#"
class C {
    void m(Helper helper) {
        Class<?> a = C.class;
        Class<?> b = int.class;
        Class<?> c = java.lang.String.class;
        helper.<String>convert(null);
    }
}
"#;
    let unit = parse(source);
    let method = unit.types[0].methods().next().expect("m");
    let body = method.body.as_ref().expect("body");
    match &body.statements[2] {
        Stmt::Local(local) => match &local.init {
            Some(Expr::ClassLiteral { ty, .. }) => match ty {
                TypeRef::Named(named) => assert_eq!(named.name, "java.lang.String"),
                other => panic!("expected named type, got {other:?}"),
            },
            other => panic!("expected class literal, got {other:?}"),
        },
        other => panic!("expected local, got {other:?}"),
    }
    match &body.statements[3] {
        Stmt::Expr(Expr::MethodCall { type_args, .. }) => assert_eq!(type_args.len(), 1),
        other => panic!("expected generic call, got {other:?}"),
    }
}

#[test]
fn unsupported_constructs_are_errors() {
    for source in [
        "class C { void m() { for (;;) {} } }",
        "class C { void m() { switch (1) {} } }",
        "class C { Object m() { return new Object() {}; } }",
    ] {
        let err = parse_compilation_unit(source, FileId::from_raw(0), Path::new("T.java"));
        assert!(err.is_err(), "expected error for {source}");
    }
}

#[test]
fn print_is_stable_under_reparse() {
    let source = r#"
package p;

class C {
    int f = 3;

    int m(String s, int... rest) throws Error {
        if (s != null) {
            return s.length();
        }
        while (f > 0) {
            f--;
        }
        return f + rest[0];
    }
}
"#;
    let unit = parse(source);
    let first = print_unit(&unit);
    let reparsed = parse(&first);
    let second = print_unit(&reparsed);
    assert_eq!(first, second);
}
