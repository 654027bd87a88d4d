use jess_compile::{CompileOracle, CompileOutcome, CompileRequest};
use jess_pipeline::{
    run, DefaultParseOracle, MethodId, Options, SliceRequest, SliceTarget, Status,
};
use jess_resolve::JdkOracle;
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A compile oracle that fabricates class files instead of running javac:
/// one class per emitted top-level source, each method present with a
/// one-instruction body.
struct SynthCompiler {
    fail: bool,
    /// Methods to synthesise per binary class name; when absent, a single
    /// `<init>()V` is emitted.
    methods: BTreeMap<String, Vec<(String, String)>>,
}

impl SynthCompiler {
    fn ok() -> Self {
        Self {
            fail: false,
            methods: BTreeMap::new(),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            methods: BTreeMap::new(),
        }
    }

    fn with_method(mut self, class: &str, name: &str, descriptor: &str) -> Self {
        self.methods
            .entry(class.to_string())
            .or_default()
            .push((name.to_string(), descriptor.to_string()));
        self
    }
}

impl CompileOracle for SynthCompiler {
    fn compile(&self, request: &CompileRequest) -> jess_compile::Result<CompileOutcome> {
        if self.fail {
            return Ok(CompileOutcome {
                success: false,
                diagnostics: Vec::new(),
                command: "synth-javac".to_string(),
                stdout: String::new(),
                stderr: "error: boom".to_string(),
            });
        }
        std::fs::create_dir_all(&request.classes_dir).unwrap();
        for entry in walk_java(&request.sources_dir) {
            let rel = entry.strip_prefix(&request.sources_dir).unwrap();
            let binary = rel
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(".");
            let methods = self
                .methods
                .get(&binary)
                .cloned()
                .unwrap_or_else(|| vec![("<init>".to_string(), "()V".to_string())]);
            let bytes = synth_class(&binary.replace('.', "/"), &methods);
            let out = request
                .classes_dir
                .join(rel.with_extension("class"));
            std::fs::create_dir_all(out.parent().unwrap()).unwrap();
            std::fs::write(out, bytes).unwrap();
        }
        Ok(CompileOutcome {
            success: true,
            diagnostics: Vec::new(),
            command: "synth-javac".to_string(),
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn walk_java(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    fn rec(dir: &Path, out: &mut Vec<PathBuf>) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                rec(&path, out);
            } else if path.extension().and_then(|e| e.to_str()) == Some("java") {
                out.push(path);
            }
        }
    }
    rec(dir, &mut out);
    out.sort();
    out
}

/// Assembles a classfile with the given `(name, descriptor)` methods, each
/// carrying a one-instruction `Code` attribute.
fn synth_class(internal_name: &str, methods: &[(String, String)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&52u16.to_be_bytes());

    // Pool: 1=Utf8 name, 2=Class(1), 3=Utf8 "Code", then 2 per method.
    let pool_count = 4 + methods.len() * 2;
    out.extend_from_slice(&(pool_count as u16).to_be_bytes());
    out.push(1);
    out.extend_from_slice(&(internal_name.len() as u16).to_be_bytes());
    out.extend_from_slice(internal_name.as_bytes());
    out.push(7);
    out.extend_from_slice(&1u16.to_be_bytes());
    out.push(1);
    out.extend_from_slice(&4u16.to_be_bytes());
    out.extend_from_slice(b"Code");
    for (name, descriptor) in methods {
        out.push(1);
        out.extend_from_slice(&(name.len() as u16).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.push(1);
        out.extend_from_slice(&(descriptor.len() as u16).to_be_bytes());
        out.extend_from_slice(descriptor.as_bytes());
    }

    out.extend_from_slice(&0x0021u16.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes()); // this_class
    out.extend_from_slice(&0u16.to_be_bytes()); // super
    out.extend_from_slice(&0u16.to_be_bytes()); // interfaces
    out.extend_from_slice(&0u16.to_be_bytes()); // fields

    out.extend_from_slice(&(methods.len() as u16).to_be_bytes());
    for (pos, _) in methods.iter().enumerate() {
        let name_index = 4 + pos * 2;
        out.extend_from_slice(&0x0001u16.to_be_bytes());
        out.extend_from_slice(&(name_index as u16).to_be_bytes());
        out.extend_from_slice(&((name_index + 1) as u16).to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes()); // attributes_count
        out.extend_from_slice(&3u16.to_be_bytes()); // "Code"
        let mut body = Vec::new();
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&1u16.to_be_bytes());
        body.extend_from_slice(&1u32.to_be_bytes());
        body.push(0xB1);
        body.extend_from_slice(&0u16.to_be_bytes());
        body.extend_from_slice(&0u16.to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
    }
    out.extend_from_slice(&0u16.to_be_bytes());
    out
}

fn write_source(dir: &Path, rel: &str, text: &str) -> PathBuf {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

fn options(work_dir: &Path) -> Options {
    Options {
        work_dir: work_dir.to_path_buf(),
        ..Default::default()
    }
}

const TARGET_SOURCE: &str = r#"
package p;

class C {
    void foo(int a, String[] rest) {
        helper();
    }

    void helper() {}

    void unrelated() {}
}
"#;

fn foo_target() -> SliceTarget {
    SliceTarget::Method(MethodId {
        binary_class_name: "p.C".to_string(),
        name: "foo".to_string(),
        descriptor: "(I[Ljava/lang/String;)V".to_string(),
    })
}

#[test]
fn descriptor_slicing_keeps_only_the_target_closure() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "src/p/C.java", TARGET_SOURCE);

    let compiler = SynthCompiler::ok().with_method("p.C", "foo", "(I[Ljava/lang/String;)V");
    let request = SliceRequest {
        source_file: source,
        target: foo_target(),
        source_roots: vec![dir.path().join("src")],
        dependencies: Vec::new(),
    };
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &compiler,
    );

    assert_eq!(result.status, Status::Ok);
    assert!(result.target_has_code);
    assert_eq!(result.primary_class.as_deref(), Some("p.C"));
    assert_eq!(result.emitted_binary_names, vec!["p.C".to_string()]);

    let emitted = std::fs::read_to_string(dir.path().join("gen/p/C.java")).unwrap();
    assert!(emitted.contains("void foo(int a, String[] rest)"));
    assert!(emitted.contains("void helper()"));
    assert!(!emitted.contains("unrelated"));
}

#[test]
fn parse_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "src/p/C.java", "class C { this is not java }");
    let request = SliceRequest {
        source_file: source,
        target: SliceTarget::WholeClass,
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(result.status, Status::FailedParse);
    assert!(!result.notes.is_empty());
}

#[test]
fn compile_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "src/p/C.java", TARGET_SOURCE);
    let request = SliceRequest {
        source_file: source,
        target: foo_target(),
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::failing(),
    );
    assert_eq!(result.status, Status::FailedCompile);
}

#[test]
fn missing_target_method_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "src/p/C.java", TARGET_SOURCE);
    // The synthesised class carries only a constructor, not the target.
    let request = SliceRequest {
        source_file: source,
        target: foo_target(),
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(result.status, Status::TargetMethodNotEmitted);
    assert!(!result.target_has_code);
}

#[test]
fn stubs_are_emitted_and_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "src/p/C.java",
        r#"
package p;

class C {
    Widget w;

    void m() {
        w.spin(1);
    }
}
"#,
    );
    let request = SliceRequest {
        source_file: source,
        target: SliceTarget::WholeClass,
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(result.status, Status::Ok);
    assert!(result.used_stubs);

    let widget = std::fs::read_to_string(dir.path().join("gen/p/Widget.java")).unwrap();
    assert!(widget.contains("public class Widget"));
    assert!(widget.contains("spin(int arg0)"));
}

#[test]
fn runs_are_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "src/p/C.java",
        r#"
package p;

class C {
    void m() {
        obj.bar(42);
        Box<String> b = new S();
        b.get();
    }
}
"#,
    );
    let request = SliceRequest {
        source_file: source,
        target: SliceTarget::WholeClass,
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };

    let snapshot = |label: &str| -> BTreeMap<String, String> {
        let _ = label;
        let mut map = BTreeMap::new();
        for path in walk_java(&dir.path().join("gen")) {
            let rel = path
                .strip_prefix(dir.path())
                .unwrap()
                .display()
                .to_string();
            map.insert(rel, std::fs::read_to_string(&path).unwrap());
        }
        map
    };

    let first_result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(first_result.status, Status::Ok);
    let first = snapshot("first");

    let second_result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(second_result.status, Status::Ok);
    let second = snapshot("second");

    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn reapplying_the_pipeline_to_emitted_sources_needs_no_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(
        dir.path(),
        "src/p/C.java",
        r#"
package p;

class C {
    Widget w;

    void m() {
        w.spin(1);
    }
}
"#,
    );
    let request = SliceRequest {
        source_file: source,
        target: SliceTarget::WholeClass,
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let first = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(first.status, Status::Ok);
    assert!(first.used_stubs);

    // Second pass over the emitted slice, with gen/ as the source root:
    // everything resolves, so the collector plans nothing.
    let gen = dir.path().join("gen");
    let second_dir = tempfile::tempdir().unwrap();
    let second_request = SliceRequest {
        source_file: gen.join("p/C.java"),
        target: SliceTarget::WholeClass,
        source_roots: vec![gen.clone()],
        dependencies: Vec::new(),
    };
    let second = run(
        &second_request,
        &options(second_dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &SynthCompiler::ok(),
    );
    assert_eq!(second.status, Status::Ok);
    assert!(!second.used_stubs, "emitted stubs must re-resolve cleanly");
}

#[test]
fn result_record_serialises_for_ci() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_source(dir.path(), "src/p/C.java", TARGET_SOURCE);
    let request = SliceRequest {
        source_file: source,
        target: foo_target(),
        source_roots: Vec::new(),
        dependencies: Vec::new(),
    };
    let compiler = SynthCompiler::ok().with_method("p.C", "foo", "(I[Ljava/lang/String;)V");
    let result = run(
        &request,
        &options(dir.path()),
        JdkOracle,
        &DefaultParseOracle,
        &compiler,
    );
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["status"], "OK");
    assert_eq!(json["primary_class"], "p.C");
    assert_eq!(json["target_has_code"], true);
}
