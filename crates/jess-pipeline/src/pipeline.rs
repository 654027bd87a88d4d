//! The linear stage driver.

use crate::emit::emit_sources;
use crate::verify::verify_target;
use crate::{
    MethodId, Options, SliceMode, SliceRequest, SliceResult, SliceTarget, Status, StubberKind,
};
use jess_ast::CompilationUnit;
use jess_classfile::parse_method_descriptor;
use jess_compile::{CompileOracle, CompileRequest};
use jess_core::{FileId, Fqn};
use jess_resolve::{
    CachingOracle, ParseOracle, ResolutionCacheScope, ResolutionOracle, ResolveError, Resolver,
    ResolverConfig, SourceRootIndex,
};
use jess_slice::{compute_keep_set, slice, KeepRules, MethodPattern, SliceConfig};
use jess_stub::{apply_plans, collect_plans, reconcile, StubberOptions};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The default parse oracle, backed by the bundled parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParseOracle;

impl ParseOracle for DefaultParseOracle {
    fn parse(
        &self,
        text: &str,
        file: FileId,
        path: &Path,
    ) -> Result<CompilationUnit, String> {
        jess_syntax::parse_compilation_unit(text, file, path).map_err(|err| err.to_string())
    }
}

/// Runs the full pipeline for one request.
///
/// Unexpected panics inside the stages are caught at this boundary and
/// reported as `INTERNAL_ERROR`, the Rust rendition of the original's
/// stack-overflow soft failure.
pub fn run<O: ResolutionOracle>(
    request: &SliceRequest,
    options: &Options,
    oracle: O,
    parser: &dyn ParseOracle,
    compiler: &dyn CompileOracle,
) -> SliceResult {
    let started = Instant::now();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run_inner(request, options, oracle, parser, compiler)
    }));
    let mut result = match outcome {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<String>()
                .cloned()
                .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(%message, "pipeline panicked");
            SliceResult::failed(
                Status::InternalError,
                &options.dep_mode,
                vec![format!("internal error: {message}")],
            )
        }
    };
    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}

fn run_inner<O: ResolutionOracle>(
    request: &SliceRequest,
    options: &Options,
    oracle: O,
    parser: &dyn ParseOracle,
    compiler: &dyn CompileOracle,
) -> SliceResult {
    let dep_mode = options.dep_mode.as_str();
    let mut notes = Vec::new();

    // Stage 0: parse the root unit.
    let text = match std::fs::read_to_string(&request.source_file) {
        Ok(text) => text,
        Err(err) => {
            return SliceResult::failed(
                Status::FailedParse,
                dep_mode,
                vec![format!("cannot read {}: {err}", request.source_file.display())],
            );
        }
    };
    let root = match parser.parse(&text, FileId::from_raw(0), &request.source_file) {
        Ok(root) => root,
        Err(message) => {
            return SliceResult::failed(Status::FailedParse, dep_mode, vec![message]);
        }
    };
    let primary_fqn = root
        .primary_type()
        .map(|decl| root.fqn_of(decl))
        .unwrap_or_else(|| Fqn::new(""));

    // Stages 1-6 share the invocation-scoped resolution cache; the scope
    // guard clears it however this function leaves.
    let cache = CachingOracle::new(oracle);
    let _cache_scope = ResolutionCacheScope::new(&cache);

    // Stage 1: resolve and annotate.
    let sources = SourceRootIndex::scan(&request.source_roots);
    let resolver = Resolver::new(
        &cache,
        ResolverConfig {
            fail_on_ambiguity: options.fail_on_ambiguity,
            loose_signature_matching: options.loose_signature_matching,
        },
    );
    let resolved = match resolver.resolve(root, &sources, parser) {
        Ok(resolved) => resolved,
        Err(err @ ResolveError::Ambiguity { .. }) => {
            return SliceResult::failed(Status::FailedResolve, dep_mode, vec![err.to_string()]);
        }
        Err(err @ ResolveError::DepthExceeded { .. }) => {
            return SliceResult::failed(Status::InternalError, dep_mode, vec![err.to_string()]);
        }
        Err(err) => {
            return SliceResult::failed(Status::FailedResolve, dep_mode, vec![err.to_string()]);
        }
    };
    info!(foreign = resolved.foreign.len(), "resolution complete");

    // Stage 2: keep-set.
    let rules = keep_rules(request, options, &mut notes);
    let keep = compute_keep_set(
        &resolved.root,
        &resolved.foreign,
        &rules,
        options.loose_signature_matching,
    );
    debug!(kept = keep.len(), "pre-slice complete");

    // Stage 3: slice.
    let sliced = slice(
        resolved.root,
        resolved.foreign,
        &keep,
        &rules,
        &SliceConfig {
            keep_asterisk_imports: options.keep_asterisk_imports,
        },
    );

    // Stage 4: collect stub plans.
    let plans = collect_plans(&sliced, &cache);
    let used_stubs = !plans.is_empty();
    debug!(plans = plans.len(), "collection complete");

    // Stages 5-6: materialise and reconcile.
    let stubber_options = match options.stubber_kind {
        StubberKind::Default => StubberOptions::default(),
        StubberKind::Alternate => StubberOptions {
            repeatable_container_heuristic: false,
            builder_completion: false,
        },
    };
    let mut model = apply_plans(&plans, sliced);
    reconcile(&mut model, &stubber_options);

    // Emit.
    let gen_dir = options.work_dir.join("gen");
    if let Err(err) = emit_sources(&model, &gen_dir) {
        return SliceResult::failed(
            Status::InternalError,
            dep_mode,
            vec![format!("emission failed: {err}")],
        );
    }

    // Compile.
    let classes_dir = options.work_dir.join("classes");
    if classes_dir.exists() {
        if let Err(err) = std::fs::remove_dir_all(&classes_dir) {
            notes.push(format!("could not clean classes dir: {err}"));
        }
    }
    let compile_request = CompileRequest {
        sources_dir: gen_dir,
        classes_dir: classes_dir.clone(),
        classpath: request.dependencies.clone(),
        release: options.target_version.clone(),
    };
    let outcome = match compiler.compile(&compile_request) {
        Ok(outcome) => outcome,
        Err(err) => {
            return SliceResult::failed(
                Status::FailedCompile,
                dep_mode,
                vec![format!("compiler invocation failed: {err}")],
            );
        }
    };
    if !outcome.success {
        notes.push(format!("compile failed: {}", outcome.command));
        for diag in outcome.diagnostics.iter().take(20) {
            notes.push(format!(
                "{}:{}: {}",
                diag.file.display(),
                diag.line,
                diag.message.lines().next().unwrap_or("")
            ));
        }
        return SliceResult::failed(Status::FailedCompile, dep_mode, notes);
    }

    // Verify the target landed with code.
    let method_target = match &request.target {
        SliceTarget::Method(id) => Some(id.clone()),
        SliceTarget::WholeClass => None,
    };
    let check = verify_target(&classes_dir, method_target.as_ref());
    let primary_binary = primary_fqn.as_str().to_string();
    let (status, target_has_code, class_file_rel) = match &method_target {
        Some(_) if !check.target_found => (Status::TargetMethodNotEmitted, false, None),
        Some(_) => (Status::Ok, check.target_has_code, check.class_file_rel.clone()),
        None => {
            let rel = check
                .emitted_binary_names
                .iter()
                .position(|name| *name == primary_binary)
                .map(|_| format!("{}.class", primary_binary.replace('.', "/")));
            (Status::Ok, !check.emitted_binary_names.is_empty(), rel)
        }
    };

    SliceResult {
        status,
        classes_dir: Some(classes_dir),
        primary_class: Some(primary_binary),
        emitted_binary_names: check.emitted_binary_names,
        class_file_rel,
        target_has_code,
        used_stubs,
        dep_mode: dep_mode.to_string(),
        duration_ms: 0,
        notes,
    }
}

fn keep_rules(request: &SliceRequest, options: &Options, notes: &mut Vec<String>) -> KeepRules {
    let mut rules = KeepRules {
        patterns: Vec::new(),
        keep_class_init: options.keep_class_init,
        keep_instance_init: options.keep_instance_init,
    };
    if options.slice_mode == SliceMode::Class {
        return rules;
    }
    match &request.target {
        SliceTarget::WholeClass => rules,
        SliceTarget::Method(id) => {
            match method_pattern(id) {
                Ok(pattern) => rules.patterns.push(pattern),
                Err(message) => {
                    // A broken descriptor degrades to name-only matching.
                    notes.push(message);
                    rules.patterns.push(MethodPattern::named(id.name.clone()));
                }
            }
            rules
        }
    }
}

fn method_pattern(id: &MethodId) -> Result<MethodPattern, String> {
    let descriptor = parse_method_descriptor(&id.descriptor)
        .map_err(|err| format!("bad descriptor `{}`: {err}", id.descriptor))?;
    Ok(MethodPattern::with_params(
        id.name.clone(),
        descriptor.param_source_names(),
    ))
}
