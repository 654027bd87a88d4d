use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use jess_compile::JavacCompiler;
use jess_pipeline::{
    DefaultParseOracle, MethodId, Options, SliceMode, SliceRequest, SliceResult, SliceTarget,
    Status, StubberKind, SOFT_FAILURE_EXIT_CODE,
};
use jess_resolve::JdkOracle;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "jess",
    version,
    about = "Slice a Java source file down to a target method and stub the rest"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Slice, stub, compile, and verify a target
    Slice(SliceArgs),
}

#[derive(Args)]
struct SliceArgs {
    /// Path to the target source file
    file: PathBuf,
    /// Target method as `binary.Class#name(DESCRIPTOR)RET`,
    /// e.g. `com.example.Foo#bar(I[Ljava/lang/String;)V`
    #[arg(long, conflicts_with = "class_mode")]
    method: Option<String>,
    /// Slice the whole class instead of a single method
    #[arg(long)]
    class_mode: bool,
    /// Project source root for resolving intra-project references
    /// (repeatable)
    #[arg(long = "source-root")]
    source_roots: Vec<PathBuf>,
    /// Archive dependency placed on the compile classpath (repeatable)
    #[arg(long = "dep")]
    dependencies: Vec<PathBuf>,
    /// Directory that receives `gen/` and `classes/`
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,
    /// Retain `import pkg.*;` lines in sliced output
    #[arg(long)]
    keep_asterisk_imports: bool,
    /// Fail resolution on ambiguous overloads instead of picking the first
    #[arg(long)]
    fail_on_ambiguity: bool,
    /// Match keep patterns by name and arity only
    #[arg(long)]
    loose_signature_matching: bool,
    /// Use the conservative stubber variant
    #[arg(long)]
    alternate_stubber: bool,
    /// `--release` value passed to the external compiler
    #[arg(long)]
    target_version: Option<String>,
    /// Dependency-mode label recorded in the result
    #[arg(long, default_value = "")]
    dep_mode: String,
    /// Keep static initialiser bodies in full
    #[arg(long)]
    keep_class_init: bool,
    /// Keep instance initialiser and constructor bodies in full
    #[arg(long)]
    keep_instance_init: bool,
    /// Emit the result record as JSON suitable for CI
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Slice(args) => match run_slice(args) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_slice(args: SliceArgs) -> Result<ExitCode> {
    let target = if args.class_mode {
        SliceTarget::WholeClass
    } else {
        match &args.method {
            Some(spec) => SliceTarget::Method(parse_method_spec(spec)?),
            None => SliceTarget::WholeClass,
        }
    };

    let options = Options {
        work_dir: args.work_dir,
        slice_mode: if matches!(target, SliceTarget::WholeClass) {
            SliceMode::Class
        } else {
            SliceMode::Method
        },
        dep_mode: args.dep_mode,
        stubber_kind: if args.alternate_stubber {
            StubberKind::Alternate
        } else {
            StubberKind::Default
        },
        keep_asterisk_imports: args.keep_asterisk_imports,
        fail_on_ambiguity: args.fail_on_ambiguity,
        loose_signature_matching: args.loose_signature_matching,
        target_version: args.target_version,
        keep_class_init: args.keep_class_init,
        keep_instance_init: args.keep_instance_init,
    };
    let request = SliceRequest {
        source_file: args.file,
        target,
        source_roots: args.source_roots,
        dependencies: args.dependencies,
    };

    let result = jess_pipeline::run(
        &request,
        &options,
        JdkOracle,
        &DefaultParseOracle,
        &JavacCompiler::default(),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_summary(&result);
    }

    Ok(match result.status {
        Status::Ok => ExitCode::SUCCESS,
        Status::InternalError => ExitCode::from(SOFT_FAILURE_EXIT_CODE as u8),
        _ => ExitCode::FAILURE,
    })
}

fn print_summary(result: &SliceResult) {
    println!("status: {:?}", result.status);
    if let Some(primary) = &result.primary_class {
        println!("primary class: {primary}");
    }
    if let Some(classes_dir) = &result.classes_dir {
        println!("classes: {}", classes_dir.display());
    }
    println!(
        "emitted {} classes, target has code: {}, used stubs: {}",
        result.emitted_binary_names.len(),
        result.target_has_code,
        result.used_stubs
    );
    println!("took {} ms", result.duration_ms);
    for note in &result.notes {
        println!("note: {note}");
    }
}

/// Parses `binary.Class#name(DESCRIPTOR)RET` into a [`MethodId`].
fn parse_method_spec(spec: &str) -> Result<MethodId> {
    let Some((class, rest)) = spec.split_once('#') else {
        bail!("method spec `{spec}` is missing `#` between class and method");
    };
    let Some(paren) = rest.find('(') else {
        bail!("method spec `{spec}` is missing a descriptor");
    };
    let (name, descriptor) = rest.split_at(paren);
    if class.is_empty() || name.is_empty() {
        bail!("method spec `{spec}` has an empty class or method name");
    }
    Ok(MethodId {
        binary_class_name: class.to_string(),
        name: name.to_string(),
        descriptor: descriptor.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_method_spec() {
        let id = parse_method_spec("com.example.Foo#bar(I[Ljava/lang/String;)V").unwrap();
        assert_eq!(id.binary_class_name, "com.example.Foo");
        assert_eq!(id.name, "bar");
        assert_eq!(id.descriptor, "(I[Ljava/lang/String;)V");
    }

    #[test]
    fn rejects_malformed_specs() {
        assert!(parse_method_spec("com.example.Foo").is_err());
        assert!(parse_method_spec("com.example.Foo#bar").is_err());
        assert!(parse_method_spec("#bar()V").is_err());
    }
}
