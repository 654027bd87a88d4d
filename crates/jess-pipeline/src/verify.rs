//! Post-compile target verification over the emitted class files.

use crate::MethodId;
use jess_classfile::ClassFile;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What the classfile walk established about the target.
#[derive(Debug, Default)]
pub struct TargetCheck {
    /// Binary names of all emitted classes.
    pub emitted_binary_names: Vec<String>,
    /// `classes_dir`-relative path of the class that holds the target.
    pub class_file_rel: Option<String>,
    /// The target method exists somewhere in the emitted classes.
    pub target_found: bool,
    /// The target method carries non-empty bytecode.
    pub target_has_code: bool,
}

/// Walks `classes_dir` and checks the target method's presence by name and
/// descriptor. With no method target, any emitted class counts as found.
pub fn verify_target(classes_dir: &Path, target: Option<&MethodId>) -> TargetCheck {
    let mut check = TargetCheck::default();
    let mut class_files: Vec<PathBuf> = WalkDir::new(classes_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.path().extension().and_then(|ext| ext.to_str()) == Some("class")
        })
        .map(|entry| entry.into_path())
        .collect();
    class_files.sort();

    for path in class_files {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        let Ok(class) = ClassFile::parse(&bytes) else {
            continue;
        };
        let binary_name = class.this_class.replace('/', ".");
        check.emitted_binary_names.push(binary_name.clone());

        let Some(target) = target else {
            continue;
        };
        if binary_name != target.binary_class_name {
            continue;
        }
        if let Some(method) = class.find_method(&target.name, &target.descriptor) {
            check.target_found = true;
            check.target_has_code = method.has_code;
            check.class_file_rel = path
                .strip_prefix(classes_dir)
                .ok()
                .map(|rel| rel.display().to_string());
        }
    }
    check
}
