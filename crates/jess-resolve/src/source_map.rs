//! Mapping from FQNs to source files under the project's source roots.

use jess_core::Fqn;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// An index of `.java` files under the given source roots, keyed by the FQN
/// their path implies (`<root>/com/example/Foo.java` → `com.example.Foo`).
#[derive(Debug, Default)]
pub struct SourceRootIndex {
    by_fqn: HashMap<Fqn, PathBuf>,
}

impl SourceRootIndex {
    pub fn scan(roots: &[PathBuf]) -> Self {
        let mut by_fqn = HashMap::new();
        for root in roots {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("java") {
                    continue;
                }
                if let Some(fqn) = fqn_for(root, path) {
                    by_fqn.entry(fqn).or_insert_with(|| path.to_path_buf());
                }
            }
        }
        tracing::debug!(files = by_fqn.len(), "scanned source roots");
        Self { by_fqn }
    }

    pub fn find(&self, fqn: &Fqn) -> Option<&Path> {
        if let Some(path) = self.by_fqn.get(fqn) {
            return Some(path);
        }
        // Nested types live in their top-level type's file.
        let top_level = fqn.nesting_chain().into_iter().next()?;
        self.by_fqn.get(&top_level).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_fqn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_fqn.is_empty()
    }
}

fn fqn_for(root: &Path, path: &Path) -> Option<Fqn> {
    let relative = path.strip_prefix(root).ok()?;
    let stem = relative.file_stem()?.to_str()?;
    let mut segments: Vec<&str> = Vec::new();
    for part in relative.parent().into_iter().flat_map(|p| p.components()) {
        segments.push(part.as_os_str().to_str()?);
    }
    segments.push(stem);
    Some(Fqn::new(segments.join(".")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_paths_to_fqns() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("com/example");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("Foo.java"), "class Foo {}").unwrap();
        std::fs::write(dir.path().join("Top.java"), "class Top {}").unwrap();

        let index = SourceRootIndex::scan(&[dir.path().to_path_buf()]);
        assert_eq!(index.len(), 2);
        assert!(index.find(&Fqn::new("com.example.Foo")).is_some());
        assert!(index.find(&Fqn::new("Top")).is_some());
        // Nested types resolve to the enclosing file.
        assert!(index.find(&Fqn::new("com.example.Foo$Inner")).is_some());
        assert!(index.find(&Fqn::new("com.example.Missing")).is_none());
    }
}
