//! Source emission into the `gen/` directory.

use jess_ast::print_unit;
use jess_stub::StubbedModel;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes every unit of the model under `gen_dir`, one file per unit, laid
/// out by package directory. The directory is recreated from scratch so
/// repeated runs emit byte-identical trees.
pub fn emit_sources(model: &StubbedModel, gen_dir: &Path) -> io::Result<Vec<PathBuf>> {
    if gen_dir.exists() {
        std::fs::remove_dir_all(gen_dir)?;
    }
    std::fs::create_dir_all(gen_dir)?;

    let mut written = Vec::new();
    for unit in model.units() {
        let Some(primary) = unit.primary_type() else {
            continue;
        };
        let mut dir = gen_dir.to_path_buf();
        if let Some(package) = &unit.package {
            for segment in package.split('.') {
                dir.push(segment);
            }
        }
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.java", primary.name));
        let text = print_unit(unit);
        std::fs::write(&path, text)?;
        debug!(path = %path.display(), "emitted source");
        written.push(path);
    }
    Ok(written)
}
