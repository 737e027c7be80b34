//! Shared helpers for the asmtree binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Expand command-line paths into the candidate file list.
///
/// Files are taken as given, whatever their extension; directories are
/// walked recursively for `.dll` and `.exe` entries; paths that do not
/// exist are dropped. Case-insensitive duplicates collapse to one entry
/// and the result comes back sorted, so repeated runs see the same scan
/// order.
pub fn discover_inputs(paths: &[String]) -> Vec<PathBuf> {
    let mut seen: BTreeMap<String, PathBuf> = BTreeMap::new();
    for raw in paths {
        let path = Path::new(raw);
        if path.is_file() {
            insert_unique(&mut seen, path.to_path_buf());
        } else if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
                if entry.file_type().is_file() && has_assembly_extension(entry.path()) {
                    insert_unique(&mut seen, entry.into_path());
                }
            }
        } else {
            warn!(path = raw.as_str(), "path not found, skipping");
        }
    }
    seen.into_values().collect()
}

fn insert_unique(seen: &mut BTreeMap<String, PathBuf>, path: PathBuf) {
    seen.entry(path.to_string_lossy().to_lowercase()).or_insert(path);
}

fn has_assembly_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dll") || ext.eq_ignore_ascii_case("exe"))
}

/// File-name portion of a path, for the one-line load failure reports.
pub fn short_file_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.display().to_string(),
    }
}
