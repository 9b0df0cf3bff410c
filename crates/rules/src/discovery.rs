//! Expand rule file arguments: directories become the YAML files they contain.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::{DirEntry, WalkDir};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

/// Expand `inputs` into rule file paths.
///
/// Directories are walked recursively for `*.yml` / `*.yaml`, skipping
/// dotfiles and dot-directories, and their contents are sorted. Anything else
/// is passed through as given, so a missing file still shows up as a load error.
pub fn discover<P: AsRef<Path>>(inputs: &[P]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        let input = input.as_ref();
        if !input.is_dir() {
            out.push(input.to_path_buf());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
            .filter_map(|res| match res {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %input.display(), error = %e, "failed to walk rules directory");
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_yaml(e.path()))
            .map(DirEntry::into_path)
            .collect();
        found.sort();
        out.extend(found);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn walks_directories_and_skips_hidden_and_non_yaml() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("b.yaml"), "").unwrap();
        fs::write(root.join("a.yml"), "").unwrap();
        fs::write(root.join(".hidden.yaml"), "").unwrap();
        fs::write(root.join("readme.txt"), "").unwrap();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("sub/c.yaml"), "").unwrap();
        fs::create_dir_all(root.join(".rule-shards/abort")).unwrap();
        fs::write(root.join(".rule-shards/abort/x.yaml"), "").unwrap();

        let found = discover(&[root]);
        assert_eq!(
            found,
            vec![root.join("a.yml"), root.join("b.yaml"), root.join("sub/c.yaml")]
        );
    }

    #[test]
    fn plain_and_missing_paths_pass_through_in_order() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("rules");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("x.yaml"), "").unwrap();
        let missing = dir.path().join("missing.yaml");

        let found = discover(&[missing.clone(), sub.clone()]);
        assert_eq!(found, vec![missing, sub.join("x.yaml")]);
    }
}
