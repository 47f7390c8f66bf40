//! `@import` resolution, abstracted per §1 ("filesystem I/O for `@import`
//! is exposed as an abstract source-resolver") so this crate never touches
//! `std::fs` itself — the facade crate supplies the filesystem-backed
//! implementation.

/// Resolves an `@import` path to its absolute form and contents.
///
/// The evaluator builds `candidates` (the configured `paths` plus the
/// current file's directory, each joined with `path` and suffixed
/// `.styl`) and hands them to the resolver in search order; the resolver
/// returns the first one that actually exists.
pub trait ImportResolver {
    fn resolve(&self, path: &str, candidates: &[String]) -> Option<(String, String)>;
}

/// A resolver that never finds anything, for compiles that disallow
/// imports or for unit tests that don't exercise `@import`.
pub struct NullResolver;

impl ImportResolver for NullResolver {
    fn resolve(&self, _path: &str, _candidates: &[String]) -> Option<(String, String)> {
        None
    }
}

/// Builds the ordered list of candidate file paths for `path`, per §6's
/// "`paths` ∪ `{dirname(filename)}`, suffix `.styl`" default rule.
pub fn candidate_paths(path: &str, paths: &[String], filename: &str) -> Vec<String> {
    let dir = std::path::Path::new(filename)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut dirs: Vec<&str> = paths.iter().map(String::as_str).collect();
    if !dir.is_empty() {
        dirs.push(dir.as_str());
    }
    if dirs.is_empty() {
        dirs.push(".");
    }
    dirs.iter()
        .map(|dir| {
            let joined = std::path::Path::new(dir).join(path);
            if path.ends_with(".css") || path.ends_with(".styl") {
                joined.to_string_lossy().into_owned()
            } else {
                format!("{}.styl", joined.to_string_lossy())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_include_paths_and_filename_dir() {
        let candidates = candidate_paths("mixins", &["vendor".to_string()], "src/main.styl");
        assert!(candidates.iter().any(|c| c == "vendor/mixins.styl"));
        assert!(candidates.iter().any(|c| c == "src/mixins.styl"));
    }

    #[test]
    fn css_suffixed_path_is_passed_through_without_styl_suffix() {
        let candidates = candidate_paths("reset.css", &[], "a.styl");
        assert_eq!(candidates, vec!["reset.css".to_string()]);
    }
}
