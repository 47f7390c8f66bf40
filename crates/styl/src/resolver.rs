//! The default, filesystem-backed `ImportResolver`. `styl-eval` only knows
//! how to build candidate paths (pure string work); actually reading a file
//! is I/O, so it lives here per §1's "filesystem I/O for `@import` is
//! exposed as an abstract source-resolver".

use styl_eval::ImportResolver;

pub struct FsResolver;

impl ImportResolver for FsResolver {
    fn resolve(&self, _path: &str, candidates: &[String]) -> Option<(String, String)> {
        candidates
            .iter()
            .find_map(|candidate| std::fs::read_to_string(candidate).ok().map(|c| (candidate.clone(), c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_the_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mixins.styl");
        std::fs::write(&file, "$x = 1\n").unwrap();
        let resolver = FsResolver;
        let missing = dir.path().join("absent.styl").to_string_lossy().into_owned();
        let present = file.to_string_lossy().into_owned();
        let (resolved, contents) = resolver.resolve("mixins", &[missing, present]).unwrap();
        assert!(resolved.ends_with("mixins.styl"));
        assert_eq!(contents, "$x = 1\n");
    }

    #[test]
    fn none_when_no_candidate_exists() {
        let resolver = FsResolver;
        assert!(resolver.resolve("nope", &["/no/such/path.styl".to_string()]).is_none());
    }
}
