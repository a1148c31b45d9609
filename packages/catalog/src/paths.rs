//! Path normalisation, containment and requirement matching.
//!
//! All helpers are lexical: they never touch the filesystem, so their output
//! depends only on their inputs. [`PathResolver`] memoises the hot ones in
//! bounded caches owned by whoever builds the [`ToolContext`](crate::context::ToolContext).

use std::{
    collections::BTreeSet,
    fmt,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use moka::sync::Cache;

/// Capacity used when a context is built without an explicit resolver.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Bounded memoisation for path helpers.
///
/// Cloning is cheap and clones share the same caches.
#[derive(Clone)]
pub struct PathResolver {
    capacity: u64,
    resolved: Cache<(PathBuf, String), PathBuf>,
    parts: Cache<(PathBuf, PathBuf), Arc<[String]>>,
}

impl PathResolver {
    /// Creates a resolver whose caches each hold at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        log::debug!("PathResolver: capacity={capacity}");
        Self {
            capacity,
            resolved: Cache::new(capacity),
            parts: Cache::new(capacity),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Cached [`resolve_path`].
    #[must_use]
    pub fn resolve(&self, root: &Path, value: &str) -> PathBuf {
        self.resolved
            .get_with((root.to_path_buf(), value.to_string()), || {
                resolve_path(root, value)
            })
    }

    /// Cached [`candidate_parts`].
    #[must_use]
    pub fn candidate_parts(&self, candidate: &Path, root: &Path) -> Arc<[String]> {
        self.parts
            .get_with((candidate.to_path_buf(), root.to_path_buf()), || {
                candidate_parts(candidate, root).into()
            })
    }

    /// Returns `true` when `candidate` contains every requirement as a
    /// contiguous run of path segments.
    #[must_use]
    pub fn matches_requirements(
        &self,
        candidate: &Path,
        root: &Path,
        requirements: &[Arc<[String]>],
    ) -> bool {
        if requirements.is_empty() {
            return true;
        }

        let parts = self.candidate_parts(candidate, root);
        if parts.is_empty() {
            return false;
        }

        requirements
            .iter()
            .all(|requirement| has_segment_sequence(&parts, requirement))
    }
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathResolver")
            .field("capacity", &self.capacity)
            .field("resolved", &self.resolved.entry_count())
            .field("parts", &self.parts.entry_count())
            .finish()
    }
}

/// Resolves `value` to an absolute, normalised path anchored at `root`.
///
/// A leading `~` expands to the home directory. Relative values are joined to
/// `root`, then `.` and `..` components are folded lexically.
#[must_use]
pub fn resolve_path(root: &Path, value: &str) -> PathBuf {
    let candidate = expand_home(value);
    let joined = if candidate.is_absolute() {
        candidate
    } else {
        root.join(candidate)
    };
    let absolute = if joined.is_absolute() {
        joined
    } else {
        std::path::absolute(&joined).unwrap_or(joined)
    };
    normalize_lexically(&absolute)
}

/// Folds `.` and `..` components without consulting the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push(component);
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                normalized.push(component);
            }
        }
    }

    normalized
}

fn expand_home(value: &str) -> PathBuf {
    let rest = if value == "~" {
        Some("")
    } else {
        value.strip_prefix("~/").or_else(|| value.strip_prefix("~\\"))
    };

    match (rest, rest.and_then(|_| home::home_dir())) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

/// Returns `true` when `candidate` lies at or below `base`.
#[must_use]
pub fn is_under(candidate: &Path, base: &Path) -> bool {
    normalize_lexically(candidate).starts_with(normalize_lexically(base))
}

/// Returns `true` when `candidate` lies at or below any of `bases`.
#[must_use]
pub fn is_under_any<'a>(candidate: &Path, bases: impl IntoIterator<Item = &'a PathBuf>) -> bool {
    bases.into_iter().any(|base| is_under(candidate, base))
}

/// Compiles exclusion arguments for scanner commands.
///
/// Each excluded path contributes its absolute form and, when it lies inside
/// `root`, its root-relative form (`.` for the root itself).
#[must_use]
pub fn compile_exclude_arguments<'a>(
    excluded: impl IntoIterator<Item = &'a PathBuf>,
    root: &Path,
) -> BTreeSet<String> {
    let root = normalize_lexically(root);
    let mut arguments = BTreeSet::new();

    for path in excluded {
        let resolved = normalize_lexically(path);
        arguments.insert(resolved.display().to_string());
        if let Ok(relative) = resolved.strip_prefix(&root) {
            let relative = relative.display().to_string();
            arguments.insert(if relative.is_empty() {
                ".".to_string()
            } else {
                relative
            });
        }
    }

    arguments
}

/// Splits a requirement such as `src/app` or `src\app` into its non-empty
/// segments.
#[must_use]
pub fn normalize_requirement(raw: &str) -> Vec<String> {
    raw.replace('\\', "/")
        .trim()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns the normalised components of `candidate`, relative to `root` when
/// possible. Falls back to splitting the path text on `/`.
#[must_use]
pub fn candidate_parts(candidate: &Path, root: &Path) -> Vec<String> {
    let relative = if candidate.is_absolute() {
        candidate.strip_prefix(root).unwrap_or(candidate)
    } else {
        candidate
    };

    let parts = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
        })
        .collect::<Vec<_>>();

    if !parts.is_empty() {
        return parts;
    }

    candidate
        .to_string_lossy()
        .replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns `true` when `required` appears as a contiguous run within `parts`.
#[must_use]
pub fn has_segment_sequence(parts: &[String], required: &[String]) -> bool {
    if required.is_empty() {
        return true;
    }
    parts.windows(required.len()).any(|window| window == required)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn test_resolve_path_joins_and_normalizes() {
        let root = Path::new("/repo");
        assert_eq!(resolve_path(root, "src"), PathBuf::from("/repo/src"));
        assert_eq!(resolve_path(root, "./src/../lib"), PathBuf::from("/repo/lib"));
        assert_eq!(resolve_path(root, "/etc/tool.cfg"), PathBuf::from("/etc/tool.cfg"));
        assert_eq!(resolve_path(root, "."), PathBuf::from("/repo"));
    }

    #[test_log::test]
    fn test_normalize_lexically_does_not_escape_root() {
        assert_eq!(normalize_lexically(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_lexically(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test_log::test]
    fn test_is_under_any() {
        let bases = vec![PathBuf::from("/repo/build"), PathBuf::from("/repo/vendor")];
        assert!(is_under_any(Path::new("/repo/build/out.py"), &bases));
        assert!(is_under_any(Path::new("/repo/vendor"), &bases));
        assert!(!is_under_any(Path::new("/repo/builder"), &bases));
        assert!(!is_under_any(Path::new("/repo/src"), &bases));
    }

    #[test_log::test]
    fn test_compile_exclude_arguments_adds_relative_forms() {
        let excluded = vec![PathBuf::from("/repo/build"), PathBuf::from("/elsewhere/tmp")];
        let arguments = compile_exclude_arguments(&excluded, Path::new("/repo"));
        assert_eq!(
            arguments.into_iter().collect::<Vec<_>>(),
            vec!["/elsewhere/tmp", "/repo/build", "build"]
        );

        let arguments = compile_exclude_arguments(&[PathBuf::from("/repo")], Path::new("/repo"));
        assert_eq!(arguments.into_iter().collect::<Vec<_>>(), vec![".", "/repo"]);
    }

    #[test_log::test]
    fn test_normalize_requirement() {
        assert_eq!(normalize_requirement(" src\\app/ "), vec!["src", "app"]);
        assert!(normalize_requirement("  ").is_empty());
    }

    #[test_log::test]
    fn test_candidate_parts_relative_to_root() {
        let root = Path::new("/repo");
        assert_eq!(
            candidate_parts(Path::new("/repo/src/app/main.lua"), root),
            vec!["src", "app", "main.lua"]
        );
        assert_eq!(
            candidate_parts(Path::new("./src/main.lua"), root),
            vec!["src", "main.lua"]
        );
        assert_eq!(
            candidate_parts(Path::new("/other/x.lua"), root),
            vec!["other", "x.lua"]
        );
    }

    #[test_log::test]
    fn test_has_segment_sequence_requires_contiguous_run() {
        let parts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert!(has_segment_sequence(&parts, &["b".to_string(), "c".to_string()]));
        assert!(!has_segment_sequence(&parts, &["a".to_string(), "c".to_string()]));
        assert!(!has_segment_sequence(
            &parts[..1],
            &["a".to_string(), "b".to_string()]
        ));
    }

    #[test_log::test]
    fn test_resolver_caches_are_consistent_with_helpers() {
        let resolver = PathResolver::new(8);
        let root = Path::new("/repo");

        assert_eq!(resolver.capacity(), 8);
        assert_eq!(resolver.resolve(root, "src"), resolve_path(root, "src"));
        assert_eq!(resolver.resolve(root, "src"), PathBuf::from("/repo/src"));
        let requirements: Vec<Arc<[String]>> = vec![normalize_requirement("src/app").into()];
        assert!(resolver.matches_requirements(
            Path::new("/repo/src/app/init.lua"),
            root,
            &requirements
        ));
        assert!(!resolver.matches_requirements(
            Path::new("/repo/src/lib/init.lua"),
            root,
            &requirements
        ));
        assert!(resolver.matches_requirements(Path::new("/repo/x"), root, &[]));
    }
}
