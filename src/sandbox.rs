//! Workspace path confinement.
//!
//! Every caller-supplied path goes through [`resolve`] before it reaches a
//! syscall. Normalization is purely lexical: it never touches the
//! filesystem, so it behaves the same for paths that do not exist yet.

use crate::errors::{ToolError, ToolResult};
use std::path::{Path, PathBuf};

/// Normalized form of the workspace root itself.
pub const ROOT: &str = ".";

const ROOT_ALIAS: &str = "workspace";
const ROOT_ALIAS_PREFIX: &str = "workspace/";

/// A path argument in both of its forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Normalized workspace-relative form, reported back to callers.
    pub relative: String,
    /// Absolute form under the workspace root, used for syscalls.
    pub absolute: PathBuf,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool {
        self.relative == ROOT
    }
}

/// Turns a raw caller string into a workspace-relative path.
///
/// Fails with `InvalidPath` for empty input, absolute POSIX or Windows paths,
/// NUL bytes and `..` segments. A bare reference to the root (`.`, `./`,
/// `workspace`) is only accepted when `allow_root` is set.
pub fn normalize(raw: &str, allow_root: bool) -> ToolResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::invalid_path("path must not be empty"));
    }
    if trimmed.contains('\0') {
        return Err(ToolError::invalid_path("path must not contain NUL bytes"));
    }
    if is_absolute(trimmed) {
        return Err(ToolError::invalid_path(format!(
            "absolute paths are not allowed: {trimmed}"
        )));
    }

    let unified = trimmed.replace('\\', "/");
    let mut rest = unified.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    // Callers often repeat the root's own name, sometimes more than once.
    while let Some(stripped) = strip_root_alias(rest) {
        rest = stripped;
    }
    if rest.eq_ignore_ascii_case(ROOT_ALIAS) {
        rest = "";
    }

    let segments: Vec<&str> = rest
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    if segments.iter().any(|s| *s == "..") {
        return Err(ToolError::invalid_path(format!(
            "parent directory segments are not allowed: {trimmed}"
        )));
    }

    if segments.is_empty() {
        if !allow_root {
            return Err(ToolError::invalid_path(
                "path refers to the workspace root; a file or directory inside it is required",
            ));
        }
        return Ok(ROOT.to_string());
    }
    Ok(segments.join("/"))
}

/// Normalizes `raw` and anchors it under `root`.
///
/// The prefix check on the joined path is independent of the segment checks
/// in [`normalize`].
pub fn resolve(root: &Path, raw: &str, allow_root: bool) -> ToolResult<ResolvedPath> {
    let relative = normalize(raw, allow_root)?;
    let absolute = if relative == ROOT {
        root.to_path_buf()
    } else {
        relative.split('/').fold(root.to_path_buf(), |acc, seg| acc.join(seg))
    };
    if !is_within(root, &absolute) {
        return Err(ToolError::invalid_path(format!(
            "path escapes the workspace: {relative}"
        )));
    }
    Ok(ResolvedPath { relative, absolute })
}

/// True when `candidate` is `root` or a strict descendant of it.
pub fn is_within(root: &Path, candidate: &Path) -> bool {
    use std::path::Component;
    if candidate
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return false;
    }
    candidate == root || candidate.starts_with(root)
}

fn strip_root_alias(s: &str) -> Option<&str> {
    let head = s.get(..ROOT_ALIAS_PREFIX.len())?;
    if head.eq_ignore_ascii_case(ROOT_ALIAS_PREFIX) {
        s.get(ROOT_ALIAS_PREFIX.len()..)
    } else {
        None
    }
}

fn is_absolute(s: &str) -> bool {
    // `/x`, `\x`, `\\server\share`
    if s.starts_with('/') || s.starts_with('\\') {
        return true;
    }
    // `C:`, `C:\x`, `C:/x`
    let mut chars = s.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn code(raw: &str, allow_root: bool) -> ErrorCode {
        normalize(raw, allow_root).unwrap_err().code
    }

    #[test]
    fn strips_repeated_root_alias() {
        assert_eq!(normalize("workspace/workspace/test.txt", false).unwrap(), "test.txt");
        assert_eq!(normalize("test.txt", false).unwrap(), "test.txt");
        assert_eq!(normalize("./workspace/src/index.html", false).unwrap(), "src/index.html");
        assert_eq!(normalize("WorkSpace/Workspace/a", false).unwrap(), "a");
    }

    #[test]
    fn alias_only_means_root() {
        assert_eq!(normalize("workspace", true).unwrap(), ROOT);
        assert_eq!(normalize("workspace/", true).unwrap(), ROOT);
        assert_eq!(normalize("./WORKSPACE", true).unwrap(), ROOT);
        assert_eq!(code("workspace", false), ErrorCode::InvalidPath);
    }

    #[test]
    fn alias_must_be_a_whole_segment() {
        assert_eq!(normalize("workspaces/a", false).unwrap(), "workspaces/a");
        assert_eq!(normalize("src/workspace/a", false).unwrap(), "src/workspace/a");
    }

    #[test]
    fn collapses_separators_and_dots() {
        assert_eq!(normalize("  a//b/./c/  ", false).unwrap(), "a/b/c");
        assert_eq!(normalize("a\\b\\c.txt", false).unwrap(), "a/b/c.txt");
        assert_eq!(normalize("././a", false).unwrap(), "a");
        assert_eq!(normalize("a/ b /c", false).unwrap(), "a/b/c");
    }

    #[test]
    fn root_needs_permission() {
        for raw in [".", "./", "./.", " . ", ".//."] {
            assert_eq!(normalize(raw, true).unwrap(), ROOT);
            assert_eq!(code(raw, false), ErrorCode::InvalidPath);
        }
    }

    #[test]
    fn rejects_bad_input() {
        for raw in ["", "   ", "a/\0b", "/etc/passwd", "\\\\server\\share", "\\x", "C:\\x", "c:/x", "C:"] {
            assert_eq!(code(raw, true), ErrorCode::InvalidPath, "{raw:?}");
        }
    }

    #[test]
    fn rejects_parent_segments_anywhere() {
        for raw in ["..", "../x", "a/../b", "a/..", "a\\..\\b", "workspace/../x", "a/ .. /b"] {
            assert_eq!(code(raw, true), ErrorCode::InvalidPath, "{raw:?}");
        }
        assert_eq!(normalize("a/..b/c..", false).unwrap(), "a/..b/c..");
    }

    #[test]
    fn resolve_anchors_under_root() {
        let root = Path::new("/srv/ws");
        let r = resolve(root, "workspace/src/main.rs", false).unwrap();
        assert_eq!(r.relative, "src/main.rs");
        assert_eq!(r.absolute, PathBuf::from("/srv/ws/src/main.rs"));

        let r = resolve(root, ".", true).unwrap();
        assert!(r.is_root());
        assert_eq!(r.absolute, root);
    }

    #[test]
    fn prefix_check_is_component_wise() {
        let root = Path::new("/srv/ws");
        assert!(is_within(root, Path::new("/srv/ws")));
        assert!(is_within(root, Path::new("/srv/ws/a")));
        assert!(!is_within(root, Path::new("/srv/ws2/a")));
        assert!(!is_within(root, Path::new("/srv/ws/../x")));
        assert!(!is_within(root, Path::new("/srv")));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn segment() -> impl Strategy<Value = String> {
            "[a-zA-Z0-9_.-]{1,8}".prop_filter("plain segment", |s| s != "." && s != "..")
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn any_parent_segment_is_rejected(
                segs in prop::collection::vec(segment(), 0..6),
                at in 0usize..6,
                backslash in any::<bool>(),
            ) {
                let mut segs = segs;
                let at = at.min(segs.len());
                segs.insert(at, "..".to_string());
                let sep = if backslash { "\\" } else { "/" };
                let raw = segs.join(sep);
                let err = normalize(&raw, true).unwrap_err();
                prop_assert_eq!(err.code, ErrorCode::InvalidPath);
            }

            #[test]
            fn resolved_paths_stay_under_root(raw in "\\PC{0,40}") {
                let root = Path::new("/srv/ws");
                if let Ok(r) = resolve(root, &raw, true) {
                    prop_assert!(r.absolute == root || r.absolute.starts_with(root));
                    prop_assert!(!r.relative.split('/').any(|s| s == ".."));
                    prop_assert!(!r.relative.starts_with('/'));
                }
            }

            #[test]
            fn clean_relative_paths_are_preserved(segs in prop::collection::vec(segment(), 1..6)) {
                let raw = segs.join("/");
                prop_assume!(!raw.to_ascii_lowercase().starts_with("workspace"));
                let normalized = normalize(&raw, false).unwrap();
                prop_assert_eq!(normalized, raw);
            }
        }
    }
}
