use crate::{
    config::{self, Limits},
    errors::{ErrorCode, ToolError, ToolResult},
    sandbox::{self, ResolvedPath},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

/// Programs `run_command` may start. Matched by exact name, never by path.
pub const ALLOWED_COMMANDS: &[&str] = &["node", "npm", "npx", "python3", "git"];

/// Operation facade bound to a single workspace root.
///
/// Holds no per-call state; share it behind an `Arc`. The operations
/// themselves live next to their tool adapters in `crate::tools`.
#[derive(Debug)]
pub struct ToolRuntime {
    root: PathBuf,
    limits: Limits,
    allowlist: &'static [&'static str],
}

impl ToolRuntime {
    /// Creates the workspace root if it does not exist yet.
    pub fn new(root: &Path, limits: Limits) -> anyhow::Result<Self> {
        let root = config::prepare_root(root)?;
        info!(root = %root.display(), "workspace ready");
        Ok(Self { root, limits, allowlist: ALLOWED_COMMANDS })
    }

    #[cfg(test)]
    pub(crate) fn with_allowlist(mut self, allowlist: &'static [&'static str]) -> Self {
        self.allowlist = allowlist;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn allowlist(&self) -> &'static [&'static str] {
        self.allowlist
    }

    pub(crate) fn resolve(&self, raw: &str, allow_root: bool) -> ToolResult<ResolvedPath> {
        sandbox::resolve(&self.root, raw, allow_root)
    }

    /// Creates the missing ancestors of `target`.
    pub(crate) async fn ensure_parent(&self, target: &ResolvedPath) -> ToolResult<()> {
        let Some(parent) = target.absolute.parent() else { return Ok(()) };
        let parent_rel = parent_relative(&target.relative);
        match fs::create_dir_all(parent).await {
            Ok(()) => Ok(()),
            // create_dir_all reports a file in the way as AlreadyExists
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(ToolError::new(
                ErrorCode::NotDirectory,
                format!("parent is not a directory: {parent_rel}"),
            )),
            Err(e) => Err(ToolError::from_io(e, parent_rel)),
        }
    }
}

/// Workspace-relative parent of a normalized path.
pub(crate) fn parent_relative(relative: &str) -> &str {
    relative.rsplit_once('/').map(|(parent, _)| parent).unwrap_or(sandbox::ROOT)
}

/// Workspace-relative path of `name` inside `dir`.
pub(crate) fn join_relative(dir: &str, name: &str) -> String {
    if dir == sandbox::ROOT {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_helpers() {
        assert_eq!(parent_relative("a/b/c.txt"), "a/b");
        assert_eq!(parent_relative("c.txt"), ".");
        assert_eq!(join_relative(".", "x"), "x");
        assert_eq!(join_relative("a/b", "x"), "a/b/x");
    }

    #[test]
    fn new_creates_root_once() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("ws");
        let rt = ToolRuntime::new(&root, Limits::default()).unwrap();
        assert!(rt.root().is_dir());
        assert_eq!(rt.allowlist(), ALLOWED_COMMANDS);
        // a second runtime over the same root is fine
        ToolRuntime::new(&root, Limits::default()).unwrap();
    }

    #[test]
    fn resolve_is_anchored_at_canonical_root() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = ToolRuntime::new(tmp.path(), Limits::default()).unwrap();
        let p = rt.resolve("workspace/a/b", false).unwrap();
        assert!(p.absolute.starts_with(rt.root()));
        assert_eq!(p.relative, "a/b");
    }
}
