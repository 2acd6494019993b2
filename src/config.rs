use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Largest file any operation will read, write or produce.
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;
pub const DEFAULT_READ_BYTES: u64 = 256 * 1024;
pub const MAX_OUTPUT_BYTES: usize = 256 * 1024;
pub const DEFAULT_OUTPUT_BYTES: usize = 64 * 1024;
pub const MAX_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const MAX_LIST_ENTRIES: usize = 2000;
pub const DEFAULT_LIST_ENTRIES: usize = 200;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub workspace: Workspace,
    pub server: Server,
    pub auth: Auth,
    #[serde(default)]
    pub limits: Limits,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Workspace { pub root: PathBuf }

#[derive(Debug, Deserialize, Clone)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
    #[serde(default = "default_base_path")]
    pub base_path: String,
}
fn default_base_path() -> String { "/mcp".to_string() }

#[derive(Debug, Deserialize, Clone)]
pub struct Auth {
    pub bearer_token: String,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Operator defaults applied when a caller leaves a knob unset. Each one is
/// bounded by the compiled-in ceiling above.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    pub max_request_kb: usize,
    pub default_read_bytes: u64,
    pub default_timeout_ms: u64,
    pub default_output_bytes: usize,
    pub default_list_entries: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            // a full-size write plus JSON escaping overhead
            max_request_kb: 4096,
            default_read_bytes: DEFAULT_READ_BYTES,
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            default_output_bytes: DEFAULT_OUTPUT_BYTES,
            default_list_entries: DEFAULT_LIST_ENTRIES,
        }
    }
}

impl Limits {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        if !(1..=MAX_FILE_BYTES).contains(&self.default_read_bytes) {
            anyhow::bail!("default_read_bytes must be within 1..={MAX_FILE_BYTES}");
        }
        if !(1..=MAX_TIMEOUT_MS).contains(&self.default_timeout_ms) {
            anyhow::bail!("default_timeout_ms must be within 1..={MAX_TIMEOUT_MS}");
        }
        if !(1..=MAX_OUTPUT_BYTES).contains(&self.default_output_bytes) {
            anyhow::bail!("default_output_bytes must be within 1..={MAX_OUTPUT_BYTES}");
        }
        if !(1..=MAX_LIST_ENTRIES).contains(&self.default_list_entries) {
            anyhow::bail!("default_list_entries must be within 1..={MAX_LIST_ENTRIES}");
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace.root.as_os_str().is_empty() { anyhow::bail!("workspace.root must not be empty"); }
        if self.auth.bearer_token.trim().is_empty() { anyhow::bail!("bearer_token must not be empty"); }
        self.limits.validate()
    }
}

/// Creates the workspace root if needed and returns its canonical form.
pub fn prepare_root(root: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(root)?;
    let c = dunce::canonicalize(root)?;
    if !c.is_dir() {
        anyhow::bail!("workspace root is not a directory: {}", c.display());
    }
    Ok(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [workspace]
        root = "./ws"

        [server]
        bind_addr = "127.0.0.1"
        port = 8787

        [auth]
        bearer_token = "secret"

        [limits]
        default_timeout_ms = 5000
    "#;

    #[test]
    fn toml_fills_defaults() {
        let cfg: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(cfg.server.base_path, "/mcp");
        assert!(cfg.auth.allowed_origins.is_empty());
        assert_eq!(cfg.limits.default_timeout_ms, 5000);
        assert_eq!(cfg.limits.default_list_entries, DEFAULT_LIST_ENTRIES);
        cfg.validate().unwrap();
    }

    #[test]
    fn load_picks_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workcell.json");
        fs::write(
            &path,
            r#"{"workspace":{"root":"ws"},"server":{"bind_addr":"0.0.0.0","port":1},"auth":{"bearer_token":"t"}}"#,
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.limits, Limits::default());
    }

    #[test]
    fn defaults_above_ceilings_are_rejected() {
        let mut cfg: Config = toml::from_str(SAMPLE).unwrap();
        cfg.limits.default_timeout_ms = MAX_TIMEOUT_MS + 1;
        assert!(cfg.validate().is_err());

        let mut cfg: Config = toml::from_str(SAMPLE).unwrap();
        cfg.limits.default_output_bytes = 0;
        assert!(cfg.validate().is_err());

        let mut cfg: Config = toml::from_str(SAMPLE).unwrap();
        cfg.auth.bearer_token = "  ".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn prepare_root_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("ws");
        let canon = prepare_root(&root).unwrap();
        assert!(canon.is_dir());
        assert!(canon.is_absolute());
    }
}
