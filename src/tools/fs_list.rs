use crate::{
    config::MAX_LIST_ENTRIES,
    errors::{ErrorCode, IoContext, ToolError, ToolResult},
    mcp::registry::Tool,
    runtime::{join_relative, ToolRuntime},
    tools::{parse_params, root_dir, to_payload, within, EntryKind},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::VecDeque, ffi::OsString, path::Path, sync::Arc};
use tokio::fs;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ListRequest {
    #[serde(default = "root_dir")]
    pub dir: String,
    #[serde(default)]
    pub recursive: bool,
    pub max_entries: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub dir: String,
    pub entries: Vec<ListEntry>,
    pub truncated: bool,
}

impl ToolRuntime {
    /// Lists `dir`, breadth-first when recursive, stopping at `maxEntries`.
    pub async fn list_dir(&self, req: ListRequest) -> ToolResult<ListResult> {
        let max = within(
            "maxEntries",
            req.max_entries,
            self.limits().default_list_entries,
            1,
            MAX_LIST_ENTRIES,
        )?;
        let target = self.resolve(&req.dir, true)?;
        let meta = fs::metadata(&target.absolute).await.for_path(&target.relative)?;
        if !meta.is_dir() {
            return Err(ToolError::new(
                ErrorCode::NotDirectory,
                format!("not a directory: {}", target.relative),
            ));
        }

        let mut entries = Vec::new();
        let mut truncated = false;
        let mut queue = VecDeque::from([(target.absolute.clone(), target.relative.clone())]);
        'walk: while let Some((dir_abs, dir_rel)) = queue.pop_front() {
            let children = match read_sorted(&dir_abs).await {
                Ok(c) => c,
                Err(e) if dir_rel == target.relative => return Err(ToolError::from_io(e, &dir_rel)),
                Err(e) => {
                    debug!(dir = %dir_rel, error = %e, "skipping unreadable directory");
                    continue;
                }
            };
            for (name, meta) in children {
                if entries.len() == max {
                    truncated = true;
                    break 'walk;
                }
                let path = join_relative(&dir_rel, &name.to_string_lossy());
                let kind = EntryKind::from(meta.file_type());
                if req.recursive && kind == EntryKind::Dir {
                    queue.push_back((dir_abs.join(&name), path.clone()));
                }
                entries.push(ListEntry { path, kind, size: meta.len() });
            }
        }

        Ok(ListResult { dir: target.relative, entries, truncated })
    }
}

/// Entries of one directory with their (non-followed) metadata, by name.
async fn read_sorted(dir: &Path) -> std::io::Result<Vec<(OsString, std::fs::Metadata)>> {
    let mut out = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        match entry.metadata().await {
            Ok(meta) => out.push((entry.file_name(), meta)),
            // removed while we were looking
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e),
        }
    }
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(out)
}

pub struct ListDirTool {
    runtime: Arc<ToolRuntime>,
}

impl ListDirTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &'static str { "list_dir" }

    fn description(&self) -> &'static str {
        "List a workspace directory. Recursive listings are breadth-first and stop at maxEntries."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"properties":{
            "dir":{"type":"string","default":"."},
            "recursive":{"type":"boolean","default":false},
            "maxEntries":{"type":"integer","minimum":1,"maximum":MAX_LIST_ENTRIES}
        }})
    }

    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: ListRequest = parse_params(params)?;
        to_payload(self.runtime.list_dir(req).await?)
    }
}
