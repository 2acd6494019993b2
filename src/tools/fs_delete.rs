use crate::{
    errors::{IoContext, ToolResult},
    mcp::registry::Tool,
    runtime::ToolRuntime,
    tools::{parse_params, to_payload, EntryKind},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct DeleteRequest {
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ToolRuntime {
    /// Removes a file, symlink or directory. Non-empty directories need
    /// `recursive`; symlinks are unlinked, never followed.
    pub async fn delete_path(&self, req: DeleteRequest) -> ToolResult<DeleteResult> {
        let target = self.resolve(&req.path, false)?;
        let meta = fs::symlink_metadata(&target.absolute).await.for_path(&target.relative)?;
        let kind = EntryKind::from(meta.file_type());
        match kind {
            EntryKind::Dir if req.recursive => fs::remove_dir_all(&target.absolute).await,
            EntryKind::Dir => fs::remove_dir(&target.absolute).await,
            EntryKind::File | EntryKind::Symlink => fs::remove_file(&target.absolute).await,
        }
        .for_path(&target.relative)?;
        Ok(DeleteResult { path: target.relative, kind })
    }
}

pub struct DeletePathTool {
    runtime: Arc<ToolRuntime>,
}

impl DeletePathTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for DeletePathTool {
    fn name(&self) -> &'static str { "delete_path" }
    fn description(&self) -> &'static str {
        "Delete a file or directory. Non-empty directories require recursive=true."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["path"],"properties":{
            "path":{"type":"string"},
            "recursive":{"type":"boolean","default":false}
        }})
    }
    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: DeleteRequest = parse_params(params)?;
        to_payload(self.runtime.delete_path(req).await?)
    }
}
