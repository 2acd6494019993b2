use crate::{
    errors::{ErrorCode, IoContext, ToolError, ToolResult},
    mcp::registry::Tool,
    runtime::ToolRuntime,
    tools::{parse_params, to_payload},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{io, sync::Arc};
use tokio::fs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MoveRequest {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Serialize)]
pub struct MoveResult {
    pub from: String,
    pub to: String,
    pub overwritten: bool,
}

impl ToolRuntime {
    pub async fn move_path(&self, req: MoveRequest) -> ToolResult<MoveResult> {
        let src = self.resolve(&req.from, false)?;
        let dst = self.resolve(&req.to, false)?;
        if src.relative == dst.relative {
            return Err(ToolError::validation("source and destination are the same path"));
        }
        if is_ancestor(&src.relative, &dst.relative) {
            return Err(ToolError::validation(format!(
                "cannot move {} into itself ({})",
                src.relative, dst.relative
            )));
        }
        if is_ancestor(&dst.relative, &src.relative) {
            return Err(ToolError::validation(format!(
                "destination {} contains the source {}",
                dst.relative, src.relative
            )));
        }

        fs::symlink_metadata(&src.absolute).await.for_path(&src.relative)?;
        let overwritten = match fs::symlink_metadata(&dst.absolute).await {
            Ok(_) if !req.overwrite => {
                return Err(ToolError::new(
                    ErrorCode::AlreadyExists,
                    format!("destination exists: {} (set overwrite to replace it)", dst.relative),
                ))
            }
            Ok(meta) => {
                if meta.is_dir() {
                    fs::remove_dir_all(&dst.absolute).await
                } else {
                    fs::remove_file(&dst.absolute).await
                }
                .for_path(&dst.relative)?;
                true
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(ToolError::from_io(e, &dst.relative)),
        };

        self.ensure_parent(&dst).await?;
        fs::rename(&src.absolute, &dst.absolute).await.for_path(&src.relative)?;
        Ok(MoveResult { from: src.relative, to: dst.relative, overwritten })
    }
}

fn is_ancestor(ancestor: &str, path: &str) -> bool {
    path.strip_prefix(ancestor).map(|rest| rest.starts_with('/')).unwrap_or(false)
}

pub struct MovePathTool {
    runtime: Arc<ToolRuntime>,
}

impl MovePathTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for MovePathTool {
    fn name(&self) -> &'static str { "move_path" }
    fn description(&self) -> &'static str {
        "Move or rename a file or directory. An existing destination is only replaced with overwrite=true."
    }
    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["from","to"],"properties":{
            "from":{"type":"string"},
            "to":{"type":"string"},
            "overwrite":{"type":"boolean","default":false}
        }})
    }
    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: MoveRequest = parse_params(params)?;
        to_payload(self.runtime.move_path(req).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::is_ancestor;

    #[test]
    fn ancestry_is_segment_wise() {
        assert!(is_ancestor("a", "a/b"));
        assert!(is_ancestor("a/b", "a/b/c/d"));
        assert!(!is_ancestor("a", "ab/c"));
        assert!(!is_ancestor("a/b", "a"));
        assert!(!is_ancestor("a", "a"));
    }
}
