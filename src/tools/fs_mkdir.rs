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

fn default_recursive() -> bool { true }

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct MkdirRequest {
    pub dir: String,
    #[serde(default = "default_recursive")]
    pub recursive: bool,
}

#[derive(Debug, Serialize)]
pub struct MkdirResult {
    pub dir: String,
    pub created: bool,
}

impl ToolRuntime {
    /// Recursive creation is idempotent; non-recursive creation of an
    /// existing directory fails with `AlreadyExists`.
    pub async fn make_dir(&self, req: MkdirRequest) -> ToolResult<MkdirResult> {
        let target = self.resolve(&req.dir, true)?;
        if target.is_root() {
            if req.recursive {
                return Ok(MkdirResult { dir: target.relative, created: false });
            }
            return Err(ToolError::new(ErrorCode::AlreadyExists, "the workspace root already exists"));
        }
        match fs::metadata(&target.absolute).await {
            Ok(meta) if meta.is_dir() && req.recursive => {
                return Ok(MkdirResult { dir: target.relative, created: false });
            }
            Ok(meta) if meta.is_dir() => {
                return Err(ToolError::new(
                    ErrorCode::AlreadyExists,
                    format!("directory already exists: {}", target.relative),
                ));
            }
            Ok(_) => {
                return Err(ToolError::new(
                    ErrorCode::AlreadyExists,
                    format!("exists and is not a directory: {}", target.relative),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ToolError::from_io(e, &target.relative)),
        }

        if req.recursive {
            fs::create_dir_all(&target.absolute).await
        } else {
            fs::create_dir(&target.absolute).await
        }
        .for_path(&target.relative)?;
        Ok(MkdirResult { dir: target.relative, created: true })
    }
}

pub struct MakeDirTool {
    runtime: Arc<ToolRuntime>,
}

impl MakeDirTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for MakeDirTool {
    fn name(&self) -> &'static str { "make_dir" }
    fn description(&self) -> &'static str { "Create a directory (and, by default, its parents)." }
    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["dir"],"properties":{
            "dir":{"type":"string"},
            "recursive":{"type":"boolean","default":true}
        }})
    }
    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: MkdirRequest = parse_params(params)?;
        to_payload(self.runtime.make_dir(req).await?)
    }
}
