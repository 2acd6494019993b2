use crate::{
    config::MAX_FILE_BYTES,
    errors::{ErrorCode, IoContext, ToolError, ToolResult},
    mcp::registry::Tool,
    runtime::ToolRuntime,
    tools::{parse_params, to_payload},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct WriteRequest {
    pub file: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteResult {
    pub file: String,
    pub bytes_written: u64,
}

impl ToolRuntime {
    /// Writes `content`, creating parent directories and replacing any
    /// existing file.
    pub async fn write_file(&self, req: WriteRequest) -> ToolResult<WriteResult> {
        let target = self.resolve(&req.file, false)?;
        let size = req.content.len() as u64;
        if size > MAX_FILE_BYTES {
            return Err(ToolError::file_too_large(&target.relative, size, MAX_FILE_BYTES));
        }
        if let Ok(meta) = fs::metadata(&target.absolute).await {
            if meta.is_dir() {
                return Err(ToolError::new(
                    ErrorCode::NotFile,
                    format!("is a directory, not a file: {}", target.relative),
                ));
            }
        }
        self.ensure_parent(&target).await?;
        fs::write(&target.absolute, req.content.as_bytes()).await.for_path(&target.relative)?;
        Ok(WriteResult { file: target.relative, bytes_written: size })
    }
}

pub struct WriteFileTool {
    runtime: Arc<ToolRuntime>,
}

impl WriteFileTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &'static str {
        "write_file"
    }

    fn description(&self) -> &'static str {
        "Create or overwrite a text file. Missing parent directories are created."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["file","content"],"properties":{
            "file":{"type":"string"},
            "content":{"type":"string"}
        }})
    }

    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: WriteRequest = parse_params(params)?;
        to_payload(self.runtime.write_file(req).await?)
    }
}
