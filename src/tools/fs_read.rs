use crate::{
    config::MAX_FILE_BYTES,
    errors::{ErrorCode, IoContext, ToolError, ToolResult},
    mcp::registry::Tool,
    runtime::ToolRuntime,
    tools::{parse_params, to_payload, within},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::fs;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReadRequest {
    pub file: String,
    pub max_bytes: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReadResult {
    pub file: String,
    pub content: String,
    pub bytes: u64,
}

impl ToolRuntime {
    pub async fn read_file(&self, req: ReadRequest) -> ToolResult<ReadResult> {
        let limit = within("maxBytes", req.max_bytes, self.limits().default_read_bytes, 1, MAX_FILE_BYTES)?;
        let target = self.resolve(&req.file, false)?;
        let meta = fs::metadata(&target.absolute).await.for_path(&target.relative)?;
        if !meta.is_file() {
            return Err(ToolError::new(ErrorCode::NotFile, format!("not a file: {}", target.relative)));
        }
        if meta.len() > limit {
            return Err(ToolError::file_too_large(&target.relative, meta.len(), limit));
        }
        let data = fs::read(&target.absolute).await.for_path(&target.relative)?;
        // the file may have grown since the stat
        let bytes = data.len() as u64;
        if bytes > limit {
            return Err(ToolError::file_too_large(&target.relative, bytes, limit));
        }
        let content = match String::from_utf8(data) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        };
        Ok(ReadResult { file: target.relative, content, bytes })
    }
}

pub struct ReadFileTool {
    runtime: Arc<ToolRuntime>,
}

impl ReadFileTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &'static str { "read_file" }
    fn description(&self) -> &'static str { "Read a UTF-8 text file from the workspace." }
    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["file"],"properties":{
            "file":{"type":"string"},
            "maxBytes":{"type":"integer","minimum":1,"maximum":MAX_FILE_BYTES}
        }})
    }
    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: ReadRequest = parse_params(params)?;
        to_payload(self.runtime.read_file(req).await?)
    }
}
