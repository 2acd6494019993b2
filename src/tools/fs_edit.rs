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
pub struct EditRequest {
    pub file: String,
    pub find: String,
    pub replace: String,
    #[serde(default)]
    pub replace_all: bool,
    pub expected_occurrences: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EditResult {
    pub file: String,
    pub replacements: usize,
}

impl ToolRuntime {
    /// Literal find-and-replace. The file is only rewritten when every check
    /// passes.
    pub async fn edit_file(&self, req: EditRequest) -> ToolResult<EditResult> {
        if req.find.is_empty() {
            return Err(ToolError::validation("find must not be empty"));
        }
        if req.expected_occurrences == Some(0) {
            return Err(ToolError::validation("expectedOccurrences must be at least 1"));
        }
        let target = self.resolve(&req.file, false)?;
        let meta = fs::metadata(&target.absolute).await.for_path(&target.relative)?;
        if !meta.is_file() {
            return Err(ToolError::new(ErrorCode::NotFile, format!("not a file: {}", target.relative)));
        }
        if meta.len() > MAX_FILE_BYTES {
            return Err(ToolError::file_too_large(&target.relative, meta.len(), MAX_FILE_BYTES));
        }

        let data = fs::read(&target.absolute).await.for_path(&target.relative)?;
        let content = String::from_utf8(data).map_err(|_| {
            ToolError::validation(format!("{} is not valid UTF-8 text", target.relative))
        })?;

        let occurrences = content.matches(req.find.as_str()).count();
        if occurrences == 0 {
            return Err(ToolError::new(
                ErrorCode::PatternNotFound,
                format!("search text not found in {}", target.relative),
            ));
        }
        if let Some(expected) = req.expected_occurrences {
            if expected != occurrences {
                return Err(ToolError::new(
                    ErrorCode::EditConflict,
                    format!(
                        "expected {expected} occurrence(s) in {}, found {occurrences}",
                        target.relative
                    ),
                )
                .with_details(json!({ "occurrences": occurrences, "expectedOccurrences": expected })));
            }
        }

        let (updated, replacements) = if req.replace_all {
            (content.replace(req.find.as_str(), &req.replace), occurrences)
        } else {
            (content.replacen(req.find.as_str(), &req.replace, 1), 1)
        };
        let size = updated.len() as u64;
        if size > MAX_FILE_BYTES {
            return Err(ToolError::file_too_large(&target.relative, size, MAX_FILE_BYTES));
        }
        fs::write(&target.absolute, updated.as_bytes()).await.for_path(&target.relative)?;
        Ok(EditResult { file: target.relative, replacements })
    }
}

pub struct EditFileTool {
    runtime: Arc<ToolRuntime>,
}

impl EditFileTool {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self { Self { runtime } }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str { "edit_file" }

    fn description(&self) -> &'static str {
        "Replace literal text in a file. Replaces the first match unless replaceAll is set; \
         expectedOccurrences guards against ambiguous matches."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({"type":"object","additionalProperties":false,"required":["file","find","replace"],"properties":{
            "file":{"type":"string"},
            "find":{"type":"string","minLength":1},
            "replace":{"type":"string"},
            "replaceAll":{"type":"boolean","default":false},
            "expectedOccurrences":{"type":"integer","minimum":1}
        }})
    }

    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value> {
        let req: EditRequest = parse_params(params)?;
        to_payload(self.runtime.edit_file(req).await?)
    }
}
