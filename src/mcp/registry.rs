use crate::{
    errors::ToolResult,
    mcp::types::ToolInfo,
    runtime::ToolRuntime,
    tools::{
        exec::RunCommandTool, fs_delete::DeletePathTool, fs_edit::EditFileTool,
        fs_list::ListDirTool, fs_mkdir::MakeDirTool, fs_move::MovePathTool,
        fs_read::ReadFileTool, fs_write::WriteFileTool,
    },
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub type DynTool = Arc<dyn Tool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ToolRegistry {
    tools: Vec<(String, DynTool)>,
}

impl ToolRegistry {
    pub fn new(runtime: Arc<ToolRuntime>) -> Self {
        let all: Vec<DynTool> = vec![
            Arc::new(ListDirTool::new(runtime.clone())),
            Arc::new(ReadFileTool::new(runtime.clone())),
            Arc::new(WriteFileTool::new(runtime.clone())),
            Arc::new(EditFileTool::new(runtime.clone())),
            Arc::new(DeletePathTool::new(runtime.clone())),
            Arc::new(MovePathTool::new(runtime.clone())),
            Arc::new(MakeDirTool::new(runtime.clone())),
            Arc::new(RunCommandTool::new(runtime)),
        ];
        let mut tools: Vec<(String, DynTool)> =
            all.into_iter().map(|t| (t.name().to_string(), t)).collect();
        tools.sort_by(|a, b| a.0.cmp(&b.0));
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<DynTool> { self.tools.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone()) }
    pub fn list_names(&self) -> Vec<String> { self.tools.iter().map(|(n, _)| n.clone()).collect() }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|(name, t)| ToolInfo {
                name: name.clone(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub id: serde_json::Value,
    pub tool: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One callable operation. Implementations parse `params` into a typed
/// request and delegate to [`ToolRuntime`].
#[async_trait]
pub trait Tool {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> serde_json::Value;
    async fn call(&self, params: serde_json::Value) -> ToolResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;

    #[test]
    fn registry_lists_every_operation_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        let rt = Arc::new(ToolRuntime::new(tmp.path(), Limits::default()).unwrap());
        let reg = ToolRegistry::new(rt);
        assert_eq!(
            reg.list_names(),
            vec![
                "delete_path", "edit_file", "list_dir", "make_dir", "move_path", "read_file",
                "run_command", "write_file",
            ]
        );
        for info in reg.infos() {
            assert_eq!(info.input_schema["type"], "object", "{}", info.name);
            assert_eq!(info.input_schema["additionalProperties"], false, "{}", info.name);
        }
        assert!(reg.get("exec").is_none());
    }
}
