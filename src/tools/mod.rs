pub mod collector;
pub mod exec;
pub mod fs_delete;
pub mod fs_edit;
pub mod fs_list;
pub mod fs_mkdir;
pub mod fs_move;
pub mod fs_read;
pub mod fs_write;

use crate::errors::{ToolError, ToolResult};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Display;

/// Kind of a filesystem entry as reported to callers. Symlinks are never
/// followed to decide the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
}

impl From<std::fs::FileType> for EntryKind {
    fn from(ft: std::fs::FileType) -> Self {
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        }
    }
}

/// Deserializes tool params into their typed request.
///
/// Missing fields, wrong types and unknown fields all become `ValidationError`.
pub fn parse_params<T: DeserializeOwned>(params: serde_json::Value) -> ToolResult<T> {
    let params = if params.is_null() { serde_json::json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| ToolError::validation(format!("invalid params: {e}")))
}

pub fn to_payload<T: Serialize>(value: T) -> ToolResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| ToolError::internal(format!("encoding result: {e}")))
}

/// Applies `default` when unset and checks the result against `min..=max`.
pub fn within<T>(name: &str, value: Option<T>, default: T, min: T, max: T) -> ToolResult<T>
where
    T: PartialOrd + Display + Copy,
{
    let v = value.unwrap_or(default);
    if v < min || v > max {
        return Err(ToolError::validation(format!("{name} must be within {min}..={max}, got {v}")));
    }
    Ok(v)
}

pub(crate) fn root_dir() -> String {
    crate::sandbox::ROOT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields, rename_all = "camelCase")]
    struct Probe {
        file: String,
        #[serde(default)]
        max_bytes: Option<u64>,
    }

    #[test]
    fn params_are_structurally_validated() {
        let ok: Probe = parse_params(json!({"file": "a", "maxBytes": 3})).unwrap();
        assert_eq!(ok.file, "a");
        assert_eq!(ok.max_bytes, Some(3));

        for bad in [json!({}), json!({"file": 1}), json!({"file": "a", "extra": true}), json!(null)] {
            let err = parse_params::<Probe>(bad).unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationError);
        }
    }

    #[test]
    fn within_applies_default_and_bounds() {
        assert_eq!(within("n", None, 5u64, 1, 10).unwrap(), 5);
        assert_eq!(within("n", Some(10u64), 5, 1, 10).unwrap(), 10);
        assert_eq!(within("n", Some(0u64), 5, 1, 10).unwrap_err().code, ErrorCode::ValidationError);
        assert_eq!(within("n", Some(11u64), 5, 1, 10).unwrap_err().code, ErrorCode::ValidationError);
    }
}
