//! 生成流程错误定义

use hullgen_core::error::HullError;
use hullgen_file::DrawingError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// 设计库 / 规则库读取错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid design id: {0}")]
    InvalidId(String),
}

/// 生成请求失败
///
/// 规则判定为严重违规不属于错误，而是 `failed` 状态的正常结果。
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(#[from] HullError),

    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("Rule store unavailable: {0}")]
    RuleStore(#[source] StoreError),

    #[error("Design store unavailable: {0}")]
    DesignStore(#[source] StoreError),

    #[error("Drawing write failed: {0}")]
    DrawingWrite(#[from] DrawingError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    /// 对应的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            GenerationError::InvalidGeometry(_) => 400,
            GenerationError::MissingPrerequisite(_) => 404,
            GenerationError::RuleStore(_)
            | GenerationError::DesignStore(_)
            | GenerationError::DrawingWrite(_)
            | GenerationError::Config(_) => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidGeometry(_) => "invalid_geometry",
            GenerationError::MissingPrerequisite(_) => "missing_prerequisite",
            GenerationError::RuleStore(_) => "rule_store",
            GenerationError::DesignStore(_) => "design_store",
            GenerationError::DrawingWrite(_) => "drawing_write",
            GenerationError::Config(_) => "config",
        }
    }
}

/// 错误响应
///
/// 只携带错误描述，不暴露内部调用栈。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub kind: String,
    pub message: String,
}

impl From<&GenerationError> for ErrorResponse {
    fn from(error: &GenerationError) -> Self {
        Self {
            status: "error".to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let missing = GenerationError::MissingPrerequisite("design 7 not found".to_string());
        assert_eq!(missing.status_code(), 404);

        let config = GenerationError::Config("sample_count".to_string());
        assert_eq!(config.status_code(), 500);

        let io = StoreError::Io {
            path: PathBuf::from("rules.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(GenerationError::RuleStore(io).status_code(), 500);
    }

    #[test]
    fn test_error_response_body() {
        let error = GenerationError::MissingPrerequisite("design 7 not found".to_string());
        let response = ErrorResponse::from(&error);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "missing_prerequisite");
        assert_eq!(json["message"], "Missing prerequisite: design 7 not found");
    }
}
