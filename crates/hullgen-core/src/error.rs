//! 核心错误定义

use thiserror::Error;

/// 几何与分区输入错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HullError {
    #[error("Invalid geometry field `{field}`: {reason}")]
    InvalidGeometry { field: &'static str, reason: String },
}

impl HullError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        HullError::InvalidGeometry {
            field,
            reason: reason.into(),
        }
    }

    /// 出错的字段名
    pub fn field(&self) -> &'static str {
        match self {
            HullError::InvalidGeometry { field, .. } => field,
        }
    }
}

/// 单条规则的求值错误
///
/// 只在规则引擎内部产生，被捕获后该规则跳过，不会中断整个校验。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Function not allowed: {0}")]
    UnknownFunction(String),

    #[error("{function}() expects {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("Type error: {0}")]
    Type(String),

    #[error("Value is not numeric: {0}")]
    NotNumeric(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Expression too complex: {0}")]
    TooComplex(String),
}
