//! 设计规则校验
//!
//! 规则由外部存储配置，对本模块只读。校验流程：
//! 1. 合并原始输入与分区字段为上下文（键冲突时分区字段优先）
//! 2. 按给定顺序遍历启用的规则；上下文中没有目标参数的规则直接跳过
//! 3. 用受限表达式语言计算期望值，按运算符与实际值比较
//! 4. 不满足时按约束类别生成违规：HARD → CRITICAL，SOFT → WARNING
//!
//! 单条规则求值失败只记录警告并跳过，不会中断整次校验。

use crate::error::RuleError;
use crate::expr::{Context, Expression, Value};
use crate::layout::LayoutZones;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// 比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Lt => "<",
        }
    }

    /// 实际值与期望值是否满足该运算符
    ///
    /// 大小比较两侧都转为浮点数；相等比较两侧都转为文本。
    pub fn holds(&self, actual: &Value, expected: &Value) -> Result<bool, RuleError> {
        match self {
            ComparisonOperator::Eq => Ok(actual.to_string() == expected.to_string()),
            ComparisonOperator::Ne => Ok(actual.to_string() != expected.to_string()),
            _ => {
                let a = actual.to_f64()?;
                let e = expected.to_f64()?;
                Ok(match self {
                    ComparisonOperator::Ge => a >= e,
                    ComparisonOperator::Le => a <= e,
                    ComparisonOperator::Gt => a > e,
                    _ => a < e,
                })
            }
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for ComparisonOperator {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">=" => Ok(ComparisonOperator::Ge),
            "<=" => Ok(ComparisonOperator::Le),
            "==" => Ok(ComparisonOperator::Eq),
            "!=" => Ok(ComparisonOperator::Ne),
            ">" => Ok(ComparisonOperator::Gt),
            "<" => Ok(ComparisonOperator::Lt),
            other => Err(RuleError::Syntax {
                position: 0,
                message: format!("unknown operator `{}`", other),
            }),
        }
    }
}

/// 约束类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstraintClass {
    /// 强制约束，违反时阻止生成
    Hard,
    /// 建议约束，只报告
    Soft,
}

impl ConstraintClass {
    pub fn severity(&self) -> Severity {
        match self {
            ConstraintClass::Hard => Severity::Critical,
            ConstraintClass::Soft => Severity::Warning,
        }
    }
}

/// 违规严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => f.write_str("CRITICAL"),
            Severity::Warning => f.write_str("WARNING"),
        }
    }
}

fn default_active() -> bool {
    true
}

/// 设计规则
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub rule_id: String,
    /// 被检查的上下文参数名
    pub parameter_name: String,
    pub operator: ComparisonOperator,
    /// 计算期望值的表达式
    #[serde(alias = "expression_value")]
    pub expression: String,
    pub constraint_type: ConstraintClass,
    #[serde(default = "default_active", alias = "status")]
    pub active: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Rule {
    pub fn new(
        rule_id: impl Into<String>,
        parameter_name: impl Into<String>,
        operator: ComparisonOperator,
        expression: impl Into<String>,
        constraint_type: ConstraintClass,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            parameter_name: parameter_name.into(),
            operator,
            expression: expression.into(),
            constraint_type,
            active: true,
            category: String::new(),
            description: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// 规则违规
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

impl Violation {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// 单条规则的检查结果
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Passed,
    Failed(Violation),
    /// 上下文中没有目标参数
    NotApplicable,
}

/// 合并上下文：原始输入在前，分区字段覆盖同名键
pub fn build_context(raw: &Context, layout: &LayoutZones) -> Context {
    let mut context = raw.clone();
    context.extend(layout.context_fields());
    context
}

/// 规则引擎
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// 校验全部启用的规则，违规按规则顺序输出
    pub fn evaluate(&self, layout: &LayoutZones, raw: &Context, rules: &[Rule]) -> Vec<Violation> {
        let context = build_context(raw, layout);
        self.evaluate_context(&context, rules)
    }

    /// 在已合并的上下文上校验
    pub fn evaluate_context(&self, context: &Context, rules: &[Rule]) -> Vec<Violation> {
        let mut violations = Vec::new();

        for rule in rules.iter().filter(|r| r.active) {
            match self.check(rule, context) {
                Ok(RuleOutcome::Failed(violation)) => {
                    debug!("Rule {} failed: {}", rule.rule_id, violation.message);
                    violations.push(violation);
                }
                Ok(RuleOutcome::Passed) => debug!("Rule {} passed", rule.rule_id),
                Ok(RuleOutcome::NotApplicable) => debug!(
                    "Rule {} skipped: parameter `{}` not set",
                    rule.rule_id, rule.parameter_name
                ),
                Err(e) => warn!("Rule {} failed to evaluate: {}", rule.rule_id, e),
            }
        }

        violations
    }

    /// 检查单条规则
    pub fn check(&self, rule: &Rule, context: &Context) -> Result<RuleOutcome, RuleError> {
        let Some(actual) = context.get(&rule.parameter_name) else {
            return Ok(RuleOutcome::NotApplicable);
        };

        let expected = Expression::parse(&rule.expression)?.evaluate(context)?;
        if rule.operator.holds(actual, &expected)? {
            return Ok(RuleOutcome::Passed);
        }

        Ok(RuleOutcome::Failed(Violation {
            rule_id: rule.rule_id.clone(),
            category: rule.category.clone(),
            message: format!(
                "{} violates rule {} (actual {} {} expected {})",
                rule.parameter_name, rule.rule_id, actual, rule.operator, expected
            ),
            severity: rule.constraint_type.severity(),
        }))
    }
}
