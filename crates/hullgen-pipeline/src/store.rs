//! 设计库与规则库接口
//!
//! 生成流程只读取这两类数据：已保存的设计（主尺度与布置参数）和当前启用的规则。
//! 每次请求读取一次规则，得到的是当时的快照。

use crate::error::StoreError;
use crate::request::{GenerationRequest, LayoutParameters};
use hullgen_core::hull::HullGeometry;
use hullgen_core::rules::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 已保存的设计
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub hull: HullGeometry,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    /// 保存的布置参数
    #[serde(default)]
    pub layout: Option<LayoutParameters>,
}

impl DesignRecord {
    pub fn new(id: impl Into<String>, hull: HullGeometry) -> Self {
        Self {
            id: id.into(),
            name: None,
            hull,
            parameters: serde_json::Map::new(),
            layout: None,
        }
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest {
            design_id: Some(self.id.clone()),
            hull: self.hull.clone(),
            parameters: self.parameters.clone(),
            layout: self.layout,
        }
    }
}

/// 设计库
pub trait DesignStore: Send + Sync {
    /// 按编号读取设计；不存在时返回 `Ok(None)`
    fn load(&self, id: &str) -> Result<Option<DesignRecord>, StoreError>;
}

/// 以目录保存设计，每个设计一个 `<id>.json`
#[derive(Debug, Clone)]
pub struct DirectoryDesignStore {
    root: PathBuf,
}

impl DirectoryDesignStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }
}

impl DesignStore for DirectoryDesignStore {
    fn load(&self, id: &str) -> Result<Option<DesignRecord>, StoreError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        let record: DesignRecord = read_json(&path)?;
        tracing::debug!("Loaded design {} from {}", id, path.display());
        Ok(Some(record))
    }
}

/// 内存设计库
#[derive(Debug, Clone, Default)]
pub struct MemoryDesignStore {
    designs: HashMap<String, DesignRecord>,
}

impl MemoryDesignStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: DesignRecord) {
        self.designs.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.designs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.designs.is_empty()
    }
}

impl DesignStore for MemoryDesignStore {
    fn load(&self, id: &str) -> Result<Option<DesignRecord>, StoreError> {
        Ok(self.designs.get(id).cloned())
    }
}

/// 规则库
pub trait RuleSource: Send + Sync {
    /// 当前启用的规则，按求值顺序排列
    fn active_rules(&self) -> Result<Vec<Rule>, StoreError>;
}

impl RuleSource for Vec<Rule> {
    fn active_rules(&self) -> Result<Vec<Rule>, StoreError> {
        Ok(self.iter().filter(|r| r.active).cloned().collect())
    }
}

/// JSON 规则文件（规则数组）
#[derive(Debug, Clone)]
pub struct JsonRuleStore {
    path: PathBuf,
}

impl JsonRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for JsonRuleStore {
    fn active_rules(&self) -> Result<Vec<Rule>, StoreError> {
        let rules: Vec<Rule> = read_json(&self.path)?;
        let total = rules.len();
        let active: Vec<Rule> = rules.into_iter().filter(|r| r.active).collect();
        tracing::debug!(
            "Loaded {} active rules ({} total) from {}",
            active.len(),
            total,
            self.path.display()
        );
        Ok(active)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
