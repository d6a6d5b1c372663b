//! 数据模型定义
//! 内嵌配置载荷与扫描结果，支持序列化/反序列化

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 版本未知时的占位值
pub const UNKNOWN_VERSION: &str = "Unknown";

/// 页面内嵌的 __NEXT_DATA__ 载荷
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NextData {
    #[serde(rename = "buildId", default)]
    pub build_id: Option<String>,
    #[serde(rename = "assetPrefix", default)]
    pub asset_prefix: Option<String>,
    #[serde(default)]
    pub props: Option<Map<String, Value>>,
}

impl NextData {
    pub fn build_id(&self) -> &str {
        self.build_id.as_deref().unwrap_or_default()
    }

    pub fn asset_prefix(&self) -> &str {
        self.asset_prefix.as_deref().unwrap_or_default()
    }

    /// buildId 非空且 props 非 null
    pub fn is_complete(&self) -> bool {
        !self.build_id().is_empty() && self.props.is_some()
    }
}

/// 扫描结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub base_url: String,
    pub asset_base_url: String,
    pub is_next_js: bool,
    pub build_id: String,
    pub asset_prefix: String,
    pub routes: BTreeMap<String, Vec<String>>,
    pub all_assets: BTreeSet<String>,
    pub manifest_found: bool,
    pub manifest_exec_ok: bool,
    pub detected_next_version: String,
    pub detected_react_version: String,
    #[serde(rename = "nextDataJSONRaw")]
    pub next_data_json_raw: String,
    pub execution_error: Option<String>,
}

impl ScanResult {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// 是否完整成功（无终止错误）
    pub fn is_success(&self) -> bool {
        self.execution_error.is_none()
    }

    /// 紧凑JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// 格式化JSON
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ======== 文本报告（用于 CLI / Report 输出） ========
impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scan Results for: {}", self.base_url)?;
        writeln!(f, "Is Next.js: {}", self.is_next_js)?;
        if self.is_next_js {
            writeln!(f, "Build ID: {}", self.build_id)?;
            writeln!(f, "Detected Next.js Version: {}", self.detected_next_version)?;
            writeln!(f, "Detected React Version: {}", self.detected_react_version)?;
            writeln!(f, "Asset Prefix: {}", self.asset_prefix)?;
            writeln!(f, "Calculated Asset Base URL: {}", self.asset_base_url)?;
            writeln!(f, "Build Manifest Found: {}", self.manifest_found)?;
            writeln!(f, "Build Manifest Executed OK: {}", self.manifest_exec_ok)?;
            match &self.execution_error {
                Some(err) => writeln!(f, "Execution Error: {}", err)?,
                None => {
                    writeln!(f, "Found {} Routes:", self.routes.len())?;
                    for (route, assets) in &self.routes {
                        writeln!(f, "  - {} ({} assets)", route, assets.len())?;
                    }
                    writeln!(f, "Found {} Unique Assets.", self.all_assets.len())?;
                }
            }
        } else if let Some(err) = &self.execution_error {
            writeln!(f, "Execution Error: {}", err)?;
        }
        if !self.next_data_json_raw.is_empty() && !self.is_next_js {
            writeln!(f)?;
            writeln!(f, "Raw __NEXT_DATA__ (found but potentially invalid):")?;
            writeln!(f, "{}", self.next_data_json_raw)?;
        }
        Ok(())
    }
}
