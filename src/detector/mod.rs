//! 检测模块：版本推断核心逻辑
pub mod classifier;
pub mod analyzer;
pub mod detector;

use std::collections::BTreeSet;

use async_trait::async_trait;
use url::Url;

use crate::fetch::Fetcher;
use crate::model::UNKNOWN_VERSION;

// 导出核心接口
pub use self::classifier::{ClassifiedUrls, UrlClassifier};
pub use self::analyzer::{ContextAnalyzer, GlobalAssignmentAnalyzer, PresenceProbe, ProbeOutcome};
pub use self::detector::HeuristicDetector;

/// 版本候选：取值、上下文窗口、来源URL（仅用于日志与先到先得判定）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate {
    pub value: String,
    pub context: String,
    pub source_url: String,
}

/// 版本推断结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedVersions {
    pub next: String,
    pub react: String,
}

impl Default for DetectedVersions {
    fn default() -> Self {
        Self {
            next: UNKNOWN_VERSION.to_string(),
            react: UNKNOWN_VERSION.to_string(),
        }
    }
}

/// 版本推断接口
#[async_trait]
pub trait VersionDetector: Send + Sync {
    /// 根据 buildId、JS 资源集合与资源基址推断 Next.js / React 版本；推断失败返回 "Unknown" 或区间提示
    async fn detect(
        &self,
        build_id: &str,
        js_assets: &BTreeSet<String>,
        asset_base: Option<&Url>,
        fetcher: &dyn Fetcher,
    ) -> DetectedVersions;
}

/// 是否为确定的版本号（非 Unknown、非区间提示）
pub fn is_confident_version(version: &str) -> bool {
    !version.is_empty() && !version.starts_with(UNKNOWN_VERSION) && !version.contains("Likely")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confident_version() {
        assert!(is_confident_version("14.2.1-canary.3"));
        assert!(!is_confident_version("Unknown"));
        assert!(!is_confident_version("Unknown (Error probing)"));
        assert!(!is_confident_version(">=13 (App Router Likely)"));
        assert!(!is_confident_version(""));
    }
}
