//! 检测器核心：按固定优先级串联各推断策略
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use super::analyzer::{ContextAnalyzer, GlobalAssignmentAnalyzer, PresenceProbe};
use super::classifier::UrlClassifier;
use super::{DetectedVersions, VersionCandidate, VersionDetector};
use crate::compiler::PatternBundle;
use crate::fetch::Fetcher;

/// 单次检测内的内容缓存，每个URL最多抓取一次
struct ContentCache<'a> {
    fetcher: &'a dyn Fetcher,
    entries: HashMap<String, Option<Arc<str>>>,
}

impl<'a> ContentCache<'a> {
    fn new(fetcher: &'a dyn Fetcher) -> Self {
        Self { fetcher, entries: HashMap::new() }
    }

    async fn get(&mut self, url: &str, stage: &str) -> Option<Arc<str>> {
        if let Some(cached) = self.entries.get(url) {
            return cached.clone();
        }

        debug!("版本检测（{}）：拉取 {}", stage, url);
        let content = match self.fetcher.fetch(url).await {
            Ok(response) => Some(Arc::<str>::from(response.text())),
            Err(e) => {
                warn!("版本检测（{}）：拉取资源 {} 失败：{}", stage, url, e);
                None
            }
        };
        self.entries.insert(url.to_string(), content.clone());
        content
    }
}

/// 启发式资源扫描检测器
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    patterns: Arc<PatternBundle>,
    context_window: usize,
}

impl HeuristicDetector {
    pub fn new(patterns: Arc<PatternBundle>, context_window: usize) -> Self {
        Self { patterns, context_window }
    }

    /// 在URL列表中按序执行单文件分析，首个命中即返回
    async fn first_match<F>(
        &self,
        urls: &[String],
        cache: &mut ContentCache<'_>,
        stage: &str,
        analyze: F,
    ) -> Option<String>
    where
        F: Fn(&PatternBundle, &str) -> Option<String>,
    {
        for url in urls {
            let Some(content) = cache.get(url, stage).await else {
                continue;
            };
            if let Some(version) = analyze(&*self.patterns, &*content) {
                info!("版本检测（{}）：在 {} 中找到 Next.js 版本 '{}'", stage, url, version);
                return Some(version);
            }
        }
        debug!("版本检测（{}）：{} 个URL中未命中", stage, urls.len());
        None
    }

    /// 上下文扫描，仅填充空槽位
    async fn context_scan(
        &self,
        urls: &[String],
        cache: &mut ContentCache<'_>,
        stage: &str,
        next: &mut Option<VersionCandidate>,
        react: &mut Option<VersionCandidate>,
    ) {
        debug!("版本检测（{}）：扫描 {} 个URL（缺Next.js：{}，缺React：{}）", stage, urls.len(), next.is_none(), react.is_none());
        for url in urls {
            if next.is_some() && react.is_some() {
                break;
            }
            let Some(content) = cache.get(url, stage).await else {
                continue;
            };
            ContextAnalyzer::scan(&*self.patterns, &*content, url, self.context_window, next, react);
        }
    }
}

#[async_trait]
impl VersionDetector for HeuristicDetector {
    async fn detect(
        &self,
        build_id: &str,
        js_assets: &BTreeSet<String>,
        asset_base: Option<&Url>,
        fetcher: &dyn Fetcher,
    ) -> DetectedVersions {
        let urls = UrlClassifier::classify(js_assets.iter());
        let mut cache = ContentCache::new(fetcher);
        let mut next: Option<VersionCandidate> = None;
        let mut react: Option<VersionCandidate> = None;

        // 1. 优先分块：直接赋值 -> 变量赋值
        let mut global = self.first_match(&urls.priority, &mut cache, "策略A 优先分块直接赋值", GlobalAssignmentAnalyzer::direct).await;
        if global.is_none() {
            global = self.first_match(&urls.priority, &mut cache, "策略B 优先分块变量赋值", GlobalAssignmentAnalyzer::indirect).await;
        }

        // 2. 其他分块：同样的全局赋值模式
        if global.is_none() {
            global = self.first_match(&urls.other, &mut cache, "策略A 其他分块直接赋值", GlobalAssignmentAnalyzer::direct).await;
        }
        if global.is_none() {
            global = self.first_match(&urls.other, &mut cache, "策略B 其他分块变量赋值", GlobalAssignmentAnalyzer::indirect).await;
        }
        if let Some(value) = global {
            next = Some(VersionCandidate {
                value,
                context: String::new(),
                source_url: String::new(),
            });
        }

        // 3. 上下文扫描：优先分块 -> 全部分块
        self.context_scan(&urls.priority, &mut cache, "策略C 优先分块上下文", &mut next, &mut react).await;
        if next.is_none() || react.is_none() {
            self.context_scan(&urls.all, &mut cache, "策略D 全部分块上下文", &mut next, &mut react).await;
        }

        let mut versions = DetectedVersions::default();

        // 4. 存在性探测（仅 Next.js）
        match next {
            Some(candidate) => versions.next = candidate.value,
            None => {
                let outcome = PresenceProbe::probe(build_id, asset_base, fetcher).await;
                if outcome.found {
                    versions.next = outcome.hint;
                }
            }
        }
        if let Some(candidate) = react {
            versions.react = candidate.value;
        }

        info!("版本检测完成：Next.js={}，React={}", versions.next, versions.react);
        versions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PatternCompiler;
    use crate::fetch::MemoryFetcher;

    fn detector() -> HeuristicDetector {
        HeuristicDetector::new(Arc::new(PatternCompiler::compile().unwrap()), 30)
    }

    fn assets(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    const FRAMEWORK: &str = "https://x.test/_next/static/chunks/framework-1.js";
    const MAIN: &str = "https://x.test/_next/static/chunks/main-2.js";
    const PAGE: &str = "https://x.test/_next/static/chunks/pages/_app-3.js";

    #[tokio::test]
    async fn test_priority_direct_beats_other_literal() {
        let fetcher = MemoryFetcher::new()
            .with_body(MAIN, r#"window.next={version:"14.1.0",appDir:!1};"#)
            .with_body(PAGE, r#"e.exports="99.0.0";"#);

        let versions = detector()
            .detect("b1", &assets(&[MAIN, PAGE]), None, &fetcher)
            .await;
        assert_eq!(versions.next, "14.1.0");
        assert_eq!(versions.react, "Unknown");
    }

    #[tokio::test]
    async fn test_other_chunk_assignment_beats_priority_context() {
        // 优先分块只有松散版本字面量，其他分块带全局赋值
        let fetcher = MemoryFetcher::new()
            .with_body(MAIN, r#"var build="12.3.4";"#)
            .with_body(FRAMEWORK, r#"var React={version:"18.2.0"};"#)
            .with_body(PAGE, r#"window.next={version:"13.5.6",appDir:!1};"#);

        let versions = detector()
            .detect("", &assets(&[MAIN, PAGE, FRAMEWORK]), None, &fetcher)
            .await;
        assert_eq!(versions.next, "13.5.6");
        assert_eq!(versions.react, "18.2.0");

        let indirect = MemoryFetcher::new()
            .with_body(MAIN, r#"var build="12.3.4";"#)
            .with_body(PAGE, r#"window.next={version:Qe,root:!0};let Qe="13.1.0";"#);
        let versions = detector().detect("", &assets(&[MAIN, PAGE]), None, &indirect).await;
        assert_eq!(versions.next, "13.1.0");
        assert_eq!(indirect.requested(), vec![MAIN.to_string(), PAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_indirect_chain_through_detector() {
        let fetcher = MemoryFetcher::new()
            .with_body(MAIN, r#"window.next={version:Xe,root:!0};let Xe="14.2.1-canary.3";"#);
        let versions = detector().detect("", &assets(&[MAIN]), None, &fetcher).await;
        assert_eq!(versions.next, "14.2.1-canary.3");
    }

    #[tokio::test]
    async fn test_react_from_framework_and_fallback_next() {
        let fetcher = MemoryFetcher::new()
            .with_body(FRAMEWORK, r#"t.version="18.2.0-next-9e3b772b8-20220608";var React=1;"#)
            .with_body(PAGE, r#"var build="13.0.7";"#);

        let versions = detector()
            .detect("", &assets(&[FRAMEWORK, PAGE]), None, &fetcher)
            .await;
        assert_eq!(versions.react, "18.2.0-next-9e3b772b8-20220608");
        assert_eq!(versions.next, "13.0.7");
    }

    #[tokio::test]
    async fn test_unknown_defaulting_without_probe_data() {
        let fetcher = MemoryFetcher::new().with_body(MAIN, "console.log(1)");
        let versions = detector().detect("", &assets(&[MAIN]), None, &fetcher).await;
        assert_eq!(versions, DetectedVersions::default());
    }

    #[tokio::test]
    async fn test_probe_hint_fills_missing_next() {
        let base = Url::parse("https://x.test/").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_body(MAIN, "console.log(1)")
            .with_status("https://x.test/_next/static/b1/_appManifest.js", 404);
        let versions = detector().detect("b1", &assets(&[MAIN]), Some(&base), &fetcher).await;
        assert_eq!(versions.next, "<13 / Pages Router Likely");

        let broken = MemoryFetcher::new()
            .with_body(MAIN, "console.log(1)")
            .with_status("https://x.test/_next/static/b1/_appManifest.js", 500);
        let versions = detector().detect("b1", &assets(&[MAIN]), Some(&base), &broken).await;
        assert_eq!(versions.next, "Unknown");
    }

    #[tokio::test]
    async fn test_each_url_fetched_once_and_deterministic() {
        let build = || {
            MemoryFetcher::new()
                .with_body(MAIN, "noop()")
                .with_body(PAGE, "noop()")
                .with_body(FRAMEWORK, "noop()")
        };
        let set = assets(&[PAGE, MAIN, FRAMEWORK]);

        let first = build();
        let a = detector().detect("", &set, None, &first).await;
        let second = build();
        let b = detector().detect("", &set, None, &second).await;

        assert_eq!(a, b);
        assert_eq!(first.requested(), second.requested());
        assert_eq!(first.requested(), vec![FRAMEWORK.to_string(), MAIN.to_string(), PAGE.to_string()]);
    }
}
