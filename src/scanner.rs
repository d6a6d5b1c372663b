//! 扫描编排：页面抓取 -> 载荷解析 -> 资源基址 -> 构建清单 -> 版本推断 -> 结果汇总
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use crate::compiler::{PatternBundle, PatternCompiler};
use crate::config::ScanConfig;
use crate::detector::{HeuristicDetector, VersionDetector, is_confident_version};
use crate::error::{NextrayError, NxResult};
use crate::extractor::{HtmlExtractor, NextDataOutcome, parse_next_data};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::manifest::ManifestLoader;
use crate::model::ScanResult;
use crate::resolver::{AssetBaseResolver, RouteResolver};

/// 目标未带协议时补全为 https
pub fn normalize_target(target: &str) -> String {
    let target = target.trim();
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{}", target)
    }
}

/// 扫描器
/// 线程安全，可在多个任务间共享；单次扫描内严格串行抓取
#[derive(Clone)]
pub struct Scanner {
    fetcher: Arc<dyn Fetcher>,
    detector: Arc<dyn VersionDetector>,
    manifest_loader: ManifestLoader,
    config: ScanConfig,
}

impl Scanner {
    /// 使用 HTTP 抓取器与启发式检测器创建扫描器
    pub fn new(config: ScanConfig) -> NxResult<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config)?);
        Self::with_fetcher(config, fetcher)
    }

    /// 使用指定抓取器创建扫描器
    pub fn with_fetcher(config: ScanConfig, fetcher: Arc<dyn Fetcher>) -> NxResult<Self> {
        let patterns = Arc::new(PatternCompiler::compile()?);
        let detector: Arc<dyn VersionDetector> =
            Arc::new(HeuristicDetector::new(patterns.clone(), config.context_window));
        Ok(Self::with_components(config, fetcher, detector, patterns))
    }

    /// 组装全部组件
    pub fn with_components(
        config: ScanConfig,
        fetcher: Arc<dyn Fetcher>,
        detector: Arc<dyn VersionDetector>,
        patterns: Arc<PatternBundle>,
    ) -> Self {
        let manifest_loader = ManifestLoader::new(patterns, config.eval_step_budget);
        Self { fetcher, detector, manifest_loader, config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// 扫描目标站点；任何阶段失败都返回部分结果，终止错误记录在 `execution_error`
    pub async fn scan(&self, target: &str) -> ScanResult {
        let target_url = normalize_target(target);
        info!("开始扫描：{}", target_url);

        let response = match self.fetcher.fetch(&target_url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("初始页面拉取失败：{}", e);
                let mut result = ScanResult::new(target_url.as_str());
                if let Ok(parsed) = Url::parse(&target_url) {
                    result.asset_base_url = parsed.to_string();
                }
                result.execution_error = Some(NextrayError::Fetch(e).to_string());
                return result;
            }
        };

        let page_url = match Url::parse(&response.final_url) {
            Ok(url) => url,
            Err(e) => {
                warn!("抓取器返回的最终URL无效 '{}'：{}", response.final_url, e);
                let mut result = ScanResult::new(target_url.as_str());
                result.execution_error = Some(NextrayError::InvalidInput(format!(
                    "抓取器返回的最终URL无效 '{}'：{}",
                    response.final_url, e
                )).to_string());
                return result;
            }
        };
        if response.final_url != target_url {
            debug!("初始页面重定向至：{}", page_url);
        }

        let mut result = ScanResult::new(page_url.as_str());
        let html = response.text();
        let extractor = HtmlExtractor::new().extract(&html);

        // 1. 内嵌载荷
        let payload = parse_next_data(extractor.get_next_data());
        result.next_data_json_raw = payload.raw().to_string();
        let payload_error = payload.error();
        if let Some(e) = &payload_error {
            info!("__NEXT_DATA__ 处理提示：{}", e);
        }
        if let Some(data) = payload.data().filter(|d| !d.build_id().is_empty()) {
            result.is_next_js = true;
            result.build_id = data.build_id().to_string();
            result.asset_prefix = data.asset_prefix().to_string();
        }

        // 2. 资源基址与初始脚本
        let page_base = AssetBaseResolver::page_base(&page_url);
        let custom_base = self.config.custom_base_url.as_deref();
        let asset_base = AssetBaseResolver::resolve(&page_base, custom_base, &result.asset_prefix);
        result.asset_base_url = asset_base.to_string();

        let initial_scripts = extractor.next_chunk_urls(&asset_base);
        if !initial_scripts.is_empty() && !result.is_next_js {
            info!("未获得有效 buildId，但发现 {} 个 Next.js 初始脚本，判定为 Next.js", initial_scripts.len());
            result.is_next_js = true;
        }

        // 3. 构建清单
        let mut manifest_error = None;
        let mut manifest_assets = BTreeSet::new();
        if result.build_id.is_empty() {
            info!("未获得 buildId，跳过构建清单");
        } else {
            let outcome = self.manifest_loader
                .load(&asset_base, &result.build_id, custom_base, &result.asset_prefix, &*self.fetcher)
                .await;
            result.manifest_found = outcome.found;
            match outcome.manifest {
                Ok(manifest) => {
                    result.manifest_exec_ok = true;
                    let (routes, assets) = RouteResolver::resolve(&manifest, &asset_base);
                    info!("构建清单处理完成：{} 个路由，{} 个资源", routes.len(), assets.len());
                    result.routes = routes;
                    manifest_assets = assets;
                }
                Err(e) => manifest_error = Some(e),
            }
        }

        // 4. 资源合并与版本推断
        let detection_input: BTreeSet<String> = initial_scripts.iter()
            .chain(manifest_assets.iter().filter(|url| url.ends_with(".js")))
            .cloned()
            .collect();
        result.all_assets = initial_scripts.union(&manifest_assets).cloned().collect();
        debug!("版本推断输入 {} 个 JS 资源", detection_input.len());

        let versions = self.detector
            .detect(&result.build_id, &detection_input, Some(&asset_base), &*self.fetcher)
            .await;
        result.detected_next_version = versions.next;
        result.detected_react_version = versions.react;

        // 5. 终止错误与回溯判定
        let mut terminal = Self::terminal_error(
            manifest_error,
            payload_error,
            &payload,
            result.manifest_exec_ok,
            initial_scripts.is_empty(),
        );

        if !result.is_next_js && is_confident_version(&result.detected_next_version) {
            info!("检测到确定版本 '{}'，判定为 Next.js", result.detected_next_version);
            result.is_next_js = true;
            if terminal.as_ref().is_some_and(NextrayError::is_absent) {
                terminal = None;
            }
        }

        match &terminal {
            Some(e) => warn!("扫描结束，存在错误：{}", e),
            None => info!(
                "扫描完成：路由 {} 个，资源 {} 个",
                result.routes.len(),
                result.all_assets.len()
            ),
        }
        result.execution_error = terminal.map(|e| e.to_string());
        result
    }

    /// 按优先级选出唯一的终止错误：清单错误 > 载荷错误（非缺失，且清单未成功）> 载荷缺失且无初始脚本
    fn terminal_error(
        manifest_error: Option<NextrayError>,
        payload_error: Option<NextrayError>,
        payload: &NextDataOutcome,
        manifest_ok: bool,
        no_initial_scripts: bool,
    ) -> Option<NextrayError> {
        if manifest_error.is_some() {
            return manifest_error;
        }
        match payload_error {
            Some(e) if e.is_absent() => no_initial_scripts.then_some(e),
            Some(e) if !manifest_ok => Some(e),
            Some(_) => {
                debug!("载荷不完整（buildId={:?}），但构建清单已成功处理", payload.data().map(|d| d.build_id()));
                None
            }
            None => None,
        }
    }
}
