//! 检测分析器：对单个脚本内容执行各版本推断策略
use tracing::debug;
use url::Url;

use super::VersionCandidate;
use crate::compiler::PatternBundle;
use crate::fetch::Fetcher;
use crate::utils::join_under_next;

/// React 名称特征
const UI_LIBRARY_TOKENS: [&str; 3] = ["react", "React", "react-dom"];
/// 已知误报：React DevTools 注入的 reconcilerVersion
const RECONCILER_TOKEN: &str = "reconcilerVersion";

pub const APP_ROUTER_HINT: &str = ">=13 (App Router Likely)";
pub const PAGES_ROUTER_HINT: &str = "<13 / Pages Router Likely";
pub const PROBE_ERROR_HINT: &str = "Unknown (Error probing)";
pub const PROBE_MISSING_DATA_HINT: &str = "Unknown (Missing data)";

/// 全局赋值分析器（策略A/B）
pub struct GlobalAssignmentAnalyzer;

impl GlobalAssignmentAnalyzer {
    /// 策略A：`window.next = { version: "X.Y.Z" }`
    pub fn direct(patterns: &PatternBundle, content: &str) -> Option<String> {
        patterns.global_direct
            .captures(content)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// 策略B：`window.next = { version: H }`，再在整个文件中解析 H 的取值
    pub fn indirect(patterns: &PatternBundle, content: &str) -> Option<String> {
        let ident = patterns.global_indirect
            .captures(content)
            .and_then(|cap| cap.get(1))?
            .as_str();
        debug!("window.next 通过变量 '{}' 赋值版本，在整个文件中查找其取值", ident);

        // 1. 该标识符自身的声明
        if !ident.contains('.') {
            if let Ok(declaration) = patterns.declaration_of(ident) {
                if let Some(cap) = declaration.captures(content) {
                    return Some(cap[1].to_string());
                }
            }
        }

        // 2. 文件内第一个带版本字面量的声明
        if let Some(cap) = patterns.declared_version.captures(content) {
            return Some(cap[1].to_string());
        }

        // 3. 文件内第一个宽松版本字面量
        patterns.loose_version
            .captures(content)
            .map(|cap| cap[1].to_string())
    }
}

/// 上下文窗口分析器（策略C/D）
pub struct ContextAnalyzer;

impl ContextAnalyzer {
    /// 扫描内容中的所有版本字面量，仅填充仍为空的槽位；两个槽位都已填充时返回 true
    pub fn scan(
        patterns: &PatternBundle,
        content: &str,
        source_url: &str,
        window: usize,
        next: &mut Option<VersionCandidate>,
        react: &mut Option<VersionCandidate>,
    ) -> bool {
        for cap in patterns.loose_version.captures_iter(content) {
            if next.is_some() && react.is_some() {
                break;
            }
            let (Some(whole), Some(value)) = (cap.get(0), cap.get(1)) else {
                continue;
            };

            let context = context_window(content, whole.start(), whole.end(), window);
            if context.contains(RECONCILER_TOKEN) {
                continue;
            }

            let candidate = VersionCandidate {
                value: value.as_str().to_string(),
                context: context.to_string(),
                source_url: source_url.to_string(),
            };
            let is_ui_library = UI_LIBRARY_TOKENS.iter().any(|token| context.contains(token));

            if is_ui_library {
                if react.is_none() {
                    debug!("上下文扫描：React 候选版本 '{}'（上下文：'{}'）来自 {}", candidate.value, candidate.context.replace('\n', " "), source_url);
                    *react = Some(candidate);
                }
            } else if next.is_none() {
                debug!("上下文扫描：Next.js 候选版本 '{}'（上下文：'{}'）来自 {}", candidate.value, candidate.context.replace('\n', " "), source_url);
                *next = Some(candidate);
            }
        }
        next.is_some() && react.is_some()
    }
}

/// 取匹配区间两侧各 `width` 个字符组成的窗口
pub fn context_window(content: &str, start: usize, end: usize, width: usize) -> &str {
    let left = if width == 0 {
        start
    } else {
        content[..start]
            .char_indices()
            .rev()
            .nth(width - 1)
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    };
    let right = content[end..]
        .char_indices()
        .nth(width)
        .map(|(idx, _)| end + idx)
        .unwrap_or(content.len());
    &content[left..right]
}

/// 探测结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub hint: String,
    pub found: bool,
}

/// 存在性探测（策略E）：仅判断 `_appManifest.js` 是否存在，给出粗略的版本区间提示
pub struct PresenceProbe;

impl PresenceProbe {
    pub async fn probe(build_id: &str, asset_base: Option<&Url>, fetcher: &dyn Fetcher) -> ProbeOutcome {
        let Some(asset_base) = asset_base.filter(|_| !build_id.is_empty()) else {
            debug!("存在性探测：缺少 buildId 或资源基址，跳过");
            return ProbeOutcome { hint: PROBE_MISSING_DATA_HINT.to_string(), found: false };
        };

        let probe_url = join_under_next(asset_base, &["static", build_id, "_appManifest.js"]);
        debug!("存在性探测：{}", probe_url);

        match fetcher.fetch(probe_url.as_str()).await {
            Ok(_) => {
                debug!("存在性探测：_appManifest.js 存在");
                ProbeOutcome { hint: APP_ROUTER_HINT.to_string(), found: true }
            }
            Err(e) if e.is_not_found_or_forbidden() => {
                debug!("存在性探测：_appManifest.js 不存在（404/403）");
                ProbeOutcome { hint: PAGES_ROUTER_HINT.to_string(), found: true }
            }
            Err(e) => {
                debug!("存在性探测失败：{}", e);
                ProbeOutcome { hint: PROBE_ERROR_HINT.to_string(), found: false }
            }
        }
    }
}
