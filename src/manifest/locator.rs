//! 构建清单地址推导
use tracing::debug;
use url::Url;

use crate::utils::{join_path, join_under_next};

/// 清单文件名
pub const BUILD_MANIFEST_FILE: &str = "_buildManifest.js";

/// 清单定位器
pub struct ManifestLocator;

impl ManifestLocator {
    /// 主地址：`<资源基址>/[_next/]static/<buildId>/_buildManifest.js`
    pub fn manifest_url(asset_base: &Url, build_id: &str) -> Url {
        join_under_next(asset_base, &["static", build_id, BUILD_MANIFEST_FILE])
    }

    /// 回退地址（仅在自定义基址 + 资源前缀同时存在时构造）
    /// - 前缀为带主机的绝对URL：取其主机与路径
    /// - 前缀首段形似域名（包含 `.`）：首段作主机，其余作路径
    ///
    /// 协议取自定义基址的协议，缺省 https
    pub fn fallback_url(custom_base: &str, asset_prefix: &str, build_id: &str) -> Option<Url> {
        if custom_base.trim().is_empty() || asset_prefix.is_empty() {
            return None;
        }
        let scheme = Url::parse(custom_base)
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|_| "https".to_string());

        let (host, path_prefix) = match Self::absolute_prefix(asset_prefix) {
            Some(prefix_url) => {
                let host = match prefix_url.port() {
                    Some(port) => format!("{}:{}", prefix_url.host_str()?, port),
                    None => prefix_url.host_str()?.to_string(),
                };
                (host, prefix_url.path().to_string())
            }
            None => {
                let trimmed = asset_prefix.trim_matches('/');
                let mut segments = trimmed.split('/');
                let host = segments.next().filter(|first| first.contains('.'))?;
                let rest = segments.collect::<Vec<_>>().join("/");
                (host.to_string(), rest)
            }
        };

        let path = join_path(&[&path_prefix, "_next", "static", build_id, BUILD_MANIFEST_FILE]);
        let candidate = format!("{}://{}{}", scheme, host, path);
        debug!("构造清单回退地址：{}", candidate);
        Url::parse(&candidate).ok()
    }

    /// 带主机的绝对前缀；协议相对形式 `//host/path` 也视为绝对
    fn absolute_prefix(asset_prefix: &str) -> Option<Url> {
        let parsed = if asset_prefix.starts_with("//") {
            Url::parse(&format!("https:{}", asset_prefix))
        } else {
            Url::parse(asset_prefix)
        };
        parsed.ok().filter(|u| u.host_str().is_some_and(|h| !h.is_empty()))
    }
}
