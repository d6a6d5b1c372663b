//! 资源基址解析
use tracing::{debug, info, warn};
use url::Url;

use crate::utils::replace_path;

/// 资源基址解析器
pub struct AssetBaseResolver;

impl AssetBaseResolver {
    /// 页面基址：最终页面URL的源站根路径
    pub fn page_base(page_url: &Url) -> Url {
        replace_path(page_url, "/")
    }

    /// 计算资源基址
    /// - 指定了自定义基址：以其为准，资源前缀（绝对前缀取其路径）追加在其路径之后
    /// - 否则以页面基址为准：绝对前缀直接替换，相对前缀相对页面基址解析并补齐结尾 `/`
    pub fn resolve(page_base: &Url, custom_base: Option<&str>, asset_prefix: &str) -> Url {
        if let Some(custom) = custom_base.filter(|c| !c.trim().is_empty()) {
            match Url::parse(custom) {
                Ok(custom_url) => {
                    info!("使用自定义资源基址：{}", custom_url);
                    return Self::with_custom_base(custom_url, asset_prefix);
                }
                Err(e) => warn!("自定义基址 '{}' 解析失败（{}），使用页面基址", custom, e),
            }
        }

        if asset_prefix.is_empty() {
            debug!("未设置 assetPrefix，资源相对页面基址解析：{}", page_base);
            return page_base.clone();
        }

        if let Ok(absolute) = Url::parse(asset_prefix) {
            if absolute.has_host() {
                info!("使用绝对 assetPrefix 作为资源基址：{}", absolute);
                return absolute;
            }
        }

        match page_base.join(asset_prefix) {
            Ok(mut resolved) => {
                if !resolved.path().ends_with('/') {
                    let path = format!("{}/", resolved.path());
                    resolved.set_path(&path);
                }
                info!("相对 assetPrefix 解析后的资源基址：{}", resolved);
                resolved
            }
            Err(e) => {
                warn!("assetPrefix '{}' 无法解析（{}），使用页面基址", asset_prefix, e);
                page_base.clone()
            }
        }
    }

    fn with_custom_base(mut base: Url, asset_prefix: &str) -> Url {
        if asset_prefix.is_empty() {
            return base;
        }

        let prefix_path = match Url::parse(asset_prefix) {
            Ok(absolute) if absolute.has_host() => absolute.path().to_string(),
            _ => asset_prefix.to_string(),
        };
        let prefix_path = prefix_path.trim_start_matches('/');
        if prefix_path.is_empty() {
            return base;
        }

        let path = format!("{}/{}", base.path().trim_end_matches('/'), prefix_path);
        base.set_path(&path);
        debug!("资源前缀追加至自定义基址：{}", base);
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Url {
        AssetBaseResolver::page_base(&Url::parse("https://x.test/blog/post?id=1#top").unwrap())
    }

    #[test]
    fn test_page_base_is_origin_root() {
        assert_eq!(page().as_str(), "https://x.test/");
    }

    #[test]
    fn test_prefix_against_page_base() {
        assert_eq!(AssetBaseResolver::resolve(&page(), None, "").as_str(), "https://x.test/");
        assert_eq!(
            AssetBaseResolver::resolve(&page(), None, "https://cdn.test/app").as_str(),
            "https://cdn.test/app"
        );
        assert_eq!(AssetBaseResolver::resolve(&page(), None, "/static-assets").as_str(), "https://x.test/static-assets/");
        assert_eq!(AssetBaseResolver::resolve(&page(), None, "cdn/").as_str(), "https://x.test/cdn/");
    }

    #[test]
    fn test_custom_base_takes_precedence() {
        let custom = Some("https://mirror.test/root");
        assert_eq!(AssetBaseResolver::resolve(&page(), custom, "").as_str(), "https://mirror.test/root");
        assert_eq!(
            AssetBaseResolver::resolve(&page(), custom, "https://cdn.test/app/").as_str(),
            "https://mirror.test/root/app/"
        );
        assert_eq!(AssetBaseResolver::resolve(&page(), custom, "/assets").as_str(), "https://mirror.test/root/assets");
    }

    #[test]
    fn test_unparseable_custom_base_is_ignored() {
        assert_eq!(AssetBaseResolver::resolve(&page(), Some("not a url"), "").as_str(), "https://x.test/");
        assert_eq!(AssetBaseResolver::resolve(&page(), Some("  "), "").as_str(), "https://x.test/");
    }
}
