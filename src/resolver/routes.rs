//! 清单 -> 路由/资源索引
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::utils::join_under_next;

/// 清单中 `sortedPages` 键，不是路由
const SORTED_PAGES_KEY: &str = "sortedPages";
/// 保留的资源扩展名
const ASSET_EXTENSIONS: [&str; 2] = [".js", ".css"];

/// 清单条目取值形态
#[derive(Debug, Clone, PartialEq)]
pub enum ManifestEntry<'a> {
    /// 单个资源路径（仅 .js / .css）
    Path(&'a str),
    /// 资源路径数组（元素可能不是字符串）
    Paths(&'a [Value]),
    /// 其他形态，附带类型名
    Other(&'static str),
}

impl<'a> ManifestEntry<'a> {
    pub fn decode(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => ManifestEntry::Paths(items),
            Value::String(s) if is_asset(s) => ManifestEntry::Path(s),
            Value::String(_) => ManifestEntry::Other("string"),
            Value::Null => ManifestEntry::Other("null"),
            Value::Bool(_) => ManifestEntry::Other("boolean"),
            Value::Number(_) => ManifestEntry::Other("number"),
            Value::Object(_) => ManifestEntry::Other("object"),
        }
    }
}

fn is_asset(path: &str) -> bool {
    ASSET_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// 是否为清单中的非路由键
pub fn is_reserved_key(key: &str) -> bool {
    key.starts_with("__") || key == SORTED_PAGES_KEY
}

/// 路由解析器
pub struct RouteResolver;

impl RouteResolver {
    /// 将资源相对路径解析到 `<资源基址>/[_next/]` 下
    pub fn asset_url(asset_base: &Url, asset_path: &str) -> Url {
        join_under_next(asset_base, &[asset_path.trim_start_matches('/')])
    }

    /// 将清单映射为路由表与资源全集
    pub fn resolve(
        manifest: &Map<String, Value>,
        asset_base: &Url,
    ) -> (BTreeMap<String, Vec<String>>, BTreeSet<String>) {
        let mut routes = BTreeMap::new();
        let mut all_assets = BTreeSet::new();

        for (route, value) in manifest {
            if is_reserved_key(route) {
                continue;
            }

            let single;
            let items: &[Value] = match ManifestEntry::decode(value) {
                ManifestEntry::Paths(items) => items,
                ManifestEntry::Path(_) => {
                    single = [value.clone()];
                    &single
                }
                ManifestEntry::Other(kind) => {
                    warn!("跳过路由 '{}'：期望资源数组，实际为 {}", route, kind);
                    continue;
                }
            };

            let mut assets = Vec::with_capacity(items.len());
            for item in items {
                let Some(path) = item.as_str() else {
                    warn!("跳过路由 '{}' 中的非字符串资源", route);
                    continue;
                };
                if !is_asset(path) {
                    continue;
                }
                let url = Self::asset_url(asset_base, path).to_string();
                all_assets.insert(url.clone());
                assets.push(url);
            }
            assets.sort();
            routes.insert(route.clone(), assets);
        }

        debug!("清单解析完成：{} 个路由，{} 个资源", routes.len(), all_assets.len());
        (routes, all_assets)
    }
}
