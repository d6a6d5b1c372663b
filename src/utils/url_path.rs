//! URL 路径拼接工具
//! 路径按 `/` 分段规范化（去除空段与 `.`，处理 `..`），拼接结果始终以 `/` 开头

use url::Url;

/// Next.js 静态资源目录段
pub const NEXT_SEGMENT: &str = "_next";

/// 规范化路径
pub fn clean_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// 拼接多个路径片段并规范化
pub fn join_path(parts: &[&str]) -> String {
    let joined = parts.iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    clean_path(&joined)
}

/// 路径中是否已包含 `_next` 段
pub fn has_next_segment(path: &str) -> bool {
    path.split('/').any(|segment| segment == NEXT_SEGMENT)
}

/// 以新路径替换URL路径，丢弃查询串与片段
pub fn replace_path(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// 在资源基址的 `_next` 目录下拼接相对路径；基址已包含 `_next` 段时不再重复追加
pub fn join_under_next(base: &Url, relative: &[&str]) -> Url {
    let base_path = base.path();
    let mut parts = vec![base_path];
    if !has_next_segment(base_path) {
        parts.push(NEXT_SEGMENT);
    }
    parts.extend_from_slice(relative);
    replace_path(base, &join_path(&parts))
}
