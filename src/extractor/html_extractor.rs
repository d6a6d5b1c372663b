//! HTML标签提取器
//! 负责从HTML中提取script-src和 __NEXT_DATA__ 脚本内容

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts
};
use html5ever::tokenizer::states::RawKind;
use markup5ever::interface::Attribute;
use tendril::StrTendril;
use tracing::debug;
use url::Url;

/// Next.js 内嵌数据脚本的 id
const NEXT_DATA_ID: &str = "__NEXT_DATA__";
/// Next.js 静态资源路径特征
const NEXT_STATIC_MARKER: &str = "/_next/static/";

#[derive(Debug, Default, Clone)]
pub struct HtmlExtractor {
    script_srcs: RefCell<Vec<String>>,
    next_data: RefCell<Option<String>>,
    in_next_data: Cell<bool>,
}

impl TokenSink for HtmlExtractor {
    type Handle = ();

    fn process_token(&self, token: Token, _line: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(Tag { kind: TagKind::StartTag, name, attrs, .. }) => {
                match name.as_ref() {
                    "script" => {
                        self.extract_script(&attrs);
                        // 脚本内容按原始文本处理，避免 JSON 中的 `<` 被当作标签
                        return TokenSinkResult::RawData(RawKind::ScriptData);
                    }
                    "style" => return TokenSinkResult::RawData(RawKind::Rawtext),
                    _ => {}
                }
            }
            Token::TagToken(Tag { kind: TagKind::EndTag, name, .. }) => {
                if name.as_ref() == "script" {
                    self.in_next_data.set(false);
                }
            }
            Token::CharacterTokens(text) => {
                if self.in_next_data.get() {
                    if let Some(buf) = self.next_data.borrow_mut().as_mut() {
                        buf.push_str(&text);
                    }
                }
            }
            _ => {}
        }
        TokenSinkResult::Continue
    }
}

impl HtmlExtractor {
    /// 创建新的提取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从HTML字符串提取标签
    pub fn extract(&self, html: &str) -> Self {
        let tokenizer = Tokenizer::new(self.clone(), TokenizerOpts::default());
        let queue = BufferQueue::default();
        queue.push_back(StrTendril::from(html));

        let _ = tokenizer.feed(&queue);
        tokenizer.end();

        tokenizer.sink
    }

    /// 处理script开始标签：记录src，识别 __NEXT_DATA__
    fn extract_script(&self, attrs: &[Attribute]) {
        for attr in attrs {
            match attr.name.local.as_ref() {
                "src" => self.script_srcs.borrow_mut().push(attr.value.to_string()),
                "id" if &*attr.value == NEXT_DATA_ID => {
                    // 只保留第一个 __NEXT_DATA__
                    if self.next_data.borrow().is_none() {
                        *self.next_data.borrow_mut() = Some(String::new());
                        self.in_next_data.set(true);
                    }
                }
                _ => {}
            }
        }
    }

    /// 获取提取到的script-src列表
    pub fn get_script_srcs(&self) -> Vec<String> {
        self.script_srcs.borrow().clone()
    }

    /// 获取 __NEXT_DATA__ 原始文本（空内容视为不存在）
    pub fn get_next_data(&self) -> Option<String> {
        self.next_data.borrow().as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// 筛选 Next.js 静态 JS 分块，并相对资源基址解析为绝对URL
    pub fn next_chunk_urls(&self, asset_base: &Url) -> BTreeSet<String> {
        let mut urls = BTreeSet::new();
        for src in self.script_srcs.borrow().iter() {
            if src.is_empty() || !src.contains(NEXT_STATIC_MARKER) {
                continue;
            }
            match asset_base.join(src) {
                Ok(resolved) if resolved.path().ends_with(".js") => {
                    urls.insert(resolved.to_string());
                }
                Ok(_) => {}
                Err(e) => debug!("无法解析脚本地址 '{}'：{}", src, e),
            }
        }
        debug!("HTML中发现 {} 个 Next.js 初始分块脚本", urls.len());
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_extractor() {
        let html = r#"
            <script src="/_next/static/chunks/main-abc.js"></script>
            <script id="__NEXT_DATA__" type="application/json">{"buildId":"b1","html":"<b>x</b>"}</script>
            <script src="/vue.global.js"></script>
        "#;

        let extractor = HtmlExtractor::new();
        let result = extractor.extract(html);

        assert_eq!(
            result.get_script_srcs(),
            vec!["/_next/static/chunks/main-abc.js".to_string(), "/vue.global.js".to_string()]
        );
        assert_eq!(
            result.get_next_data().as_deref(),
            Some(r#"{"buildId":"b1","html":"<b>x</b>"}"#)
        );
    }

    #[test]
    fn test_next_chunk_urls_filters_and_resolves() {
        let html = r#"
            <script src="/_next/static/chunks/webpack-1.js"></script>
            <script src="/_next/static/css/app.css"></script>
            <script src="https://cdn.test/_next/static/chunks/framework-2.js?v=1"></script>
            <script src="/assets/other.js"></script>
        "#;
        let result = HtmlExtractor::new().extract(html);
        let base = Url::parse("https://site.test/").unwrap();

        let urls: Vec<String> = result.next_chunk_urls(&base).into_iter().collect();
        assert_eq!(
            urls,
            vec![
                "https://cdn.test/_next/static/chunks/framework-2.js?v=1".to_string(),
                "https://site.test/_next/static/chunks/webpack-1.js".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_next_data() {
        let result = HtmlExtractor::new().extract("<html><body>hi</body></html>");
        assert!(result.get_next_data().is_none());
        assert!(result.get_script_srcs().is_empty());
    }
}
