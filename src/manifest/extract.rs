//! 构建清单表达式提取
//! 清单脚本形如 `self.__BUILD_MANIFEST = <表达式>;self.__BUILD_MANIFEST_CB && self.__BUILD_MANIFEST_CB()`，
//! 这里只取出赋值号右侧的单个表达式交给沙箱求值

use tracing::debug;

use super::sandbox::{expression_prefix_len, top_level_assignment};
use crate::compiler::PatternBundle;
use crate::error::{NextrayError, NxResult};

/// 回调调用标记
const MANIFEST_CALLBACK: &str = "self.__BUILD_MANIFEST_CB";

/// 表达式提取器
pub struct ExpressionExtractor;

impl ExpressionExtractor {
    /// 提取清单表达式源码
    pub fn extract(patterns: &PatternBundle, script: &str) -> NxResult<String> {
        if let Some(assign) = patterns.manifest_assign.find(script) {
            let rest = &script[assign.end()..];
            match expression_prefix_len(rest) {
                Ok(len) if len > 0 => {
                    debug!("清单表达式提取：命中 self.__BUILD_MANIFEST 赋值，表达式长度 {}", len);
                    return Ok(rest[..len].trim().to_string());
                }
                Ok(_) => debug!("清单表达式提取：赋值号后为空，使用回退提取"),
                Err(e) => debug!("清单表达式提取：赋值号后表达式无法配平（{}），使用回退提取", e),
            }
        }

        Self::fallback(script)
    }

    /// 回退：截断回调调用，去除结尾分号，取顶层赋值右侧（无赋值时取全文），整体加括号
    fn fallback(script: &str) -> NxResult<String> {
        let truncated = match script.find(MANIFEST_CALLBACK) {
            Some(idx) => &script[..idx],
            None => script,
        };
        let trimmed = truncated.trim_end_matches(|c: char| c == ';' || c == ',' || c.is_whitespace());

        let expression = match top_level_assignment(trimmed) {
            Some(idx) => &trimmed[idx + 1..],
            None => trimmed,
        };
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(NextrayError::ManifestExtract("清单脚本中没有可提取的表达式".to_string()));
        }

        debug!("清单表达式提取：回退提取，表达式长度 {}", expression.len());
        Ok(format!("({})", expression))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PatternCompiler;

    fn patterns() -> PatternBundle {
        PatternCompiler::compile().unwrap()
    }

    #[test]
    fn test_extract_assignment_expression() {
        let script = r#"self.__BUILD_MANIFEST=function(s){return {"/":[s],"/x":["a=b.js"]}}("c.js"),self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB();"#;
        let expr = ExpressionExtractor::extract(&patterns(), script).unwrap();
        assert_eq!(expr, r#"function(s){return {"/":[s],"/x":["a=b.js"]}}("c.js")"#);
    }

    #[test]
    fn test_extract_plain_object_with_trailing_code() {
        let script = "self.__BUILD_MANIFEST = {\"/\": [\"a.js\"]};\nself.__BUILD_MANIFEST_CB && self.__BUILD_MANIFEST_CB()";
        let expr = ExpressionExtractor::extract(&patterns(), script).unwrap();
        assert_eq!(expr, "{\"/\": [\"a.js\"]}");
    }

    #[test]
    fn test_fallback_without_marker() {
        let expr = ExpressionExtractor::extract(&patterns(), "m.manifest = {\"/\":[\"k==v.js\"]};;\n").unwrap();
        assert_eq!(expr, "({\"/\":[\"k==v.js\"]})");

        let expr = ExpressionExtractor::extract(&patterns(), "{\"/\":[]}").unwrap();
        assert_eq!(expr, "({\"/\":[]})");
    }

    #[test]
    fn test_fallback_strips_comma_before_callback() {
        let script = r#"globalThis.__BUILD_MANIFEST=function(a){return{"/":[a]}}("static/a.js"),self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB();"#;
        let expr = ExpressionExtractor::extract(&patterns(), script).unwrap();
        assert_eq!(expr, r#"(function(a){return{"/":[a]}}("static/a.js"))"#);

        let value = crate::manifest::Sandbox::default().evaluate_object(&expr).unwrap();
        assert_eq!(value["/"], serde_json::json!(["static/a.js"]));
    }

    #[test]
    fn test_fallback_when_assignment_unbalanced() {
        // 赋值号后的表达式无法解析时，走回退路径并保留原始文本
        let script = "self.__BUILD_MANIFEST = {a:1;self.__BUILD_MANIFEST_CB()";
        let expr = ExpressionExtractor::extract(&patterns(), script).unwrap();
        assert_eq!(expr, "({a:1)");
    }

    #[test]
    fn test_empty_script_is_error() {
        let err = ExpressionExtractor::extract(&patterns(), " ;\n").unwrap_err();
        assert!(matches!(err, NextrayError::ManifestExtract(_)));
    }
}
