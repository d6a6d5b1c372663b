//! 命名正则模式集合
//! 扫描器创建时编译一次，之后以引用方式传入各组件，不存在全局可变状态

use std::time::Instant;
use regex::Regex;
use tracing::debug;

use crate::error::NxResult;

/// 宽松的语义化版本字面量：`"X.Y.Z<任意非引号后缀>"`
const LOOSE_VERSION: &str = r#"["'](\d+\.\d+\.\d+[^"']*)["']"#;

/// 全局对象 `window.next = { ... }`
const GLOBAL_NEXT: &str = r#"(?:window|self|globalThis)\.next\s*=\s*\{[^{}]*?\bversion\s*:\s*"#;

/// 编译后的模式集合
#[derive(Debug, Clone)]
pub struct PatternBundle {
    /// 任意引号包裹的版本字面量
    pub loose_version: Regex,
    /// `window.next = { version: "15.2.0" }`
    pub global_direct: Regex,
    /// `window.next = { version: H }`，捕获标识符
    pub global_indirect: Regex,
    /// `let|var|const X = "15.2.0"`
    pub declared_version: Regex,
    /// `self.__BUILD_MANIFEST =`
    pub manifest_assign: Regex,
}

impl PatternBundle {
    /// 针对具体标识符的声明模式：`let H = "…"` 或声明列表中的 `, H = "…"`
    pub fn declaration_of(&self, ident: &str) -> NxResult<Regex> {
        let pattern = format!(
            r#"(?:\b(?:let|var|const)\s+|,\s*){}\s*=\s*{}"#,
            regex::escape(ident),
            LOOSE_VERSION
        );
        Ok(Regex::new(&pattern)?)
    }
}

/// 模式编译器
pub struct PatternCompiler;

impl PatternCompiler {
    /// 编译全部模式
    pub fn compile() -> NxResult<PatternBundle> {
        let start = Instant::now();

        let bundle = PatternBundle {
            loose_version: Regex::new(LOOSE_VERSION)?,
            global_direct: Regex::new(&format!("{}{}", GLOBAL_NEXT, LOOSE_VERSION))?,
            global_indirect: Regex::new(&format!(
                r#"{}([A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*)?)"#,
                GLOBAL_NEXT
            ))?,
            declared_version: Regex::new(&format!(
                r#"\b(?:let|var|const)\s+[A-Za-z_$][\w$]*\s*=\s*{}"#,
                LOOSE_VERSION
            ))?,
            manifest_assign: Regex::new(r#"self\.__BUILD_MANIFEST\s*="#)?,
        };

        debug!("模式编译完成，耗时{:?}", start.elapsed());
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> PatternBundle {
        PatternCompiler::compile().unwrap()
    }

    #[test]
    fn test_loose_version_keeps_suffix() {
        let caps = bundle().loose_version.captures(r#"x="14.2.1-canary.3";"#).unwrap();
        assert_eq!(&caps[1], "14.2.1-canary.3");
    }

    #[test]
    fn test_global_direct_and_indirect() {
        let b = bundle();
        let direct = r#"window.next={version:"13.4.19",appDir:!0}"#;
        assert_eq!(&b.global_direct.captures(direct).unwrap()[1], "13.4.19");

        let indirect = r#"window.next = { version: H, appDir: !0 }"#;
        assert!(b.global_direct.captures(indirect).is_none());
        assert_eq!(&b.global_indirect.captures(indirect).unwrap()[1], "H");
    }

    #[test]
    fn test_declaration_of_identifier() {
        let b = bundle();
        let re = b.declaration_of("H").unwrap();
        let src = r#"let a="1.0.0",H="15.2.0";"#;
        assert_eq!(&re.captures(src).unwrap()[1], "15.2.0");
        assert!(re.captures(r#"let Hx="9.9.9""#).is_none());

        let dollar = b.declaration_of("$v").unwrap();
        assert_eq!(&dollar.captures(r#"var $v = '1.2.3'"#).unwrap()[1], "1.2.3");
    }

    #[test]
    fn test_manifest_assign_ignores_callback() {
        let b = bundle();
        assert!(b.manifest_assign.is_match("self.__BUILD_MANIFEST = {}"));
        assert!(!b.manifest_assign.is_match("self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB()"));
    }
}
