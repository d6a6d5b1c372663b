//! 构建清单模块：定位、拉取、表达式提取与沙箱求值
pub mod sandbox;
pub mod extract;
pub mod locator;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use crate::compiler::PatternBundle;
use crate::error::{NextrayError, NxResult};
use crate::fetch::{FetchResponse, Fetcher};

pub use self::extract::ExpressionExtractor;
pub use self::locator::ManifestLocator;
pub use self::sandbox::Sandbox;

/// 失败时记录的清单脚本预览长度
const PREVIEW_CHARS: usize = 200;

/// 清单处理结果
#[derive(Debug)]
pub struct ManifestOutcome {
    /// 是否成功拉取到清单脚本
    pub found: bool,
    /// 求值得到的清单对象，或处理过程中的错误
    pub manifest: NxResult<Map<String, Value>>,
}

/// 清单加载器
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    patterns: Arc<PatternBundle>,
    sandbox: Sandbox,
}

impl ManifestLoader {
    pub fn new(patterns: Arc<PatternBundle>, step_budget: usize) -> Self {
        Self { patterns, sandbox: Sandbox::new(step_budget) }
    }

    /// 拉取并求值构建清单
    /// 主地址失败且配置了自定义基址与资源前缀时，尝试一次回退地址
    pub async fn load(
        &self,
        asset_base: &Url,
        build_id: &str,
        custom_base: Option<&str>,
        asset_prefix: &str,
        fetcher: &dyn Fetcher,
    ) -> ManifestOutcome {
        let manifest_url = ManifestLocator::manifest_url(asset_base, build_id);
        info!("拉取构建清单：{}", manifest_url);

        let response = match fetcher.fetch(manifest_url.as_str()).await {
            Ok(response) => response,
            Err(primary_err) => {
                warn!("构建清单拉取失败：{}", primary_err);
                match self.fetch_fallback(custom_base, asset_prefix, build_id, fetcher).await {
                    Some(response) => response,
                    None => {
                        return ManifestOutcome {
                            found: false,
                            manifest: Err(NextrayError::ManifestFetch {
                                url: manifest_url.to_string(),
                                source: primary_err,
                            }),
                        };
                    }
                }
            }
        };

        if response.final_url != manifest_url.as_str() {
            debug!("构建清单最终地址：{}", response.final_url);
        }

        let script = response.text();
        let manifest = self.evaluate(&script);
        if let Err(e) = &manifest {
            warn!("构建清单处理失败：{}", e);
            warn!("清单脚本预览：{}", preview(&script));
        }
        ManifestOutcome { found: true, manifest }
    }

    async fn fetch_fallback(
        &self,
        custom_base: Option<&str>,
        asset_prefix: &str,
        build_id: &str,
        fetcher: &dyn Fetcher,
    ) -> Option<FetchResponse> {
        let fallback = ManifestLocator::fallback_url(custom_base?, asset_prefix, build_id)?;
        info!("尝试构建清单回退地址：{}", fallback);
        match fetcher.fetch(fallback.as_str()).await {
            Ok(response) => {
                info!("已从回退地址获取构建清单：{}", response.final_url);
                Some(response)
            }
            Err(e) => {
                warn!("回退地址拉取同样失败：{}", e);
                None
            }
        }
    }

    /// 提取表达式并在沙箱中求值为对象
    pub fn evaluate(&self, script: &str) -> NxResult<Map<String, Value>> {
        let expression = ExpressionExtractor::extract(&self.patterns, script)?;
        let manifest = self.sandbox.evaluate_object(&expression)?;
        debug!("构建清单求值成功，共 {} 个键", manifest.len());
        Ok(manifest)
    }
}

fn preview(script: &str) -> String {
    let flattened = script.replace('\n', " ");
    match flattened.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flattened[..idx]),
        None => flattened,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::PatternCompiler;
    use crate::fetch::MemoryFetcher;

    const MANIFEST: &str = r#"self.__BUILD_MANIFEST=function(a){return {__rewrites:{beforeFiles:[]},"/":[a,"static/chunks/pages/index.js"],sortedPages:["/"]}}("static/chunks/main.js");self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB();"#;

    fn loader() -> ManifestLoader {
        ManifestLoader::new(Arc::new(PatternCompiler::compile().unwrap()), 200_000)
    }

    #[test]
    fn test_script_to_routes() {
        let script = r#"self.__BUILD_MANIFEST=function(s,c,e){return {__rewrites:{afterFiles:[],beforeFiles:[],fallback:[]},"/":[s,"static/chunks/pages/index-9d.js"],"/blog/[slug]":[s,c,"static/chunks/pages/blog/[slug]-4f.js"],"/_error":[e],sortedPages:["/","/_app","/_error","/blog/[slug]"]}}("static/chunks/1a.js","static/css/2b.css","static/chunks/pages/_error-7c.js"),self.__BUILD_MANIFEST_CB&&self.__BUILD_MANIFEST_CB();"#;
        let manifest = loader().evaluate(script).unwrap();

        let base = Url::parse("https://x.test/").unwrap();
        let (routes, assets) = crate::resolver::RouteResolver::resolve(&manifest, &base);
        assert_eq!(routes.keys().collect::<Vec<_>>(), vec!["/", "/_error", "/blog/[slug]"]);
        assert_eq!(
            routes["/blog/[slug]"],
            vec![
                "https://x.test/_next/static/chunks/1a.js",
                "https://x.test/_next/static/chunks/pages/blog/[slug]-4f.js",
                "https://x.test/_next/static/css/2b.css",
            ]
        );
        assert_eq!(routes["/_error"], vec!["https://x.test/_next/static/chunks/pages/_error-7c.js"]);
        assert_eq!(assets.len(), 5);
    }

    #[tokio::test]
    async fn test_load_primary() {
        let base = Url::parse("https://x.test/").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_body("https://x.test/_next/static/b1/_buildManifest.js", MANIFEST);

        let outcome = loader().load(&base, "b1", None, "", &fetcher).await;
        assert!(outcome.found);
        let manifest = outcome.manifest.unwrap();
        assert_eq!(manifest["/"][1], "static/chunks/pages/index.js");
    }

    #[tokio::test]
    async fn test_load_uses_fallback_once() {
        let base = Url::parse("https://proxy.test/cdn.test/").unwrap();
        let fallback = "https://cdn.test/_next/static/b1/_buildManifest.js";
        let fetcher = MemoryFetcher::new().with_body(fallback, MANIFEST);

        let outcome = loader()
            .load(&base, "b1", Some("https://proxy.test/"), "cdn.test", &fetcher)
            .await;
        assert!(outcome.found);
        assert!(outcome.manifest.is_ok());
        assert_eq!(
            fetcher.requested(),
            vec![
                "https://proxy.test/cdn.test/_next/static/b1/_buildManifest.js".to_string(),
                fallback.to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_load_fetch_failure_is_reported() {
        let base = Url::parse("https://x.test/").unwrap();
        let fetcher = MemoryFetcher::new();

        let outcome = loader().load(&base, "b1", None, "/assets", &fetcher).await;
        assert!(!outcome.found);
        match outcome.manifest {
            Err(NextrayError::ManifestFetch { url, source }) => {
                assert_eq!(url, "https://x.test/_next/static/b1/_buildManifest.js");
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_executable_manifest() {
        let base = Url::parse("https://x.test/").unwrap();
        let fetcher = MemoryFetcher::new()
            .with_body("https://x.test/_next/static/b1/_buildManifest.js", "self.__BUILD_MANIFEST=fetch('/steal');");

        let outcome = loader().load(&base, "b1", None, "", &fetcher).await;
        assert!(outcome.found);
        assert!(matches!(outcome.manifest, Err(NextrayError::ManifestEval(_))));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert_eq!(preview("a\nb"), "a b");
    }
}
