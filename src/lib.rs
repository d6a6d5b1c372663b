//! nextray - Next.js 站点指纹识别工具
//! 从公开的 HTML 与 JS 分块推断 Next.js / React 版本，并还原构建清单中的路由与资源拓扑

// 导出全局错误类型
pub use self::error::{NextrayError, NxResult};

// 导出配置模块
pub use self::config::{ScanConfig, ConfigManager, CustomConfigBuilder};

// 导出数据模型
pub use self::model::{NextData, ScanResult, UNKNOWN_VERSION};

// 导出抓取模块核心接口
pub use self::fetch::{
    FetchError, FetchResponse, Fetcher, FetcherCapabilities, HttpFetcher, MemoryFetcher
};

// 导出提取模块核心接口
pub use self::extractor::{HtmlExtractor, NextDataOutcome, parse_next_data};

// 导出编译模块核心接口
pub use self::compiler::{PatternBundle, PatternCompiler};

// 导出检测模块核心接口
pub use self::detector::{
    ClassifiedUrls, DetectedVersions, HeuristicDetector, UrlClassifier,
    VersionCandidate, VersionDetector, is_confident_version,
};

// 导出清单与解析模块核心接口
pub use self::manifest::{ExpressionExtractor, ManifestLoader, ManifestLocator, ManifestOutcome, Sandbox};
pub use self::resolver::{AssetBaseResolver, ManifestEntry, RouteResolver};

// 导出扫描入口
pub use self::scanner::{Scanner, normalize_target};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod model;
pub mod fetch;
pub mod extractor;
pub mod utils;
pub mod compiler;
pub mod detector;
pub mod manifest;
pub mod resolver;
pub mod scanner;
