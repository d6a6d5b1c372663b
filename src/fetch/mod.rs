//! 抓取模块：内容获取能力的抽象与实现
//! 扫描流程只依赖 `Fetcher` 接口，传输细节（重定向、UA 轮换、超时）由实现自行负责
pub mod http_fetcher;
pub mod memory_fetcher;

use async_trait::async_trait;
use thiserror::Error;

pub use self::http_fetcher::HttpFetcher;
pub use self::memory_fetcher::MemoryFetcher;

/// 抓取结果：响应体 + 重定向后的最终URL
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub body: Vec<u8>,
    pub final_url: String,
}

impl FetchResponse {
    /// 以宽松 UTF-8 解码响应体
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 抓取错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("bad status code fetching {url}: {status}")]
    BadStatus { url: String, status: u16 },
    #[error("transport error fetching {url}: {message}")]
    Transport { url: String, message: String },
    #[error("invalid url {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl FetchError {
    /// 非 200 状态码（若有）
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::BadStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 404 / 403：资源“不存在”的信号
    pub fn is_not_found_or_forbidden(&self) -> bool {
        matches!(self.status(), Some(404) | Some(403))
    }
}

/// 抓取器能力描述
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetcherCapabilities {
    pub can_execute_javascript: bool,
    pub can_query_dom: bool,
}

/// 内容抓取接口
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// 获取目标URL内容，跟随重定向；非 200 状态返回 `FetchError::BadStatus`
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;

    fn capabilities(&self) -> FetcherCapabilities {
        FetcherCapabilities::default()
    }
}
