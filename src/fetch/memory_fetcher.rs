//! 内存抓取器：按URL返回预置内容，用于离线重放与测试

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{FetchError, FetchResponse, Fetcher};

#[derive(Debug, Clone)]
enum Entry {
    Body { body: Vec<u8>, final_url: Option<String> },
    Status(u16),
}

/// 内存抓取器
/// 未登记的URL按 404 处理
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Entry>,
    requested: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记URL内容
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.entries.insert(url.into(), Entry::Body { body: body.into(), final_url: None });
        self
    }

    /// 登记带重定向的URL内容
    pub fn with_redirect(
        mut self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.entries.insert(
            url.into(),
            Entry::Body { body: body.into(), final_url: Some(final_url.into()) },
        );
        self
    }

    /// 登记URL返回的状态码
    pub fn with_status(mut self, url: impl Into<String>, status: u16) -> Self {
        self.entries.insert(url.into(), Entry::Status(status));
        self
    }

    /// 已请求过的URL（按请求顺序）
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }

        match self.entries.get(url) {
            Some(Entry::Body { body, final_url }) => Ok(FetchResponse {
                body: body.clone(),
                final_url: final_url.clone().unwrap_or_else(|| url.to_string()),
            }),
            Some(Entry::Status(status)) => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
