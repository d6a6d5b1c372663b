//! 基于 reqwest 的 HTTP 抓取器
//! 依次使用配置中的 User-Agent 发起请求，遇到 403 时切换到下一个

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::{FetchError, FetchResponse, Fetcher};
use crate::config::ScanConfig;
use crate::error::NxResult;

/// HTTP 抓取器
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    user_agents: Vec<String>,
}

impl HttpFetcher {
    /// 按配置创建抓取器
    pub fn new(config: &ScanConfig) -> NxResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout))
            .build()
            .map_err(|e| crate::error::NextrayError::InvalidInput(format!("HTTP客户端初始化失败：{}", e)))?;

        let mut user_agents = config.user_agents.clone();
        if user_agents.is_empty() {
            user_agents.push(format!("nextray/{}", env!("CARGO_PKG_VERSION")));
        }

        Ok(Self { client, user_agents })
    }

    /// 单次请求
    async fn fetch_once(&self, url: &str, user_agent: &str) -> Result<(StatusCode, String, Vec<u8>), FetchError> {
        let response = self.client.get(url)
            .header("User-Agent", user_agent)
            .header("Accept-Encoding", "gzip, deflate")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: format!("读取响应体失败：{}", e),
        })?;

        Ok((status, final_url, body.to_vec()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        if url::Url::parse(url).is_err() {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                message: "无法解析为绝对URL".to_string(),
            });
        }

        let mut last_result = None;
        for (idx, user_agent) in self.user_agents.iter().enumerate() {
            match self.fetch_once(url, user_agent).await {
                Ok((status, final_url, body)) if status == StatusCode::FORBIDDEN => {
                    warn!("UA配置 #{} 请求 {} 返回 403，尝试下一个", idx + 1, url);
                    last_result = Some(Ok((status, final_url, body)));
                }
                Ok(ok) => {
                    last_result = Some(Ok(ok));
                    break;
                }
                Err(e) => {
                    warn!("UA配置 #{} 请求 {} 失败：{}", idx + 1, url, e);
                    last_result = Some(Err(e));
                }
            }
        }

        let (status, final_url, body) = match last_result {
            Some(result) => result?,
            None => {
                return Err(FetchError::Transport {
                    url: url.to_string(),
                    message: "未配置任何 User-Agent".to_string(),
                });
            }
        };

        if status != StatusCode::OK {
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        debug!("抓取成功：{} -> {}（{} 字节）", url, final_url, body.len());
        Ok(FetchResponse { body, final_url })
    }
}
