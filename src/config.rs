//! 全局配置管理,存储所有可配置项

/// 默认的浏览器 User-Agent 轮换列表（遇到 403 时依次尝试）
const DEFAULT_USER_AGENTS: [&str; 2] = [
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:87.0) Gecko/20100101 Firefox/87.0",
];

/// 扫描配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    // 自定义资源基址（覆盖自动探测的页面基址）
    pub custom_base_url: Option<String>,
    // 超时配置（单位：秒）
    pub http_timeout: u64,
    // User-Agent 轮换列表
    pub user_agents: Vec<String>,
    // 版本号上下文窗口（匹配两侧各取的字符数）
    pub context_window: usize,
    // 清单求值的步数上限
    pub eval_step_budget: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            custom_base_url: None,
            http_timeout: 30,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            context_window: 30,
            eval_step_budget: 200_000,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> ScanConfig {
        ScanConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: ScanConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 空字符串视为未设置
    pub fn custom_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.custom_base_url = if url.trim().is_empty() { None } else { Some(url) };
        self
    }

    pub fn http_timeout(mut self, timeout: u64) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn user_agents(mut self, user_agents: Vec<String>) -> Self {
        self.config.user_agents = user_agents;
        self
    }

    pub fn context_window(mut self, window: usize) -> Self {
        self.config.context_window = window;
        self
    }

    pub fn eval_step_budget(mut self, budget: usize) -> Self {
        self.config.eval_step_budget = budget;
        self
    }

    pub fn build(self) -> ScanConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides_defaults() {
        let config = ConfigManager::custom()
            .custom_base_url("https://cdn.example.com/")
            .http_timeout(5)
            .build();

        assert_eq!(config.custom_base_url.as_deref(), Some("https://cdn.example.com/"));
        assert_eq!(config.http_timeout, 5);
        assert_eq!(config.context_window, 30);
        assert_eq!(config.user_agents.len(), 2);
    }

    #[test]
    fn test_every_option_has_a_setter() {
        let ScanConfig { custom_base_url, http_timeout, user_agents, context_window, eval_step_budget } =
            ConfigManager::custom()
                .custom_base_url("https://cdn.example.com/")
                .http_timeout(3)
                .user_agents(vec!["ua".to_string()])
                .context_window(12)
                .eval_step_budget(500)
                .build();

        assert!(custom_base_url.is_some());
        assert_eq!((http_timeout, context_window, eval_step_budget), (3, 12, 500));
        assert_eq!(user_agents, vec!["ua".to_string()]);
    }

    #[test]
    fn test_blank_base_url_is_unset() {
        let config = ConfigManager::custom().custom_base_url("  ").build();
        assert!(config.custom_base_url.is_none());
    }
}
