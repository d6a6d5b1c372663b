//! 全局错误类型定义

use thiserror::Error;
use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

use crate::fetch::FetchError;

#[derive(Error, Debug)]
pub enum NextrayError {
    // 抓取相关错误
    #[error("抓取失败：{0}")]
    Fetch(#[from] FetchError),

    // __NEXT_DATA__ 相关错误
    #[error("__NEXT_DATA__ 脚本标签未找到")]
    NextDataAbsent,
    #[error("__NEXT_DATA__ JSON 解析失败：{0}")]
    NextDataParse(String),
    #[error("__NEXT_DATA__ 已找到，但缺少必要字段（buildId、props）")]
    NextDataIncomplete,

    // 构建清单相关错误
    #[error("构建清单拉取失败 {url}：{source}")]
    ManifestFetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("构建清单表达式提取失败：{0}")]
    ManifestExtract(String),
    #[error("构建清单表达式解析失败：{0}")]
    ManifestParse(String),
    #[error("构建清单求值失败：{0}")]
    ManifestEval(String),
    #[error("构建清单未求值为对象，实际类型：{0}")]
    ManifestNotObject(&'static str),

    // 编译相关错误
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl NextrayError {
    /// 是否为“__NEXT_DATA__ 不存在”（不视为错误的缺省情况）
    pub fn is_absent(&self) -> bool {
        matches!(self, NextrayError::NextDataAbsent)
    }
}

// 全局Result类型
pub type NxResult<T> = Result<T, NextrayError>;
