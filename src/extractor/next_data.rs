//! __NEXT_DATA__ 载荷解析

use tracing::debug;

use crate::error::NextrayError;
use crate::model::NextData;

/// 载荷解析结果
#[derive(Debug)]
pub enum NextDataOutcome {
    /// 页面中没有 __NEXT_DATA__
    Absent,
    /// 内容不是合法 JSON
    Malformed { raw: String, error: String },
    /// JSON 合法但缺少 buildId 或 props
    Incomplete { data: NextData, raw: String },
    /// 完整载荷
    Valid { data: NextData, raw: String },
}

impl NextDataOutcome {
    pub fn data(&self) -> Option<&NextData> {
        match self {
            NextDataOutcome::Incomplete { data, .. } | NextDataOutcome::Valid { data, .. } => Some(data),
            _ => None,
        }
    }

    /// 原始文本（诊断用）
    pub fn raw(&self) -> &str {
        match self {
            NextDataOutcome::Absent => "",
            NextDataOutcome::Malformed { raw, .. }
            | NextDataOutcome::Incomplete { raw, .. }
            | NextDataOutcome::Valid { raw, .. } => raw,
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, NextDataOutcome::Valid { .. })
    }

    /// 转换为错误；完整载荷返回 None
    pub fn error(&self) -> Option<NextrayError> {
        match self {
            NextDataOutcome::Absent => Some(NextrayError::NextDataAbsent),
            NextDataOutcome::Malformed { error, .. } => Some(NextrayError::NextDataParse(error.clone())),
            NextDataOutcome::Incomplete { .. } => Some(NextrayError::NextDataIncomplete),
            NextDataOutcome::Valid { .. } => None,
        }
    }
}

/// 解析 __NEXT_DATA__ 原始文本
pub fn parse_next_data(raw: Option<String>) -> NextDataOutcome {
    let Some(raw) = raw else {
        return NextDataOutcome::Absent;
    };

    match serde_json::from_str::<NextData>(&raw) {
        Ok(data) if data.is_complete() => {
            debug!("__NEXT_DATA__ 解析成功，buildId={}", data.build_id());
            NextDataOutcome::Valid { data, raw }
        }
        Ok(data) => NextDataOutcome::Incomplete { data, raw },
        Err(e) => NextDataOutcome::Malformed { raw, error: e.to_string() },
    }
}
