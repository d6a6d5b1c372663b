//! 提取模块：HTML 标签与内嵌配置载荷
pub mod html_extractor;
pub mod next_data;

pub use self::html_extractor::HtmlExtractor;
pub use self::next_data::{NextDataOutcome, parse_next_data};
