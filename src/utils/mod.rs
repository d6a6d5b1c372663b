//! 工具模块
pub mod url_path;

pub use self::url_path::{clean_path, has_next_segment, join_path, join_under_next, replace_path};
