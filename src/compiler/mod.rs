//! 编译模块：启动时一次性编译全部命名正则，以只读方式在各组件间共享
pub mod pattern;

pub use self::pattern::{PatternBundle, PatternCompiler};
