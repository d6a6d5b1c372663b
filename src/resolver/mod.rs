//! 解析模块：资源基址与清单路由映射
pub mod asset_base;
pub mod routes;

pub use self::asset_base::AssetBaseResolver;
pub use self::routes::{ManifestEntry, RouteResolver, is_reserved_key};
