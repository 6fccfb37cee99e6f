//! 哈希表核心模块 - 实现可扩展哈希表及其组件

pub mod bucket;
pub mod directory;
pub mod extendible_map;

pub use bucket::Bucket;
pub use directory::Directory;
pub use extendible_map::{BucketInfo, ExtendibleMap, ExtendibleMapConfig, ExtendibleMapStats};

use once_cell::sync::Lazy;

/// 全局默认配置
pub static DEFAULT_CONFIG: Lazy<ExtendibleMapConfig> = Lazy::new(ExtendibleMapConfig::default);

// 预定义的桶容量常量
pub const DEFAULT_BUCKET_CAPACITY: usize = 4;
pub const DEFAULT_INITIAL_GLOBAL_DEPTH: u32 = 1;
/// 默认目录长度上限，2^24 个槽位
pub const DEFAULT_MAX_DIRECTORY_LEN: usize = 1 << 24;

impl Default for ExtendibleMap {
    fn default() -> Self {
        // 默认配置总能通过校验
        match ExtendibleMap::new(DEFAULT_CONFIG.clone()) {
            Ok(map) => map,
            Err(e) => unreachable!("默认配置无效: {}", e),
        }
    }
}
