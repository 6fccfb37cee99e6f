//! Rust 内存可扩展哈希表库
//!
//! 整数键到整数值的字典。目录按倍数增长，桶各自独立分裂，
//! 键分布不均时无需整体重哈希。
//!
//! ## 主要特性
//! - 期望 O(1) 的查询与插入
//! - 满桶分裂，必要时目录倍增
//! - 分裂次数有上限，无法容纳时返回 `CapacityExceeded` 而不是无限递归
//! - 操作统计与 Prometheus 导出
//!
//! ## 快速开始
//!
//! ```rust
//! use extendible_hashtable::*;
//!
//! fn main() -> Result<(), ExtendibleError> {
//!     // 桶容量 2，初始全局深度 1
//!     let mut map = ExtendibleMap::with_capacity(2, 1)?;
//!
//!     for k in 0..5 {
//!         map.insert(k, k)?;
//!     }
//!
//!     assert_eq!(map.get(3), Some(3));
//!     assert_eq!(map.get(42), None);
//!
//!     map.remove(3);
//!     assert_eq!(map.get(3), None);
//!
//!     println!("{:?}", map.stats());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}

// 核心模块导出
pub mod error;
pub mod map;
pub mod stats;
pub mod types;

// 公共接口导出
pub use crate::{
    error::ExtendibleError,
    map::{
        Bucket, BucketInfo, Directory, ExtendibleMap, ExtendibleMapConfig, ExtendibleMapStats,
        DEFAULT_BUCKET_CAPACITY, DEFAULT_CONFIG, DEFAULT_INITIAL_GLOBAL_DEPTH,
        DEFAULT_MAX_DIRECTORY_LEN,
    },
    stats::{DisabledStatsRecorder, GlobalStatsRecorder, StatsRecorder, StatsRecorderFactory},
    types::{BucketId, Entry, Key, OperationType, Value, KEY_BITS},
};

/// 批量插入，返回成功条数
///
/// 遇到 `CapacityExceeded` 的条目被跳过，其余继续插入。
pub fn batch_insert(map: &mut ExtendibleMap, items: impl IntoIterator<Item = (Key, Value)>) -> usize {
    let mut count = 0;
    for (k, v) in items {
        match map.insert(k, v) {
            Ok(_) => count += 1,
            Err(_e) => {
                log_error!("batch insert skipped key {}: {}", k, _e);
            }
        }
    }
    count
}

/// 批量查询
pub fn batch_get(map: &ExtendibleMap, keys: impl IntoIterator<Item = Key>) -> Vec<Option<Value>> {
    keys.into_iter().map(|k| map.get(k)).collect()
}
