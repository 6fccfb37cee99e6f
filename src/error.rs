//! 统一错误处理 - 可扩展哈希表可能出现的错误类型

use crate::types::{BucketId, Key};

/// 可扩展哈希表可能发生的错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtendibleError {
    /// 桶已满，只在桶与控制器之间传递，调用方不会看到
    #[error("桶已满 (容量: {capacity})")]
    BucketFull {
        capacity: usize,
    },

    #[error("容量超限: 键 {key} 需要局部深度 {required_depth}，超过最大全局深度 {max_depth}")]
    CapacityExceeded {
        key: Key,
        required_depth: u32,
        max_depth: u32,
    },

    #[error("无效配置: {reason}")]
    InvalidConfig {
        reason: String,
    },

    /// 目录扩容分配失败，由控制器转换为 `CapacityExceeded`
    #[error("目录分配失败: 全局深度 {depth}")]
    DirectoryAllocation {
        depth: u32,
    },

    #[error("找不到桶: {id:?}")]
    BucketNotFound {
        id: BucketId,
    },
}

impl ExtendibleError {
    /// 获取错误恢复建议
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::BucketFull { .. } => Some("分裂桶后重试插入"),
            Self::CapacityExceeded { .. } => Some("增大桶容量、提高最大全局深度或放宽目录长度上限"),
            Self::InvalidConfig { .. } => Some("检查配置参数"),
            Self::DirectoryAllocation { .. } => Some("降低 max_directory_len 或提高桶容量"),
            Self::BucketNotFound { .. } => None,
        }
    }

    /// 判断错误是否可恢复
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::BucketFull { .. })
    }
}
