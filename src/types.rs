//! 核心类型定义 - 共享类型和常量

use std::fmt;

/// 键类型 - 定宽整数
pub type Key = i32;

/// 值类型 - 定宽整数
pub type Value = i32;

/// 键的位宽，决定局部深度和全局深度的上限
pub const KEY_BITS: u32 = Key::BITS;

/// 取键的第 `depth` 位（从最低位开始计数）
///
/// 目录寻址、分裂时的条目重分配以及目录槽位重定向都使用同一套低位规则。
#[inline]
pub fn routing_bit(key: Key, depth: u32) -> usize {
    debug_assert!(depth < KEY_BITS);
    ((key as u32 >> depth) & 1) as usize
}

/// 取键的低 `depth` 位
#[inline]
pub fn low_bits(key: Key, depth: u32) -> usize {
    debug_assert!(depth <= KEY_BITS);
    let mask = (1u64 << depth) - 1;
    (u64::from(key as u32) & mask) as usize
}

/// 桶在桶池中的编号
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId(pub usize);

impl fmt::Debug for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId({})", self.0)
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 键值对
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    pub const fn new(key: Key, value: Value) -> Self {
        Self { key, value }
    }
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// 插入新键
    Insert,
    /// 覆盖已有键
    Update,
    /// 查询
    Get,
    /// 删除
    Remove,
    /// 桶分裂
    Split,
    /// 目录倍增
    Expand,
}

impl OperationType {
    pub const ALL: [OperationType; 6] = [
        OperationType::Insert,
        OperationType::Update,
        OperationType::Get,
        OperationType::Remove,
        OperationType::Split,
        OperationType::Expand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Insert => "insert",
            OperationType::Update => "update",
            OperationType::Get => "get",
            OperationType::Remove => "remove",
            OperationType::Split => "split",
            OperationType::Expand => "expand",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
