// src/map/directory.rs
//! 目录 - 长度为 2^global_depth 的桶编号数组
//!
//! 同一个桶可以被多个槽位引用：局部深度为 d 的桶恰好被
//! 2^(global_depth - d) 个槽位引用，这些槽位的低 d 位相同。

use crate::{
    error::ExtendibleError,
    types::{low_bits, BucketId, Key},
};

#[derive(Debug, Clone)]
pub struct Directory {
    global_depth: u32,
    slots: Vec<BucketId>,
}

// 目录至少有一个槽位
#[allow(clippy::len_without_is_empty)]
impl Directory {
    /// 由初始桶编号创建目录，`buckets.len()` 必须等于 2^global_depth
    pub fn new(global_depth: u32, buckets: Vec<BucketId>) -> Self {
        debug_assert_eq!(buckets.len(), 1usize << global_depth);
        Self {
            global_depth,
            slots: buckets,
        }
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[BucketId] {
        &self.slots
    }

    /// 键的低 global_depth 位即槽位下标
    #[inline]
    pub fn index_of(&self, key: Key) -> usize {
        low_bits(key, self.global_depth)
    }

    #[inline]
    pub fn bucket_at(&self, index: usize) -> BucketId {
        self.slots[index]
    }

    #[inline]
    pub fn bucket_for(&self, key: Key) -> BucketId {
        self.bucket_at(self.index_of(key))
    }

    /// 预留全局深度为 `depth` 时所需的槽位，目录内容不变
    ///
    /// 分配失败时返回 `DirectoryAllocation` 而不是中止进程。
    pub fn reserve_for_depth(&mut self, depth: u32) -> Result<(), ExtendibleError> {
        let target = 1usize
            .checked_shl(depth)
            .ok_or(ExtendibleError::DirectoryAllocation { depth })?;
        let additional = target.saturating_sub(self.slots.len());
        self.slots
            .try_reserve_exact(additional)
            .map_err(|_| ExtendibleError::DirectoryAllocation { depth })
    }

    /// 目录倍增：新下标 i + len 复制 i 的引用
    pub fn expand(&mut self) -> Result<(), ExtendibleError> {
        self.reserve_for_depth(self.global_depth + 1)?;
        self.slots.extend_from_within(..);
        self.global_depth += 1;
        Ok(())
    }

    /// 把所有指向 `old` 的槽位按第 `depth` 位改指向 `low` 或 `high`
    ///
    /// 返回改写的槽位数。
    pub fn repoint(&mut self, old: BucketId, depth: u32, low: BucketId, high: BucketId) -> usize {
        let mut rewritten = 0;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if *slot == old {
                *slot = if (i >> depth) & 1 == 0 { low } else { high };
                rewritten += 1;
            }
        }
        rewritten
    }

    /// 每个桶编号被引用的槽位数，下标为桶编号
    pub fn fan_in_counts(&self, bucket_slots: usize) -> Vec<usize> {
        let mut counts = vec![0usize; bucket_slots];
        for id in &self.slots {
            if let Some(count) = counts.get_mut(id.0) {
                *count += 1;
            }
        }
        counts
    }

    /// 检查 `key` 与槽位 `index` 在低 `depth` 位上是否一致
    #[cfg(test)]
    pub fn slot_matches(index: usize, key: Key, depth: u32) -> bool {
        (0..depth).all(|bit| (index >> bit) & 1 == crate::types::routing_bit(key, bit))
    }
}
