// src/map/bucket.rs
//! 桶实现 - 固定容量的键值对列表，附带局部深度

use crate::{
    error::ExtendibleError,
    types::{routing_bit, Entry, Key, Value},
};
use std::fmt;

/// 叶子存储单元
///
/// 条目无序存放，键在桶内唯一。容量在构造时确定，之后不会改变。
#[derive(Clone, PartialEq, Eq)]
pub struct Bucket {
    capacity: usize,
    local_depth: u32,
    entries: Vec<Entry>,
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bucket(depth: {}, entries: {}/{})",
            self.local_depth,
            self.entries.len(),
            self.capacity
        )
    }
}

impl Bucket {
    pub fn new(capacity: usize, local_depth: u32) -> Self {
        Self {
            capacity,
            local_depth,
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn local_depth(&self) -> u32 {
        self.local_depth
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 返回桶中所有条目
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    fn position(&self, key: Key) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// 插入或覆盖
    ///
    /// 键已存在时即使桶满也会覆盖成功，返回旧值；
    /// 键不存在且桶满时返回 `BucketFull`，由控制器分裂后重试。
    pub fn insert(&mut self, key: Key, value: Value) -> Result<Option<Value>, ExtendibleError> {
        if let Some(idx) = self.position(key) {
            let old = std::mem::replace(&mut self.entries[idx].value, value);
            return Ok(Some(old));
        }

        if self.is_full() {
            return Err(ExtendibleError::BucketFull {
                capacity: self.capacity,
            });
        }

        self.entries.push(Entry::new(key, value));
        Ok(None)
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.value)
    }

    pub fn contains(&self, key: Key) -> bool {
        self.position(key).is_some()
    }

    /// 删除键，后续条目整体前移保持连续
    pub fn remove(&mut self, key: Key) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let idx = self.position(key)?;
        Some(self.entries.remove(idx).value)
    }

    /// 按第 `local_depth` 位把条目拆到两个新桶，新桶局部深度加一
    ///
    /// 返回 `(低位为 0 的桶, 低位为 1 的桶)`，原桶被消耗。
    pub fn split(self) -> (Bucket, Bucket) {
        let depth = self.local_depth;
        let mut low = Bucket::new(self.capacity, depth + 1);
        let mut high = Bucket::new(self.capacity, depth + 1);

        for entry in self.entries {
            if routing_bit(entry.key, depth) == 0 {
                low.entries.push(entry);
            } else {
                high.entries.push(entry);
            }
        }

        (low, high)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bucket:")?;
        for entry in &self.entries {
            writeln!(f, "{} {}", entry.key, entry.value)?;
        }
        write!(f, "Local depth: {}", self.local_depth)
    }
}
