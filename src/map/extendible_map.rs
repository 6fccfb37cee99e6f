//! 可扩展哈希表核心实现

use crate::{
    error::ExtendibleError,
    map::{
        bucket::Bucket, directory::Directory, DEFAULT_BUCKET_CAPACITY,
        DEFAULT_INITIAL_GLOBAL_DEPTH, DEFAULT_MAX_DIRECTORY_LEN,
    },
    stats::{GlobalStatsRecorder, StatsRecorder},
    types::{routing_bit, BucketId, Entry, Key, OperationType, Value, KEY_BITS},
};
use std::{fmt, sync::Arc, time::Instant};

/// 哈希表配置
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendibleMapConfig {
    /// 每个桶的槽位数，所有桶共用
    pub bucket_capacity: usize,
    /// 初始全局深度，初始目录有 2^initial_global_depth 个桶
    pub initial_global_depth: u32,
    /// 全局深度上限，单次插入最多分裂 max - initial 次
    pub max_global_depth: u32,
    /// 目录槽位数上限，超过时插入返回 `CapacityExceeded`
    pub max_directory_len: usize,
}

impl Default for ExtendibleMapConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
            initial_global_depth: DEFAULT_INITIAL_GLOBAL_DEPTH,
            max_global_depth: KEY_BITS,
            max_directory_len: DEFAULT_MAX_DIRECTORY_LEN,
        }
    }
}

impl ExtendibleMapConfig {
    pub fn new(bucket_capacity: usize, initial_global_depth: u32) -> Self {
        Self {
            bucket_capacity,
            initial_global_depth,
            ..Self::default()
        }
    }

    pub fn with_max_global_depth(mut self, max_global_depth: u32) -> Self {
        self.max_global_depth = max_global_depth;
        self
    }

    pub fn with_max_directory_len(mut self, max_directory_len: usize) -> Self {
        self.max_directory_len = max_directory_len;
        self
    }

    /// 实际可达的全局深度，同时受 `max_global_depth` 与目录长度上限约束
    pub fn depth_limit(&self) -> u32 {
        self.max_directory_len
            .checked_ilog2()
            .unwrap_or(0)
            .min(self.max_global_depth)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ExtendibleError> {
        if self.bucket_capacity == 0 {
            return Err(ExtendibleError::InvalidConfig {
                reason: "bucket_capacity 必须大于 0".into(),
            });
        }
        if self.max_global_depth > KEY_BITS {
            return Err(ExtendibleError::InvalidConfig {
                reason: format!(
                    "max_global_depth ({}) 不能超过键位宽 {}",
                    self.max_global_depth, KEY_BITS
                ),
            });
        }
        if self.max_directory_len == 0 {
            return Err(ExtendibleError::InvalidConfig {
                reason: "max_directory_len 必须大于 0".into(),
            });
        }
        if self.initial_global_depth > self.depth_limit() {
            return Err(ExtendibleError::InvalidConfig {
                reason: format!(
                    "initial_global_depth ({}) 超过可达深度 {} (max_global_depth={}, max_directory_len={})",
                    self.initial_global_depth,
                    self.depth_limit(),
                    self.max_global_depth,
                    self.max_directory_len
                ),
            });
        }
        Ok(())
    }

    /// 单次插入允许的最大分裂次数
    pub fn max_splits(&self) -> u32 {
        self.depth_limit() - self.initial_global_depth
    }
}

/// 哈希表统计信息
#[derive(Debug, Default, Clone)]
pub struct ExtendibleMapStats {
    pub size: usize,
    pub bucket_count: usize,
    pub directory_len: usize,
    pub global_depth: u32,
    pub load_factor: f32,
    pub insert_count: u64,
    pub update_count: u64,
    pub get_count: u64,
    pub remove_count: u64,
    pub split_count: u64,
    pub expand_count: u64,
}

/// 单个桶的检视信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketInfo {
    pub id: BucketId,
    pub local_depth: u32,
    pub len: usize,
    /// 引用该桶的目录槽位数
    pub fan_in: usize,
}

/// 可扩展哈希表
///
/// 桶存放在桶池 `buckets` 中，目录只保存桶编号。一个桶可被多个目录槽位共享，
/// 分裂时由控制器统一改写这些槽位。
pub struct ExtendibleMap {
    config: ExtendibleMapConfig,
    directory: Directory,
    // 桶池，None 表示已释放的位置
    buckets: Vec<Option<Bucket>>,
    free: Vec<BucketId>,
    size: usize,
    stats_recorder: Arc<dyn StatsRecorder>,
}

impl ExtendibleMap {
    /// 按配置创建哈希表
    pub fn new(config: ExtendibleMapConfig) -> Result<Self, ExtendibleError> {
        Self::with_recorder(config, Arc::new(GlobalStatsRecorder::new()))
    }

    /// 以桶容量和初始全局深度创建哈希表
    pub fn with_capacity(
        bucket_capacity: usize,
        initial_global_depth: u32,
    ) -> Result<Self, ExtendibleError> {
        Self::new(ExtendibleMapConfig::new(bucket_capacity, initial_global_depth))
    }

    pub fn with_recorder(
        config: ExtendibleMapConfig,
        stats_recorder: Arc<dyn StatsRecorder>,
    ) -> Result<Self, ExtendibleError> {
        config.validate()?;

        let depth = config.initial_global_depth;
        let bucket_count = 1usize << depth;
        let buckets = (0..bucket_count)
            .map(|_| Some(Bucket::new(config.bucket_capacity, depth)))
            .collect();
        let directory = Directory::new(depth, (0..bucket_count).map(BucketId).collect());

        log_info!(
            "ExtendibleMap created: bucket_capacity={}, global_depth={}, max_global_depth={}",
            config.bucket_capacity,
            depth,
            config.max_global_depth
        );

        Ok(Self {
            config,
            directory,
            buckets,
            free: Vec::new(),
            size: 0,
            stats_recorder,
        })
    }

    pub fn config(&self) -> &ExtendibleMapConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn global_depth(&self) -> u32 {
        self.directory.global_depth()
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    pub fn bucket_capacity(&self) -> usize {
        self.config.bucket_capacity
    }

    /// 存活桶数量
    pub fn bucket_count(&self) -> usize {
        self.buckets.len() - self.free.len()
    }

    /// 键对应的目录下标
    pub fn index_of(&self, key: Key) -> usize {
        self.directory.index_of(key)
    }

    pub fn load_factor(&self) -> f32 {
        let slots = self.bucket_count() * self.config.bucket_capacity;
        if slots == 0 {
            0.0
        } else {
            self.size as f32 / slots as f32
        }
    }

    fn bucket(&self, id: BucketId) -> Result<&Bucket, ExtendibleError> {
        self.buckets
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(ExtendibleError::BucketNotFound { id })
    }

    fn bucket_mut(&mut self, id: BucketId) -> Result<&mut Bucket, ExtendibleError> {
        self.buckets
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(ExtendibleError::BucketNotFound { id })
    }

    fn allocate(&mut self, bucket: Bucket) -> BucketId {
        match self.free.pop() {
            Some(id) => {
                self.buckets[id.0] = Some(bucket);
                id
            }
            None => {
                self.buckets.push(Some(bucket));
                BucketId(self.buckets.len() - 1)
            }
        }
    }

    /// 从桶池取出桶，位置在 `release` 之前不会被复用
    fn take_bucket(&mut self, id: BucketId) -> Result<Bucket, ExtendibleError> {
        self.buckets
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(ExtendibleError::BucketNotFound { id })
    }

    fn release(&mut self, id: BucketId) {
        self.free.push(id);
    }

    /// 插入或覆盖键值对，覆盖时返回旧值
    ///
    /// 目标桶已满时先分裂（必要时先倍增目录）再重试。若分裂到
    /// `depth_limit()` 仍无法容纳，或目录内存分配失败，返回 `CapacityExceeded`，
    /// 且表保持原样。
    pub fn insert(&mut self, key: Key, value: Value) -> Result<Option<Value>, ExtendibleError> {
        let start = Instant::now();
        let result = self.insert_inner(key, value);

        let op = match result {
            Ok(Some(_)) => OperationType::Update,
            _ => OperationType::Insert,
        };
        self.stats_recorder
            .record_operation(op, start.elapsed(), result.is_ok());
        result
    }

    fn insert_inner(&mut self, key: Key, value: Value) -> Result<Option<Value>, ExtendibleError> {
        let max_splits = self.config.max_splits();
        let mut splits = 0;

        loop {
            let id = self.directory.bucket_for(key);
            match self.bucket_mut(id)?.insert(key, value) {
                Ok(old) => {
                    if old.is_none() {
                        self.size += 1;
                    }
                    return Ok(old);
                }
                Err(ExtendibleError::BucketFull { .. }) => {}
                Err(e) => return Err(e),
            }

            if splits == 0 {
                // 先确认有限次分裂能够容纳并预留目录，再动结构
                let required = self.check_splittable(id, key)?;
                if required > self.directory.global_depth() {
                    self.directory
                        .reserve_for_depth(required)
                        .map_err(|_| self.capacity_exceeded(key, required))?;
                }
            }
            if splits >= max_splits {
                return Err(self.capacity_exceeded(key, self.bucket(id)?.local_depth() + 1));
            }

            if self.bucket(id)?.local_depth() == self.directory.global_depth() {
                self.expand_directory(key)?;
            }
            self.split_bucket(id)?;
            splits += 1;
        }
    }

    /// 模拟对满桶 `id` 反复分裂，计算容纳 `key` 所需的局部深度
    fn check_splittable(&self, id: BucketId, key: Key) -> Result<u32, ExtendibleError> {
        let bucket = self.bucket(id)?;
        let capacity = self.config.bucket_capacity;
        let mut group: Vec<Key> = bucket.keys().chain(std::iter::once(key)).collect();
        let mut depth = bucket.local_depth();

        let limit = self.config.depth_limit();

        while group.len() > capacity {
            if depth >= limit {
                return Err(self.capacity_exceeded(key, depth + 1));
            }
            let bit = routing_bit(key, depth);
            group.retain(|k| routing_bit(*k, depth) == bit);
            depth += 1;
        }
        Ok(depth)
    }

    fn capacity_exceeded(&self, key: Key, required_depth: u32) -> ExtendibleError {
        log_warn!(
            "capacity exceeded: key={}, required_depth={}, depth_limit={}",
            key,
            required_depth,
            self.config.depth_limit()
        );
        ExtendibleError::CapacityExceeded {
            key,
            required_depth,
            max_depth: self.config.depth_limit(),
        }
    }

    /// 目录倍增，全局深度加一
    fn expand_directory(&mut self, key: Key) -> Result<(), ExtendibleError> {
        let depth = self.directory.global_depth() + 1;
        self.directory
            .expand()
            .map_err(|_| self.capacity_exceeded(key, depth))?;
        self.stats_recorder
            .record_operation_count(OperationType::Expand);
        log_debug!(
            "directory expanded: global_depth={}, slots={}",
            self.directory.global_depth(),
            self.directory.len()
        );
        Ok(())
    }

    /// 把桶 `id` 拆成两个局部深度加一的新桶，并改写所有指向它的槽位
    fn split_bucket(&mut self, id: BucketId) -> Result<(), ExtendibleError> {
        let old = self.take_bucket(id)?;
        let depth = old.local_depth();
        debug_assert!(depth < self.directory.global_depth());

        let (low, high) = old.split();
        let (low_len, high_len) = (low.len(), high.len());
        let low_id = self.allocate(low);
        let high_id = self.allocate(high);
        let rewritten = self.directory.repoint(id, depth, low_id, high_id);
        self.release(id);

        self.stats_recorder
            .record_operation_count(OperationType::Split);
        log_debug!(
            "bucket {} split at depth {} -> {} ({} entries), {} ({} entries), {} slots rewritten",
            id,
            depth,
            low_id,
            low_len,
            high_id,
            high_len,
            rewritten
        );
        Ok(())
    }

    /// 查询键对应的值，未命中返回 `None`
    pub fn get(&self, key: Key) -> Option<Value> {
        let start = Instant::now();
        let result = self
            .bucket(self.directory.bucket_for(key))
            .ok()
            .and_then(|bucket| bucket.get(key));
        self.stats_recorder
            .record_operation(OperationType::Get, start.elapsed(), result.is_some());
        result
    }

    pub fn contains_key(&self, key: Key) -> bool {
        self.bucket(self.directory.bucket_for(key))
            .map(|bucket| bucket.contains(key))
            .unwrap_or(false)
    }

    /// 删除键，键不存在时什么也不做
    pub fn remove(&mut self, key: Key) -> Option<Value> {
        let start = Instant::now();
        let id = self.directory.bucket_for(key);
        let removed = self
            .bucket_mut(id)
            .ok()
            .and_then(|bucket| bucket.remove(key));
        if removed.is_some() {
            self.size -= 1;
        }
        self.stats_recorder
            .record_operation(OperationType::Remove, start.elapsed(), removed.is_some());
        removed
    }

    /// 清空并恢复到刚构造时的形态
    pub fn clear(&mut self) {
        let depth = self.config.initial_global_depth;
        let bucket_count = 1usize << depth;
        self.buckets = (0..bucket_count)
            .map(|_| Some(Bucket::new(self.config.bucket_capacity, depth)))
            .collect();
        self.free.clear();
        self.directory = Directory::new(depth, (0..bucket_count).map(BucketId).collect());
        self.size = 0;
    }

    /// 遍历所有键值对，每个桶只访问一次
    pub fn iter(&self) -> impl Iterator<Item = (Key, Value)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .flat_map(|bucket| bucket.entries().iter().map(|e| (e.key, e.value)))
    }

    /// 所有存活桶的检视信息，按桶编号排序
    pub fn bucket_infos(&self) -> Vec<BucketInfo> {
        let fan_in = self.directory.fan_in_counts(self.buckets.len());

        self.buckets
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref().map(|bucket| BucketInfo {
                    id: BucketId(i),
                    local_depth: bucket.local_depth(),
                    len: bucket.len(),
                    fan_in: fan_in[i],
                })
            })
            .collect()
    }

    /// 目录槽位到桶编号的映射
    pub fn directory_slots(&self) -> &[BucketId] {
        self.directory.slots()
    }

    /// 槽位 `index` 所指桶中的条目
    pub fn slot_entries(&self, index: usize) -> Option<&[Entry]> {
        let id = *self.directory.slots().get(index)?;
        self.bucket(id).ok().map(Bucket::entries)
    }

    pub fn stats(&self) -> ExtendibleMapStats {
        let ops = self.stats_recorder.operation_stats_snapshot();
        ExtendibleMapStats {
            size: self.size,
            bucket_count: self.bucket_count(),
            directory_len: self.directory.len(),
            global_depth: self.directory.global_depth(),
            load_factor: self.load_factor(),
            insert_count: ops.insert_count,
            update_count: ops.update_count,
            get_count: ops.get_count,
            remove_count: ops.remove_count,
            split_count: ops.split_count,
            expand_count: ops.expand_count,
        }
    }

    pub fn stats_recorder(&self) -> &Arc<dyn StatsRecorder> {
        &self.stats_recorder
    }

    /// 打印每个目录槽位所指的桶
    pub fn print(&self) {
        print!("{}", self);
    }
}

impl fmt::Display for ExtendibleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, id) in self.directory.slots().iter().enumerate() {
            match self.bucket(*id) {
                Ok(bucket) => writeln!(f, "[{}] {}", index, bucket)?,
                Err(_) => writeln!(f, "[{}] <missing {}>", index, id)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ExtendibleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendibleMap")
            .field("size", &self.size)
            .field("global_depth", &self.directory.global_depth())
            .field("bucket_count", &self.bucket_count())
            .field("load_factor", &self.load_factor())
            .finish()
    }
}
