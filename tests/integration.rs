//! 可扩展哈希表集成测试

use extendible_hashtable::{
    BucketId, ExtendibleError, ExtendibleMap, ExtendibleMapConfig, Key, Value,
    DEFAULT_MAX_DIRECTORY_LEN, KEY_BITS,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use test_log::test;

const SEED: u64 = 42;
const ITEM_COUNT: usize = 100_000;

/// 生成随机键值对
fn generate_items(count: usize) -> Vec<(Key, Value)> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count).map(|_| (rng.gen(), rng.gen())).collect()
}

/// 一半键落在小范围内，制造热点
fn generate_skewed_items(count: usize) -> Vec<(Key, Value)> {
    let mut rng = StdRng::seed_from_u64(SEED);
    (0..count as Value)
        .map(|i| {
            let key = if rng.gen_bool(0.5) {
                rng.gen_range(0..1_000_000)
            } else {
                rng.gen_range(0..1_000)
            };
            (key, i)
        })
        .collect()
}

/// 校验扇入、深度与容量不变式
fn assert_structure(map: &ExtendibleMap) {
    let global = map.global_depth();
    assert_eq!(map.directory_len(), 1usize << global);

    let infos = map.bucket_infos();
    for info in &infos {
        assert!(info.local_depth <= global, "{:?}", info);
        assert_eq!(info.fan_in, 1usize << (global - info.local_depth), "{:?}", info);
        assert!(info.len <= map.bucket_capacity(), "{:?}", info);
    }
    assert_eq!(infos.iter().map(|i| i.len).sum::<usize>(), map.len());

    // 共享同一个桶的槽位低 local_depth 位相同
    let depths: HashMap<BucketId, u32> = infos.iter().map(|i| (i.id, i.local_depth)).collect();
    let mut prefixes: HashMap<BucketId, usize> = HashMap::new();
    for (slot, id) in map.directory_slots().iter().enumerate() {
        let prefix = slot & ((1usize << depths[id]) - 1);
        assert_eq!(*prefixes.entry(*id).or_insert(prefix), prefix, "slot {}", slot);
    }
}

#[test]
fn test_round_trip() {
    let items = generate_items(10_000);
    let mut map = ExtendibleMap::with_capacity(4, 1).unwrap();
    let mut expected = HashMap::new();

    for (key, value) in &items {
        map.insert(*key, *value).unwrap();
        expected.insert(*key, *value);
    }

    assert_eq!(map.len(), expected.len());
    for (key, value) in &expected {
        assert_eq!(map.get(*key), Some(*value), "key {}", key);
    }
    assert_structure(&map);
}

#[test]
fn test_high_load() {
    let start_time = std::time::Instant::now();
    let items = generate_items(ITEM_COUNT);
    let mut map = ExtendibleMap::with_capacity(16, 2).unwrap();

    for (key, value) in &items {
        assert!(map.insert(*key, *value).is_ok());
    }
    println!("All inserts processed in {:?}", start_time.elapsed());

    let expected: HashMap<Key, Value> = items.iter().copied().collect();
    for (index, (key, value)) in expected.iter().enumerate() {
        assert_eq!(map.get(*key), Some(*value), "Assertion failed at index {} for key {}", index, key);
    }

    let stats = map.stats();
    assert_eq!(stats.size, expected.len());
    assert!(stats.load_factor > 0.0 && stats.load_factor <= 1.0);
    assert_structure(&map);
}

#[test]
fn test_overwrite_keeps_count() {
    let mut map = ExtendibleMap::with_capacity(2, 1).unwrap();
    assert_eq!(map.insert(7, 1), Ok(None));
    let len = map.len();
    assert_eq!(map.insert(7, 2), Ok(Some(1)));
    assert_eq!(map.get(7), Some(2));
    assert_eq!(map.len(), len);
}

#[test]
fn test_delete() {
    let mut map = ExtendibleMap::with_capacity(2, 1).unwrap();
    map.insert(11, 22).unwrap();
    assert_eq!(map.remove(11), Some(22));
    assert_eq!(map.get(11), None);
    assert!(map.is_empty());
}

#[test]
fn test_delete_on_empty_table() {
    let mut map = ExtendibleMap::with_capacity(3, 2).unwrap();
    for key in [0, 1, -1, Key::MAX, Key::MIN] {
        assert_eq!(map.remove(key), None);
    }
    assert!(map.is_empty());
    assert_eq!(map.global_depth(), 2);
}

#[test]
fn test_five_keys_scenario() {
    let mut map = ExtendibleMap::with_capacity(2, 1).unwrap();
    for k in 0..5 {
        map.insert(k, k).unwrap();
    }
    for k in 0..5 {
        assert_eq!(map.get(k), Some(k));
    }
    assert!(map.global_depth() > 1);
    assert_eq!(map.directory_len(), 1 << map.global_depth());
    assert_structure(&map);
}

#[test]
fn test_single_doubling_scenario() {
    let mut map = ExtendibleMap::with_capacity(1, 0).unwrap();
    map.insert(6, 60).unwrap();
    map.insert(7, 70).unwrap();

    let stats = map.stats();
    assert_eq!(stats.global_depth, 1);
    assert_eq!(stats.expand_count, 1);
    assert_eq!(stats.split_count, 1);
    assert_eq!(map.get(6), Some(60));
    assert_eq!(map.get(7), Some(70));
    assert_structure(&map);
}

#[test]
fn test_monotonic_depths() {
    let items = generate_skewed_items(20_000);
    let mut map = ExtendibleMap::with_capacity(3, 1).unwrap();
    let mut last_global = map.global_depth();
    let mut max_local: HashMap<usize, u32> = HashMap::new();

    for (i, (key, value)) in items.iter().enumerate() {
        map.insert(*key, *value).unwrap();
        if i % 3 == 0 {
            map.remove(items[i / 2].0);
        }

        let global = map.global_depth();
        assert!(global >= last_global);
        last_global = global;

        if i % 500 != 0 {
            continue;
        }
        // 每个目录槽位所见的局部深度不下降
        let depths: HashMap<BucketId, u32> = map
            .bucket_infos()
            .iter()
            .map(|info| (info.id, info.local_depth))
            .collect();
        for (slot, id) in map.directory_slots().iter().enumerate() {
            let depth = depths[id];
            let seen = max_local.entry(slot).or_insert(depth);
            assert!(depth >= *seen, "slot {} depth {} < {}", slot, depth, seen);
            *seen = depth;
        }
    }
    assert_structure(&map);
}

#[test]
fn test_mixed_operations_match_hashmap() {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut map = ExtendibleMap::with_capacity(4, 0).unwrap();
    let mut model: HashMap<Key, Value> = HashMap::new();

    for _ in 0..50_000 {
        let key = rng.gen_range(-5_000..5_000);
        match rng.gen_range(0..3) {
            0 | 1 => {
                let value = rng.gen();
                assert_eq!(map.insert(key, value).unwrap(), model.insert(key, value));
            }
            _ => assert_eq!(map.remove(key), model.remove(&key)),
        }
    }

    assert_eq!(map.len(), model.len());
    for key in -5_000..5_000 {
        assert_eq!(map.get(key), model.get(&key).copied());
    }
    assert_structure(&map);
}

#[test]
fn test_sequential_reference_workload() {
    let mut map = ExtendibleMap::with_capacity(2, 1).unwrap();
    for i in 0..1000 {
        map.insert(i, i).unwrap();
    }
    for i in 0..1000 {
        assert_eq!(map.get(i), Some(i));
    }
    // 连续键平均分布，目录不会超过所需深度
    assert_eq!(map.global_depth(), 9);
    assert_structure(&map);
}

#[test]
fn test_capacity_exceeded_is_clean() {
    let config = ExtendibleMapConfig::new(2, 1).with_max_global_depth(6);
    let mut map = ExtendibleMap::new(config).unwrap();
    // 三个键低 6 位全部相同
    map.insert(0, 0).unwrap();
    map.insert(64, 1).unwrap();
    let before_depth = map.global_depth();
    let before_buckets = map.bucket_count();

    let err = map.insert(128, 2).unwrap_err();
    assert!(matches!(err, ExtendibleError::CapacityExceeded { key: 128, max_depth: 6, .. }));
    assert!(!err.is_recoverable());

    assert_eq!(map.global_depth(), before_depth);
    assert_eq!(map.bucket_count(), before_buckets);
    assert_eq!(map.get(0), Some(0));
    assert_eq!(map.get(64), Some(1));
    assert_eq!(map.get(128), None);

    // 覆盖已有键不受影响
    assert_eq!(map.insert(64, 5), Ok(Some(1)));
    assert_structure(&map);
}

#[test]
fn test_full_width_keys_always_fit() {
    let mut map = ExtendibleMap::with_capacity(1, 0).unwrap();
    assert_eq!(map.config().max_global_depth, KEY_BITS);
    // 两个键低 20 位相同，需要分裂到局部深度 21
    map.insert(0, 1).unwrap();
    map.insert(1 << 20, 2).unwrap();
    assert_eq!(map.global_depth(), 21);
    assert_eq!(map.get(0), Some(1));
    assert_eq!(map.get(1 << 20), Some(2));
}

#[test]
fn test_default_config_bounds_directory_growth() {
    let mut map = ExtendibleMap::with_capacity(1, 0).unwrap();
    let limit = map.config().depth_limit();
    assert_eq!(1usize << limit, DEFAULT_MAX_DIRECTORY_LEN);

    // 两个键低 28 位相同，所需目录超过默认上限，应返回错误而不是分配
    map.insert(0, 0).unwrap();
    let err = map.insert(1 << 28, 1).unwrap_err();
    assert_eq!(
        err,
        ExtendibleError::CapacityExceeded {
            key: 1 << 28,
            required_depth: limit + 1,
            max_depth: limit,
        }
    );
    assert_eq!(map.global_depth(), 0);
    assert_eq!(map.directory_len(), 1);
    assert_eq!(map.get(0), Some(0));
    assert_eq!(map.len(), 1);
    assert_structure(&map);
}

#[test]
fn test_invalid_construction() {
    assert!(matches!(
        ExtendibleMap::with_capacity(0, 0),
        Err(ExtendibleError::InvalidConfig { .. })
    ));
    assert!(matches!(
        ExtendibleMap::with_capacity(1, KEY_BITS + 1),
        Err(ExtendibleError::InvalidConfig { .. })
    ));
}

#[test]
fn test_print_dump() {
    let mut map = ExtendibleMap::with_capacity(2, 1).unwrap();
    for k in 0..5 {
        map.insert(k, k * 10).unwrap();
    }
    let dump = map.to_string();
    assert_eq!(dump.matches("Bucket:").count(), map.directory_len());
    assert!(dump.contains("4 40"));
    map.print();
}

#[test]
fn test_prometheus_export() {
    let mut map = ExtendibleMap::with_capacity(1, 0).unwrap();
    map.insert(0, 0).unwrap();
    map.insert(1, 1).unwrap();
    map.get(1);
    let text = map.stats_recorder().export_prometheus();
    assert!(text.contains("extendible_operation_insert_count 2"));
    assert!(text.contains("extendible_operation_get_count 1"));
    assert!(text.contains("extendible_operation_split_count 1"));
}
