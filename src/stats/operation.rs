// src/stats/operation.rs
//! 操作统计 - 跟踪哈希表操作次数与耗时

use crate::types::OperationType;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// 操作统计接口
pub trait OperationRecorder: Send + Sync {
    /// 记录一次带耗时的操作
    fn record(&self, op_type: OperationType, duration: Duration, success: bool);
    /// 只记录次数
    fn record_count(&self, op_type: OperationType);
    /// 获取操作统计快照
    fn snapshot(&self) -> OperationStatsSnapshot;
    /// 重置统计
    fn reset(&self);
    /// 导出Prometheus格式指标
    fn export_prometheus(&self) -> String;
}

/// 操作统计快照
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationStatsSnapshot {
    pub insert_count: u64,
    pub update_count: u64,
    pub get_count: u64,
    pub remove_count: u64,
    pub split_count: u64,
    pub expand_count: u64,
    pub failure_count: u64,
    pub total_duration: u64, // 纳秒
}

impl OperationStatsSnapshot {
    pub fn count(&self, op_type: OperationType) -> u64 {
        match op_type {
            OperationType::Insert => self.insert_count,
            OperationType::Update => self.update_count,
            OperationType::Get => self.get_count,
            OperationType::Remove => self.remove_count,
            OperationType::Split => self.split_count,
            OperationType::Expand => self.expand_count,
        }
    }
}

/// 原子操作统计
#[derive(Debug, Default)]
pub struct AtomicOperationStats {
    insert_count: AtomicU64,
    update_count: AtomicU64,
    get_count: AtomicU64,
    remove_count: AtomicU64,
    split_count: AtomicU64,
    expand_count: AtomicU64,
    failure_count: AtomicU64,
    total_duration: AtomicU64,
}

impl AtomicOperationStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, op_type: OperationType) -> &AtomicU64 {
        match op_type {
            OperationType::Insert => &self.insert_count,
            OperationType::Update => &self.update_count,
            OperationType::Get => &self.get_count,
            OperationType::Remove => &self.remove_count,
            OperationType::Split => &self.split_count,
            OperationType::Expand => &self.expand_count,
        }
    }
}

impl OperationRecorder for AtomicOperationStats {
    fn record(&self, op_type: OperationType, duration: Duration, success: bool) {
        let nanos = duration.as_nanos() as u64;

        self.counter(op_type).fetch_add(1, Ordering::Relaxed);
        self.total_duration.fetch_add(nanos, Ordering::Relaxed);

        if !success {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_count(&self, op_type: OperationType) {
        self.counter(op_type).fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OperationStatsSnapshot {
        OperationStatsSnapshot {
            insert_count: self.insert_count.load(Ordering::Relaxed),
            update_count: self.update_count.load(Ordering::Relaxed),
            get_count: self.get_count.load(Ordering::Relaxed),
            remove_count: self.remove_count.load(Ordering::Relaxed),
            split_count: self.split_count.load(Ordering::Relaxed),
            expand_count: self.expand_count.load(Ordering::Relaxed),
            failure_count: self.failure_count.load(Ordering::Relaxed),
            total_duration: self.total_duration.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        for op in OperationType::ALL {
            self.counter(op).store(0, Ordering::Relaxed);
        }
        self.failure_count.store(0, Ordering::Relaxed);
        self.total_duration.store(0, Ordering::Relaxed);
    }

    fn export_prometheus(&self) -> String {
        let mut output = String::new();

        for op in OperationType::ALL {
            let count = self.counter(op).load(Ordering::Relaxed);
            output.push_str(&format!(
                "# HELP extendible_operation_{}_count Total {} operations\n",
                op.as_str(),
                op.as_str()
            ));
            output.push_str(&format!(
                "# TYPE extendible_operation_{}_count counter\n",
                op.as_str()
            ));
            output.push_str(&format!(
                "extendible_operation_{}_count {}\n",
                op.as_str(),
                count
            ));
        }

        output.push_str("# HELP extendible_operation_total_duration Total operation duration (ns)\n");
        output.push_str("# TYPE extendible_operation_total_duration counter\n");
        output.push_str(&format!(
            "extendible_operation_total_duration {}\n",
            self.total_duration.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP extendible_operation_failure_count Total failed operations\n");
        output.push_str("# TYPE extendible_operation_failure_count counter\n");
        output.push_str(&format!(
            "extendible_operation_failure_count {}\n",
            self.failure_count.load(Ordering::Relaxed)
        ));

        output
    }
}

/// 禁用操作统计实现
#[derive(Default)]
pub struct DisabledOperationRecorder;

impl OperationRecorder for DisabledOperationRecorder {
    fn record(&self, _op_type: OperationType, _duration: Duration, _success: bool) {}
    fn record_count(&self, _op_type: OperationType) {}
    fn snapshot(&self) -> OperationStatsSnapshot {
        OperationStatsSnapshot::default()
    }
    fn reset(&self) {}
    fn export_prometheus(&self) -> String {
        String::new()
    }
}
