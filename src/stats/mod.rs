//! 统计模块 - 统一管理哈希表操作指标

pub mod operation;
pub mod recorder;

pub use operation::{AtomicOperationStats, OperationRecorder, OperationStatsSnapshot};
pub use recorder::{DisabledStatsRecorder, GlobalStatsRecorder, StatsRecorder, StatsRecorderFactory};
