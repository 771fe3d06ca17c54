//! # Dataset
//!
//! 数据集重建与导出模块。
//!
//! 负责：
//! - 将已关闭录制的样本合并为按时间排序的数据集
//! - 宽表布局：按时间桶聚合各传感器最新值
//! - 通过 sinks 写出 CSV / JSON Lines 文件

pub mod exporter;
pub mod file_name;
pub mod reconstructor;
pub mod sinks;

pub use contracts::{Dataset, DatasetRow, DatasetSink, ExportLayout, WideRow};
pub use exporter::DatasetExporter;
pub use file_name::{export_file_name, sanitize_title};
pub use reconstructor::{reconstruct, reconstruct_long, reconstruct_wide};
pub use sinks::{CsvSink, ExportSink, JsonLinesSink, LogSink};
