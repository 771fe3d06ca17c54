//! 链路指标收集模块
//!
//! 记录 watch → phone 链路的样本流转、时钟探测与录制生命周期指标。

use std::collections::BTreeMap;

use contracts::{ClockOffsetEstimate, CloseReason, SensorKind};
use metrics::{counter, gauge, histogram};

/// 时钟探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 收到匹配的 pong
    Answered,
    /// 超时未回复
    TimedOut,
    /// 会话结束，探测被取消
    Cancelled,
    /// 往返延迟超过上限，被丢弃
    Outlier,
}

impl ProbeOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ProbeOutcome::Answered => "answered",
            ProbeOutcome::TimedOut => "timed_out",
            ProbeOutcome::Cancelled => "cancelled",
            ProbeOutcome::Outlier => "outlier",
        }
    }
}

/// 记录 watch 端发出的样本
pub fn record_sample_forwarded(kind: SensorKind) {
    counter!("wear_sync_samples_forwarded_total", "kind" => kind.as_str()).increment(1);
}

/// 记录 watch 端丢弃的样本 (无目标 / 编码失败等)
pub fn record_sample_dropped(kind: SensorKind, reason: &'static str) {
    counter!(
        "wear_sync_samples_dropped_total",
        "kind" => kind.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录 phone 端接收并校正的样本
pub fn record_sample_received(kind: SensorKind, synchronized: bool) {
    let sync = if synchronized { "true" } else { "false" };
    counter!(
        "wear_sync_samples_received_total",
        "kind" => kind.as_str(),
        "synchronized" => sync
    )
    .increment(1);
}

/// 记录被拒绝的负载 (长度错误 / 未知路径)
pub fn record_payload_rejected(path: &str) {
    counter!("wear_sync_payloads_rejected_total", "path" => path.to_string()).increment(1);
}

/// 记录乱序到达
pub fn record_out_of_order(kind: SensorKind) {
    counter!("wear_sync_samples_out_of_order_total", "kind" => kind.as_str()).increment(1);
}

/// 记录一次成功的时钟估计
pub fn record_clock_estimate(estimate: &ClockOffsetEstimate) {
    let offset_ms = estimate.offset_nanos as f64 / 1e6;
    let rtt_ms = estimate.round_trip_delay_nanos as f64 / 1e6;

    gauge!("wear_sync_clock_offset_ms").set(offset_ms);
    histogram!("wear_sync_clock_offset_ms_hist").record(offset_ms.abs());
    histogram!("wear_sync_round_trip_ms").record(rtt_ms);
}

/// 记录探测结果
pub fn record_probe_outcome(outcome: ProbeOutcome) {
    counter!("wear_sync_probes_total", "outcome" => outcome.as_str()).increment(1);
}

/// 记录录制关闭
pub fn record_recording_closed(reason: CloseReason, sample_count: u64) {
    counter!("wear_sync_recordings_closed_total", "reason" => reason.as_str()).increment(1);
    histogram!("wear_sync_recording_samples").record(sample_count as f64);
}

/// 记录入站队列溢出
pub fn record_inbound_dropped() {
    counter!("wear_sync_inbound_dropped_total").increment(1);
}

/// 记录导出结果
pub fn record_export(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "wear_sync_exports_total",
        "sink" => sink_name.to_string(),
        "status" => status
    )
    .increment(1);
}

/// 链路指标聚合器
///
/// 在内存中聚合指标，便于 CLI 输出会话摘要。
#[derive(Debug, Clone, Default)]
pub struct LinkMetricsAggregator {
    /// 各传感器接收样本数
    pub samples_per_kind: BTreeMap<SensorKind, u64>,

    /// 未同步样本数
    pub unsynchronized: u64,

    /// 被拒绝的负载数
    pub rejected: u64,

    /// 乱序样本数
    pub out_of_order: u64,

    /// 各探测结果计数
    pub probes_answered: u64,
    pub probes_failed: u64,

    /// 时钟偏移统计 (毫秒)
    pub offset_stats: RunningStats,

    /// 往返延迟统计 (毫秒)
    pub round_trip_stats: RunningStats,
}

impl LinkMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_probe(&mut self, outcome: ProbeOutcome, estimate: Option<&ClockOffsetEstimate>) {
        match (outcome, estimate) {
            (ProbeOutcome::Answered, Some(est)) => {
                self.probes_answered += 1;
                self.offset_stats.push(est.offset_nanos as f64 / 1e6);
                self.round_trip_stats
                    .push(est.round_trip_delay_nanos as f64 / 1e6);
            }
            _ => self.probes_failed += 1,
        }
    }

    pub fn record_samples(&mut self, kind: SensorKind, count: u64, synchronized: bool) {
        *self.samples_per_kind.entry(kind).or_insert(0) += count;
        if !synchronized {
            self.unsynchronized += count;
        }
    }

    pub fn record_rejected(&mut self, count: u64) {
        self.rejected += count;
    }

    pub fn record_out_of_order(&mut self, count: u64) {
        self.out_of_order += count;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> LinkMetricsSummary {
        let total_samples = self.samples_per_kind.values().sum();
        LinkMetricsSummary {
            total_samples,
            unsynchronized: self.unsynchronized,
            rejected: self.rejected,
            out_of_order: self.out_of_order,
            reject_rate: if total_samples + self.rejected > 0 {
                self.rejected as f64 / (total_samples + self.rejected) as f64 * 100.0
            } else {
                0.0
            },
            probes_answered: self.probes_answered,
            probes_failed: self.probes_failed,
            offset_ms: StatsSummary::from(&self.offset_stats),
            round_trip_ms: StatsSummary::from(&self.round_trip_stats),
            samples_per_kind: self.samples_per_kind.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct LinkMetricsSummary {
    pub total_samples: u64,
    pub unsynchronized: u64,
    pub rejected: u64,
    pub out_of_order: u64,
    pub reject_rate: f64,
    pub probes_answered: u64,
    pub probes_failed: u64,
    pub offset_ms: StatsSummary,
    pub round_trip_ms: StatsSummary,
    pub samples_per_kind: BTreeMap<SensorKind, u64>,
}

impl std::fmt::Display for LinkMetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Link Metrics Summary ===")?;
        writeln!(f, "Total samples: {}", self.total_samples)?;
        writeln!(f, "Unsynchronized samples: {}", self.unsynchronized)?;
        writeln!(
            f,
            "Rejected payloads: {} ({:.2}%)",
            self.rejected, self.reject_rate
        )?;
        writeln!(f, "Out-of-order samples: {}", self.out_of_order)?;
        writeln!(
            f,
            "Probes: {} answered, {} failed",
            self.probes_answered, self.probes_failed
        )?;
        writeln!(f, "Clock offset (ms): {}", self.offset_ms)?;
        writeln!(f, "Round trip (ms): {}", self.round_trip_ms)?;

        if !self.samples_per_kind.is_empty() {
            writeln!(f, "Samples per sensor:")?;
            for (kind, count) in &self.samples_per_kind {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
