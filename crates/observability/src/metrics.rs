//! 跟踪循环指标收集模块
//!
//! 收集和统计跟踪循环每次迭代的运行指标。

use contracts::TrackerPhase;
use metrics::{counter, gauge, histogram};

/// 记录一次循环迭代的指标
///
/// 每次迭代结束时调用。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_loop_iteration;
///
/// let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
/// record_loop_iteration(elapsed_ms, elapsed_ms > period_ms, engine.current_phase());
/// ```
pub fn record_loop_iteration(elapsed_ms: f64, overrun: bool, phase: TrackerPhase) {
    // 迭代计数器
    counter!("pattern_tracker_iterations_total").increment(1);

    // 迭代耗时 (毫秒)
    histogram!("pattern_tracker_iteration_ms").record(elapsed_ms);

    // 当前阶段码 (状态通道同款数值)
    gauge!("pattern_tracker_phase").set(phase.code() as f64);

    // 超时迭代
    if overrun {
        counter!("pattern_tracker_overruns_total").increment(1);
    }
}

/// 记录一次检测尝试
pub fn record_detection(found: bool) {
    let outcome = if found { "found" } else { "missed" };
    counter!(
        "pattern_tracker_detection_attempts_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录一次通道发布
pub fn record_publish(channel: &str, published: bool) {
    let status = if published { "published" } else { "skipped" };
    counter!(
        "pattern_tracker_dispatch_total",
        "channel" => channel.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 循环指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct LoopMetricsAggregator {
    /// 总迭代数
    pub total_iterations: u64,

    /// 超时迭代数
    pub overrun_count: u64,

    /// 各阶段迭代数，按阶段码索引
    pub phase_counts: [u64; 5],

    /// 迭代耗时统计 (毫秒)
    pub iteration_stats: RunningStats,
}

impl LoopMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 更新聚合统计
    pub fn update(&mut self, elapsed_ms: f64, overrun: bool, phase: TrackerPhase) {
        self.total_iterations += 1;
        if overrun {
            self.overrun_count += 1;
        }
        self.phase_counts[phase.code() as usize] += 1;
        self.iteration_stats.push(elapsed_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> LoopSummary {
        LoopSummary {
            total_iterations: self.total_iterations,
            overrun_count: self.overrun_count,
            overrun_rate: if self.total_iterations > 0 {
                self.overrun_count as f64 / self.total_iterations as f64 * 100.0
            } else {
                0.0
            },
            detecting_iterations: self.phase_counts[TrackerPhase::Detecting.code() as usize],
            tracking_iterations: self.phase_counts[TrackerPhase::TrackingModel.code() as usize],
            iteration_ms: StatsSummary::from(&self.iteration_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 循环指标摘要
#[derive(Debug, Clone, Default)]
pub struct LoopSummary {
    pub total_iterations: u64,
    pub overrun_count: u64,
    pub overrun_rate: f64,
    pub detecting_iterations: u64,
    pub tracking_iterations: u64,
    pub iteration_ms: StatsSummary,
}

impl std::fmt::Display for LoopSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Loop Metrics Summary ===")?;
        writeln!(f, "Total iterations: {}", self.total_iterations)?;
        writeln!(
            f,
            "Overrun iterations: {} ({:.2}%)",
            self.overrun_count, self.overrun_rate
        )?;
        writeln!(f, "Detecting iterations: {}", self.detecting_iterations)?;
        writeln!(f, "Tracking iterations: {}", self.tracking_iterations)?;
        writeln!(f, "Iteration time (ms): {}", self.iteration_ms)?;
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
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
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

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        self.max
    }
}
