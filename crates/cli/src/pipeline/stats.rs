//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::TrackerPhase;
use observability::LoopMetricsAggregator;
use publisher::ChannelMetricsSnapshot;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total loop iterations executed
    pub iterations: u64,

    /// Times the engine entered the tracking phase
    pub detections: u64,

    /// Times tracking was lost and detection resumed
    pub tracking_losses: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Engine phase at shutdown
    pub final_phase: TrackerPhase,

    /// Loop iteration metrics aggregator
    pub loop_metrics: LoopMetricsAggregator,

    /// Per-channel publish counters at shutdown
    pub channel_metrics: Vec<(&'static str, ChannelMetricsSnapshot)>,
}

impl PipelineStats {
    /// Achieved loop rate over the whole run
    pub fn loop_hz(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.iterations as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Iterations: {}", self.iterations);
        println!("   ├─ Loop rate: {:.2} Hz", self.loop_hz());
        println!("   ├─ Detections: {}", self.detections);
        println!("   ├─ Tracking losses: {}", self.tracking_losses);
        println!("   └─ Final phase: {:?}", self.final_phase);

        let summary = self.loop_metrics.summary();

        println!("\n📈 Loop Metrics");
        println!(
            "   ├─ Overrun iterations: {} ({:.2}%)",
            summary.overrun_count, summary.overrun_rate
        );
        println!(
            "   ├─ Detecting iterations: {}",
            summary.detecting_iterations
        );
        println!("   ├─ Tracking iterations: {}", summary.tracking_iterations);
        println!("   └─ Iteration time (ms): {}", summary.iteration_ms);

        if !self.channel_metrics.is_empty() {
            println!("\n📤 Channels");
            for (i, (name, metrics)) in self.channel_metrics.iter().enumerate() {
                let is_last = i == self.channel_metrics.len() - 1;
                let prefix = if is_last { "└─" } else { "├─" };
                println!(
                    "   {} {}: published={}, skipped={}",
                    prefix, name, metrics.publish_count, metrics.skipped_count
                );
            }
        }

        println!();
    }
}
