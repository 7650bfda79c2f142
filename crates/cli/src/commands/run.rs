//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(frequency) = args.frequency {
        info!(frequency_hz = frequency, "Overriding loop frequency from CLI");
        blueprint.pacing.frequency_hz = frequency;
    }
    if let Some(ref message) = args.message {
        info!(message = %message, "Overriding feed pattern payload from CLI");
        blueprint.feed.message = message.clone();
    }

    info!(
        model = %blueprint.model.name,
        tracker = ?blueprint.tracker.variant,
        detector = ?blueprint.detector.kind,
        frequency_hz = blueprint.pacing.frequency_hz,
        log_taps = blueprint.channels.log_taps.len(),
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        max_iterations: if args.max_iterations == 0 {
            None
        } else {
            Some(args.max_iterations)
        },
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
    };

    // Create and run pipeline
    let pipeline = Pipeline::new(pipeline_config);

    info!("Starting pipeline...");

    match pipeline.run().await {
        Ok(stats) => {
            info!(
                iterations = stats.iterations,
                detections = stats.detections,
                tracking_losses = stats.tracking_losses,
                duration_secs = stats.duration.as_secs_f64(),
                loop_hz = format!("{:.2}", stats.loop_hz()),
                "Pipeline completed successfully"
            );

            // Print detailed statistics
            stats.print_summary();
        }
        Err(e) => {
            return Err(e).context("Pipeline execution failed");
        }
    }

    info!("Pattern Tracker finished");
    Ok(())
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::TrackerBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Model:");
    println!("  Name: {}", blueprint.model.name);
    println!(
        "  Description: {}",
        blueprint.model.description_path().display()
    );

    println!("\nTracker:");
    println!("  Variant: {:?}", blueprint.tracker.variant);
    println!("  Reference frame: {}", blueprint.tracker.reference_frame);
    println!("  Detector: {:?}", blueprint.detector.kind);

    println!("\nLoop:");
    println!("  Frequency: {} Hz", blueprint.pacing.frequency_hz);
    println!("  Debug display: {}", blueprint.pacing.debug_display);

    println!("\nChannels:");
    println!("  Queue capacity: {}", blueprint.channels.queue_capacity);
    if blueprint.channels.log_taps.is_empty() {
        println!("  Log taps: (none)");
    } else {
        for tap in &blueprint.channels.log_taps {
            println!("  Log tap: {}", tap.as_str());
        }
    }

    println!("\nFeed:");
    println!("  Frequency: {} Hz", blueprint.feed.frequency_hz);
    println!(
        "  Image: {}x{}",
        blueprint.feed.image_width, blueprint.feed.image_height
    );
    println!("  Message: {}", blueprint.feed.message);

    println!();
}
